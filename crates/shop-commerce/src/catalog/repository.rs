//! Product lookup.

use crate::catalog::Product;
use crate::ids::ProductId;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Read access to the current catalog state.
pub trait ProductCatalog: Send + Sync {
    /// Look a product or variation up by id.
    fn find(&self, id: &ProductId) -> Option<Product>;
}

/// Catalog held in memory, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a product. Its variations become findable by their
    /// own ids as well.
    pub fn insert(&self, product: Product) {
        let mut products = self.products.write().unwrap_or_else(PoisonError::into_inner);
        for variation in &product.variations {
            products.insert(variation.id.clone(), variation.clone());
        }
        products.insert(product.id.clone(), product);
    }

    pub fn remove(&self, id: &ProductId) -> Option<Product> {
        let mut products = self.products.write().unwrap_or_else(PoisonError::into_inner);
        products.remove(id)
    }

    pub fn len(&self) -> usize {
        self.products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProductCatalog for InMemoryCatalog {
    fn find(&self, id: &ProductId) -> Option<Product> {
        let products = self.products.read().unwrap_or_else(PoisonError::into_inner);
        products.get(id).cloned()
    }
}
