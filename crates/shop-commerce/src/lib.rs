//! Basket and product-variation engine for online shops.
//!
//! This crate decides how catalog products behave inside a customer basket:
//!
//! - **Catalog**: Products, variations, deliveries, categories, images, inventory
//! - **Basket**: Lines, merge rules, basket-aware pricing
//! - **Provider**: Addability, element building, validation, variation copying
//! - **Customer**: The customer storage contract used at checkout
//!
//! # Example
//!
//! ```rust,ignore
//! use shop_commerce::prelude::*;
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(InMemoryCatalog::new());
//! let book = Product::new("RUST-BOOK-001", "Rust Programming Book", Money::new(4999, Currency::EUR));
//! catalog.insert(book.clone());
//!
//! let provider = BasketProductProvider::new(EngineConfig::default(), catalog);
//! let mut basket = Basket::new("session-1", Currency::EUR);
//!
//! let element = provider.create_basket_element(Some(&book), &BasketOptions::quantity(2))?;
//! provider.basket_add_product(&mut basket, &book, element)?;
//!
//! println!("Total: {}", basket.total()?);
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod basket;
pub mod catalog;
pub mod config;
pub mod customer;
pub mod form;
pub mod provider;
pub mod validation;

pub use config::EngineConfig;
pub use error::CommerceError;
pub use ids::*;
pub use money::{Currency, Money};

/// Seconds since the Unix epoch.
pub(crate) fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{EngineConfig, VariationField};
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Catalog
    pub use crate::catalog::{
        InMemoryCatalog, InventoryLevel, MediaType, Product, ProductCatalog, ProductCategory,
        ProductDelivery, ProductMedia, ProductStatus, ProductType,
    };

    // Basket
    pub use crate::basket::{
        Basket, BasketElement, BasketElementManager, BasketPricing, BundleRule,
        DefaultBasketElementManager, ElementPricing, PricingRules, VolumeTier,
    };

    // Provider
    pub use crate::provider::{
        AddOutcome, BasketOptions, BasketProductProvider, CopyScope, ProductProvider,
    };

    // Forms and validation
    pub use crate::form::{FieldKind, FormField, FormSchema, FormSchemaBuilder};
    pub use crate::validation::{ErrorCollector, ValidationErrors};

    // Customers
    pub use crate::customer::{Customer, CustomerCriteria, CustomerManager};
}
