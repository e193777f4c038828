//! Products, their deliveries, categories and media.

use crate::catalog::InventoryLevel;
use crate::current_timestamp;
use crate::ids::{CategoryId, MediaId, ProductId};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Product status in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Not visible, not sellable.
    Draft,
    #[default]
    Active,
    /// Kept for order history, no longer sellable.
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Archived => "archived",
        }
    }
}

impl FromStr for ProductStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(ProductStatus::Draft),
            "active" => Ok(ProductStatus::Active),
            "archived" => Ok(ProductStatus::Archived),
            _ => Err(()),
        }
    }
}

/// Product type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    #[default]
    Simple,
    /// Can own variations (size, color, ...).
    Variable,
    Bundle,
    Digital,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Simple => "simple",
            ProductType::Variable => "variable",
            ProductType::Bundle => "bundle",
            ProductType::Digital => "digital",
        }
    }
}

/// A product in the catalog.
///
/// A variation is a `Product` with `parent_id` set; it lives inside its
/// parent's `variations` list and inherits whatever it leaves unset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    /// Unit price before any basket-level adjustment.
    pub price: Money,
    /// VAT rate in percent.
    pub vat_rate: f64,
    pub status: ProductStatus,
    pub product_type: ProductType,
    pub inventory: InventoryLevel,
    pub deliveries: Vec<ProductDelivery>,
    pub categories: Vec<ProductCategory>,
    pub images: Vec<ProductMedia>,
    /// Default basket options proposed for this product (e.g. size=L).
    pub options: BTreeMap<String, String>,
    pub parent_id: Option<ProductId>,
    pub variations: Vec<Product>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    /// Create an active simple product with untracked stock.
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price: Money) -> Self {
        let now = current_timestamp();
        let name = name.into();
        Self {
            id: ProductId::generate(),
            sku: sku.into(),
            slug: slugify(&name),
            name,
            description: None,
            short_description: None,
            price,
            vat_rate: 0.0,
            status: ProductStatus::Active,
            product_type: ProductType::Simple,
            inventory: InventoryLevel::untracked(),
            deliveries: Vec::new(),
            categories: Vec::new(),
            images: Vec::new(),
            options: BTreeMap::new(),
            parent_id: None,
            variations: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<ProductId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_type(mut self, product_type: ProductType) -> Self {
        self.product_type = product_type;
        self
    }

    pub fn with_inventory(mut self, inventory: InventoryLevel) -> Self {
        self.inventory = inventory;
        self
    }

    /// Only active products can be sold.
    pub fn is_enabled(&self) -> bool {
        self.status == ProductStatus::Active
    }

    pub fn is_variable(&self) -> bool {
        self.product_type == ProductType::Variable
    }

    pub fn is_variation(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn has_variations(&self) -> bool {
        !self.variations.is_empty()
    }

    /// Master products with variations are sold through one of the variations.
    pub fn is_master(&self) -> bool {
        self.is_variable() && !self.is_variation() && self.has_variations()
    }

    pub fn variation(&self, id: &ProductId) -> Option<&Product> {
        self.variations.iter().find(|v| &v.id == id)
    }

    pub fn add_category(&mut self, category_id: CategoryId, main: bool) {
        if !self.categories.iter().any(|c| c.category_id == category_id) {
            self.categories.push(ProductCategory {
                category_id,
                main,
                enabled: true,
            });
        }
    }

    pub fn add_delivery(&mut self, delivery: ProductDelivery) {
        self.deliveries.retain(|d| d.code != delivery.code);
        self.deliveries.push(delivery);
    }

    pub fn add_image(&mut self, url: impl Into<String>) -> &ProductMedia {
        let mut media = ProductMedia::new_image(self.id.clone(), url);
        media.position = self.images.len() as i32;
        self.images.push(media);
        &self.images[self.images.len() - 1]
    }

    pub fn touch(&mut self) {
        self.updated_at = current_timestamp();
    }
}

fn slugify(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// A way a product can be shipped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductDelivery {
    /// Carrier/method code, unique per product.
    pub code: String,
    /// Whether the delivery cost applies per item rather than per order.
    pub per_item: bool,
    pub country_code: String,
    pub zone: Option<String>,
    pub enabled: bool,
}

impl ProductDelivery {
    pub fn new(code: impl Into<String>, country_code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            per_item: false,
            country_code: country_code.into(),
            zone: None,
            enabled: true,
        }
    }
}

/// Membership of a product in a category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductCategory {
    pub category_id: CategoryId,
    /// The category used for breadcrumbs and canonical URLs.
    pub main: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
}

/// Image or video attached to a product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductMedia {
    pub id: MediaId,
    pub product_id: ProductId,
    pub media_type: MediaType,
    pub url: String,
    pub alt_text: Option<String>,
    pub position: i32,
}

impl ProductMedia {
    pub fn new_image(product_id: ProductId, url: impl Into<String>) -> Self {
        Self {
            id: MediaId::generate(),
            product_id,
            media_type: MediaType::Image,
            url: url.into(),
            alt_text: None,
            position: 0,
        }
    }
}
