//! Product catalog module.
//!
//! Contains products, their variations, stock levels and the lookup port the
//! basket engine reads products through.

mod inventory;
mod product;
mod repository;

pub use inventory::InventoryLevel;
pub use product::{
    MediaType, Product, ProductCategory, ProductDelivery, ProductMedia, ProductStatus, ProductType,
};
pub use repository::{InMemoryCatalog, ProductCatalog};
