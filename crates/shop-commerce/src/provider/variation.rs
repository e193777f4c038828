//! Variation creation and parent-to-variation copying.
//!
//! Without `force_copy` a slice is only copied into variations that leave it
//! unset (empty string, `None`, zero price, empty collection). With it the
//! parent's value always wins.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{Product, ProductDelivery, ProductCategory, ProductMedia, ProductStatus};
use crate::config::{EngineConfig, VariationField};
use crate::current_timestamp;
use crate::error::CommerceError;
use crate::ids::{MediaId, ProductId};
use crate::money::Money;

/// Which slice of parent data to copy onto variations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CopyScope {
    #[default]
    All,
    /// Base fields: name, descriptions, price, VAT, options.
    Product,
    ProductDeliveries,
    ProductCategories,
    ProductImages,
}

impl FromStr for CopyScope {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(CopyScope::All),
            "product" => Ok(CopyScope::Product),
            "product_deliveries" => Ok(CopyScope::ProductDeliveries),
            "product_categories" => Ok(CopyScope::ProductCategories),
            "product_images" | "product_pictures" => Ok(CopyScope::ProductImages),
            other => Err(CommerceError::Config(format!("unknown copy scope: {other}"))),
        }
    }
}

pub(crate) fn create_variation(product: &mut Product) -> Result<&mut Product, CommerceError> {
    if !product.is_variable() || product.is_variation() {
        return Err(CommerceError::NotVariableProduct(product.id.to_string()));
    }

    let number = product.variations.len() + 1;
    let now = current_timestamp();
    let id = ProductId::generate();

    let mut variation = product.clone();
    variation.variations = Vec::new();
    variation.images = reparent(&product.images, &id);
    variation.id = id;
    variation.parent_id = Some(product.id.clone());
    variation.status = ProductStatus::Draft;
    variation.name = format!("{} (duplicated)", product.name);
    variation.sku = format!("{}-{}", product.sku, number);
    variation.slug = format!("{}-{}", product.slug, number);
    variation.created_at = now;
    variation.updated_at = now;

    info!(parent = %product.id, variation = %variation.id, "variation created");

    let index = product.variations.len();
    product.variations.push(variation);
    product.touch();
    Ok(&mut product.variations[index])
}

pub(crate) fn copy_variation(
    config: &EngineConfig,
    product: &mut Product,
    scope: CopyScope,
    force_copy: bool,
) {
    match scope {
        CopyScope::All => {
            copy_product_variation(config, product, force_copy);
            copy_deliveries(product, force_copy);
            copy_categories(product, force_copy);
            copy_images(product, force_copy);
        }
        CopyScope::Product => copy_product_variation(config, product, force_copy),
        CopyScope::ProductDeliveries => copy_deliveries(product, force_copy),
        CopyScope::ProductCategories => copy_categories(product, force_copy),
        CopyScope::ProductImages => copy_images(product, force_copy),
    }
}

/// Parent values of the copyable base fields.
struct BaseFields {
    name: String,
    description: Option<String>,
    short_description: Option<String>,
    price: Money,
    vat_rate: f64,
    options: BTreeMap<String, String>,
}

pub(crate) fn copy_product_variation(config: &EngineConfig, product: &mut Product, force_copy: bool) {
    let base = BaseFields {
        name: product.name.clone(),
        description: product.description.clone(),
        short_description: product.short_description.clone(),
        price: product.price,
        vat_rate: product.vat_rate,
        options: product.options.clone(),
    };
    let copies = |field: VariationField| !config.is_variation_field(field);

    let mut updated = 0;
    for variation in &mut product.variations {
        let before = variation.clone();

        if copies(VariationField::Name) && (force_copy || variation.name.is_empty()) {
            variation.name = base.name.clone();
        }
        if copies(VariationField::Description) && (force_copy || variation.description.is_none()) {
            variation.description = base.description.clone();
        }
        if copies(VariationField::ShortDescription)
            && (force_copy || variation.short_description.is_none())
        {
            variation.short_description = base.short_description.clone();
        }
        if copies(VariationField::Price) && (force_copy || variation.price.is_zero()) {
            variation.price = base.price;
        }
        if copies(VariationField::VatRate) && (force_copy || variation.vat_rate == 0.0) {
            variation.vat_rate = base.vat_rate;
        }
        if copies(VariationField::Options) && (force_copy || variation.options.is_empty()) {
            variation.options = base.options.clone();
        }

        if *variation != before {
            variation.touch();
            updated += 1;
        }
    }
    info!(parent = %product.id, updated, force_copy, "copied base fields to variations");
}

pub(crate) fn copy_deliveries(product: &mut Product, force_copy: bool) {
    let deliveries: Vec<ProductDelivery> = product.deliveries.clone();
    let updated = copy_slice(product, force_copy, |v| &mut v.deliveries, |_| deliveries.clone());
    info!(parent = %product.id, updated, force_copy, "copied deliveries to variations");
}

pub(crate) fn copy_categories(product: &mut Product, force_copy: bool) {
    let categories: Vec<ProductCategory> = product.categories.clone();
    let updated = copy_slice(product, force_copy, |v| &mut v.categories, |_| categories.clone());
    info!(parent = %product.id, updated, force_copy, "copied categories to variations");
}

pub(crate) fn copy_images(product: &mut Product, force_copy: bool) {
    let images: Vec<ProductMedia> = product.images.clone();
    let updated = copy_slice(product, force_copy, |v| &mut v.images, |id| reparent(&images, id));
    info!(parent = %product.id, updated, force_copy, "copied images to variations");
}

/// Replace one collection on each variation, returning how many changed.
fn copy_slice<T>(
    product: &mut Product,
    force_copy: bool,
    slot: impl Fn(&mut Product) -> &mut Vec<T>,
    values: impl Fn(&ProductId) -> Vec<T>,
) -> usize {
    let mut updated = 0;
    for variation in &mut product.variations {
        if !force_copy && !slot(variation).is_empty() {
            continue;
        }
        let copied = values(&variation.id);
        *slot(variation) = copied;
        variation.touch();
        updated += 1;
    }
    updated
}

/// Copies of `images` owned by `product_id`, each with a fresh media id.
fn reparent(images: &[ProductMedia], product_id: &ProductId) -> Vec<ProductMedia> {
    images
        .iter()
        .map(|image| ProductMedia {
            id: MediaId::generate(),
            product_id: product_id.clone(),
            ..image.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductType;
    use crate::ids::CategoryId;
    use crate::money::Currency;

    fn parent() -> Product {
        let mut p = Product::new("TS", "T-Shirt", Money::new(1500, Currency::EUR))
            .with_type(ProductType::Variable);
        p.description = Some("Organic cotton".into());
        p.vat_rate = 20.0;
        p.add_category(CategoryId::new("apparel"), true);
        p.add_delivery(ProductDelivery::new("ups", "FR"));
        p.add_image("front.png");
        p
    }

    #[test]
    fn test_create_variation() {
        let mut product = parent();
        let parent_id = product.id.clone();
        let variation = create_variation(&mut product).unwrap();

        assert_eq!(variation.parent_id.as_ref(), Some(&parent_id));
        assert_eq!(variation.status, ProductStatus::Draft);
        assert_eq!(variation.name, "T-Shirt (duplicated)");
        assert_eq!(variation.sku, "TS-1");
        assert_ne!(variation.id, parent_id);
        assert_eq!(variation.images[0].product_id, variation.id);

        assert_eq!(product.variations.len(), 1);
    }

    #[test]
    fn test_variation_of_variation_is_rejected() {
        let mut product = parent();
        let variation = create_variation(&mut product).unwrap();
        assert!(matches!(
            create_variation(variation),
            Err(CommerceError::NotVariableProduct(_))
        ));
    }

    #[test]
    fn test_copy_product_respects_variation_fields() {
        let config = EngineConfig {
            variation_fields: vec![VariationField::Price],
            ..EngineConfig::default()
        };
        let mut product = parent();
        let variation = create_variation(&mut product).unwrap();
        variation.price = Money::zero(Currency::EUR);
        variation.description = None;

        copy_product_variation(&config, &mut product, true);

        let variation = &product.variations[0];
        assert!(variation.price.is_zero());
        assert_eq!(variation.description.as_deref(), Some("Organic cotton"));
        assert_eq!(variation.name, "T-Shirt");
    }

    #[test]
    fn test_copy_product_without_force_fills_gaps_only() {
        let config = EngineConfig::default();
        let mut product = parent();
        let variation = create_variation(&mut product).unwrap();
        variation.price = Money::new(1700, Currency::EUR);
        variation.description = None;

        copy_product_variation(&config, &mut product, false);

        let variation = &product.variations[0];
        assert_eq!(variation.price.amount_cents, 1700);
        assert_eq!(variation.name, "T-Shirt (duplicated)");
        assert_eq!(variation.description.as_deref(), Some("Organic cotton"));
    }

    #[test]
    fn test_copy_images_reparents() {
        let mut product = parent();
        create_variation(&mut product).unwrap();
        product.variations[0].images.clear();
        product.add_image("back.png");

        copy_images(&mut product, false);

        let variation = &product.variations[0];
        assert_eq!(variation.images.len(), 2);
        assert!(variation.images.iter().all(|i| i.product_id == variation.id));
        assert!(variation
            .images
            .iter()
            .all(|i| product.images.iter().all(|p| p.id != i.id)));
    }

    #[test]
    fn test_copy_deliveries_force() {
        let mut product = parent();
        create_variation(&mut product).unwrap();
        product.add_delivery(ProductDelivery::new("dhl", "DE"));

        copy_deliveries(&mut product, false);
        assert_eq!(product.variations[0].deliveries.len(), 1);

        copy_deliveries(&mut product, true);
        assert_eq!(product.variations[0].deliveries.len(), 2);
    }

    #[test]
    fn test_copy_scope_parsing() {
        assert_eq!("all".parse::<CopyScope>().unwrap(), CopyScope::All);
        assert_eq!(
            "product_pictures".parse::<CopyScope>().unwrap(),
            CopyScope::ProductImages
        );
        assert!("everything".parse::<CopyScope>().is_err());
    }
}
