//! Engine configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::basket::PricingRules;
use crate::error::CommerceError;
use crate::ids::ProductId;
use crate::money::Currency;

/// Default per-line quantity cap.
pub const MAX_QUANTITY_PER_ELEMENT: i64 = 9999;

/// Product fields that belong to each variation and are never copied from
/// the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariationField {
    Name,
    Description,
    ShortDescription,
    Price,
    VatRate,
    Options,
}

/// Settings for the basket compatibility engine.
///
/// ```toml
/// currency = "EUR"
/// max_quantity_per_element = 50
/// max_distinct_products = 20
/// variation_fields = ["price"]
///
/// [[pricing.volume_tiers]]
/// min_quantity = 10
/// percent_off = 5.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub currency: Currency,
    pub min_quantity: i64,
    pub max_quantity_per_element: i64,
    /// Cap on the number of lines in a basket.
    pub max_distinct_products: Option<usize>,
    /// Product used when an element is created without one.
    pub default_product_id: Option<ProductId>,
    pub variation_fields: Vec<VariationField>,
    pub pricing: PricingRules,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            min_quantity: 1,
            max_quantity_per_element: MAX_QUANTITY_PER_ELEMENT,
            max_distinct_products: None,
            default_product_id: None,
            variation_fields: Vec::new(),
            pricing: PricingRules::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a config file. `.json` files are read as JSON,
    /// anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: EngineConfig = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?
        };

        config
            .validate()
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, CommerceError> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| CommerceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.min_quantity < 1 {
            return Err(CommerceError::Config(format!(
                "min_quantity must be at least 1, got {}",
                self.min_quantity
            )));
        }
        if self.min_quantity > self.max_quantity_per_element {
            return Err(CommerceError::Config(format!(
                "min_quantity {} exceeds max_quantity_per_element {}",
                self.min_quantity, self.max_quantity_per_element
            )));
        }
        if self.max_distinct_products == Some(0) {
            return Err(CommerceError::Config(
                "max_distinct_products must be positive".to_string(),
            ));
        }
        self.pricing.validate()
    }

    pub fn is_variation_field(&self, field: VariationField) -> bool {
        self.variation_fields.contains(&field)
    }

    pub fn quantity_in_range(&self, quantity: i64) -> bool {
        (self.min_quantity..=self.max_quantity_per_element).contains(&quantity)
    }
}
