//! Basket-aware price rules.
//!
//! A line's unit price is its base price reduced by the best volume tier it
//! reaches, then by every bundle rule the rest of the basket satisfies.

use crate::basket::{Basket, BasketElement};
use crate::error::CommerceError;
use crate::ids::ProductId;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Percentage off once a line reaches a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeTier {
    pub min_quantity: i64,
    pub percent_off: f64,
}

/// Percentage off `product_id` while `with_product_id` is also in the basket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleRule {
    pub product_id: ProductId,
    pub with_product_id: ProductId,
    pub percent_off: f64,
}

impl BundleRule {
    /// Lines flagged for deletion do not count as companions.
    pub fn applies(&self, basket: &Basket, element: &BasketElement) -> bool {
        if element.product_id.as_ref() != Some(&self.product_id) {
            return false;
        }
        basket.elements().iter().any(|other| {
            other.id != element.id
                && !other.delete
                && other.quantity > 0
                && other.product_id.as_ref() == Some(&self.with_product_id)
        })
    }
}

/// The full rule set, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingRules {
    #[serde(default)]
    pub volume_tiers: Vec<VolumeTier>,
    #[serde(default)]
    pub bundles: Vec<BundleRule>,
}

impl PricingRules {
    pub fn is_empty(&self) -> bool {
        self.volume_tiers.is_empty() && self.bundles.is_empty()
    }

    /// Highest discount among the tiers `quantity` reaches.
    pub fn volume_discount(&self, quantity: i64) -> Option<&VolumeTier> {
        self.volume_tiers
            .iter()
            .filter(|t| quantity >= t.min_quantity)
            .max_by(|a, b| a.percent_off.total_cmp(&b.percent_off))
    }

    /// Unit price of `element` given the rest of `basket`.
    pub fn unit_price(&self, basket: &Basket, element: &BasketElement) -> Money {
        let mut price = element.base_price;
        if let Some(tier) = self.volume_discount(element.quantity) {
            price = price.percent_off(tier.percent_off);
        }
        for bundle in self.bundles.iter().filter(|b| b.applies(basket, element)) {
            price = price.percent_off(bundle.percent_off);
        }
        price
    }

    pub fn validate(&self) -> Result<(), CommerceError> {
        let percents = self
            .volume_tiers
            .iter()
            .map(|t| t.percent_off)
            .chain(self.bundles.iter().map(|b| b.percent_off));
        for percent in percents {
            if !(0.0..=100.0).contains(&percent) {
                return Err(CommerceError::Config(format!(
                    "percent_off must be within 0..=100, got {percent}"
                )));
            }
        }
        if let Some(tier) = self.volume_tiers.iter().find(|t| t.min_quantity < 1) {
            return Err(CommerceError::Config(format!(
                "volume tier min_quantity must be at least 1, got {}",
                tier.min_quantity
            )));
        }
        Ok(())
    }
}
