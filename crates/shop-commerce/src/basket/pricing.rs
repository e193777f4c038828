//! Basket price breakdown.

use crate::ids::BasketElementId;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Complete pricing breakdown for a basket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BasketPricing {
    /// Sum of lines at catalog prices.
    pub subtotal: Money,
    /// What basket rules took off the subtotal.
    pub discount_total: Money,
    pub grand_total: Money,
    pub lines: Vec<ElementPricing>,
}

impl BasketPricing {
    pub fn has_discounts(&self) -> bool {
        self.discount_total.amount_cents > 0
    }

    /// Discount as a percentage of the subtotal.
    pub fn discount_percentage(&self) -> f64 {
        if self.subtotal.amount_cents == 0 {
            return 0.0;
        }
        (self.discount_total.amount_cents as f64 / self.subtotal.amount_cents as f64) * 100.0
    }
}

/// Pricing for a single basket element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementPricing {
    pub element_id: BasketElementId,
    pub quantity: i64,
    pub base_unit_price: Money,
    pub unit_price: Money,
    /// `base_unit_price * quantity`.
    pub subtotal: Money,
    /// `unit_price * quantity`.
    pub total: Money,
}

impl ElementPricing {
    pub fn discount(&self) -> Money {
        Money::new(
            self.subtotal.amount_cents - self.total.amount_cents,
            self.total.currency,
        )
    }
}
