//! Basket module.
//!
//! Baskets, their elements, pricing rules and the element factory port.

mod basket;
mod manager;
mod pricing;
mod rules;

pub use basket::{Basket, BasketElement};
pub use manager::{BasketElementManager, DefaultBasketElementManager};
pub use pricing::{BasketPricing, ElementPricing};
pub use rules::{BundleRule, PricingRules, VolumeTier};
