//! Basket element factory.

use crate::basket::BasketElement;
use crate::money::Currency;

/// Creates blank basket elements for the product provider.
///
/// Hosts that persist elements in their own entity type plug in here.
pub trait BasketElementManager: Send + Sync {
    /// A fresh element with a new id and no product.
    fn create(&self) -> BasketElement;

    /// Name of the concrete element type produced.
    fn class_name(&self) -> &'static str {
        std::any::type_name::<BasketElement>()
    }
}

/// Produces plain [`BasketElement`]s in a fixed currency.
#[derive(Debug, Clone, Default)]
pub struct DefaultBasketElementManager {
    currency: Currency,
}

impl DefaultBasketElementManager {
    pub fn new(currency: Currency) -> Self {
        Self { currency }
    }
}

impl BasketElementManager for DefaultBasketElementManager {
    fn create(&self) -> BasketElement {
        BasketElement::new(self.currency)
    }
}
