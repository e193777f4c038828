//! Commerce error types.

use crate::validation::ValidationErrors;
use thiserror::Error;

/// Errors raised by basket, catalog and customer operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommerceError {
    /// A product was required but none was given or found.
    #[error("Invalid product: {0}")]
    InvalidProduct(String),

    /// A variation was requested from a product that cannot have variations.
    #[error("Product {0} does not support variations")]
    NotVariableProduct(String),

    /// Field-level validation failures.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// A basket element no longer matches the catalog.
    #[error("Basket element {element_id} is stale: {reason}")]
    StaleBasketElement { element_id: String, reason: String },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    #[error("Quantity {0} exceeds maximum allowed ({1})")]
    QuantityExceedsLimit(i64, i64),

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    #[error("Element not in basket: {0}")]
    ElementNotInBasket(String),

    /// Invalid engine configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure reported by a storage collaborator.
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CommerceError {
    /// Errors the end user can fix by editing the basket.
    pub fn is_user_correctable(&self) -> bool {
        matches!(
            self,
            CommerceError::Validation(_)
                | CommerceError::StaleBasketElement { .. }
                | CommerceError::InvalidQuantity(_)
                | CommerceError::QuantityExceedsLimit(..)
        )
    }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::Serialization(e.to_string())
    }
}

impl From<ValidationErrors> for CommerceError {
    fn from(errors: ValidationErrors) -> Self {
        CommerceError::Validation(errors)
    }
}
