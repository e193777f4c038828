//! Per-call options for basket operations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the customer picked alongside a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasketOptions {
    /// Requested quantity; the configured minimum when unset.
    pub quantity: Option<i64>,
    /// Distinguishing choices such as size or color.
    pub options: BTreeMap<String, String>,
    /// Non-distinguishing metadata such as a gift note.
    pub properties: BTreeMap<String, String>,
}

impl BasketOptions {
    pub fn quantity(quantity: i64) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::default()
        }
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}
