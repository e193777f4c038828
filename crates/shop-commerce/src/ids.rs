//! Newtype identifiers.
//!
//! Each entity gets its own id type so a `CustomerId` can never be handed to
//! something expecting a `ProductId`.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generate a fresh identifier.
            pub fn generate() -> Self {
                Self(generate_id($prefix))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Identifier of a catalog product (or variation).
    ProductId,
    "prod"
);
define_id!(
    /// Identifier of a basket.
    BasketId,
    "bskt"
);
define_id!(
    /// Identifier of a single basket line.
    BasketElementId,
    "elem"
);
define_id!(
    /// Identifier of a customer record.
    CustomerId,
    "cust"
);
define_id!(CategoryId, "cat");
define_id!(MediaId, "media");
define_id!(
    /// Identifier of the authentication account a customer belongs to.
    UserId,
    "user"
);

/// Prefix + nanosecond timestamp + process-wide counter.
fn generate_id(prefix: &str) -> String {
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default() as u64;
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);

    format!("{prefix}_{nanos:x}{counter:04x}")
}
