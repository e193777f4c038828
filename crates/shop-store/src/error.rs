//! Store error types.

use shop_commerce::CommerceError;
use thiserror::Error;

/// Errors that can occur when using the store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to serialize or deserialize a value.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Concurrent modification detected.
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),
}

impl From<StoreError> for CommerceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Serialization(e) => CommerceError::Serialization(e.to_string()),
            other => CommerceError::Storage(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_commerce_error() {
        let err: CommerceError = StoreError::ConcurrentModification("basket:1".into()).into();
        assert_eq!(
            err,
            CommerceError::Storage("Concurrent modification: basket:1".to_string())
        );

        let json = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: CommerceError = StoreError::from(json).into();
        assert!(matches!(err, CommerceError::Serialization(_)));
    }
}
