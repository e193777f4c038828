//! In-memory key-value store with automatic serialization.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::StoreError;
use serde::{de::DeserializeOwned, Serialize};

/// Type-safe key-value store.
///
/// Values are stored as JSON bytes, so anything that implements `Serialize`
/// and `DeserializeOwned` round-trips. Clones share the same data.
#[derive(Debug, Clone)]
pub struct Store {
    name: Arc<str>,
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl Store {
    /// Open the default store.
    pub fn open_default() -> Self {
        Self::open("default")
    }

    /// Open an empty named store.
    pub fn open(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            entries: Arc::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a value. Returns `None` if the key doesn't exist.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let basket: Option<Basket> = store.get("basket:sess_abc")?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match entries.get(key) {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => Ok(None),
        }
    }

    /// Set a value, replacing any previous one.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(value)?;
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), bytes);
        Ok(())
    }

    /// Write `value` only if the current value satisfies `expected`.
    ///
    /// The check and the write happen under one lock. Returns whether the
    /// write took place.
    pub fn set_if<T, F>(&self, key: &str, value: &T, expected: F) -> Result<bool, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<&T>) -> bool,
    {
        let bytes = serde_json::to_vec(value)?;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let current: Option<T> = entries
            .get(key)
            .map(|bytes| serde_json::from_slice(bytes))
            .transpose()?;
        if !expected(current.as_ref()) {
            return Ok(false);
        }
        entries.insert(key.to_string(), bytes);
        Ok(true)
    }

    /// Delete a value. Deleting a missing key is not an error.
    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    pub fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key))
    }

    /// All keys, in sorted order.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect())
    }

    /// Keys starting with `prefix`, in sorted order.
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::open_default()
    }
}

/// Helper to build store keys with namespacing.
///
/// # Example
///
/// ```rust,ignore
/// let key = store_key!("customer", customer.id);
/// // Returns "customer:cust_..."
/// ```
#[macro_export]
macro_rules! store_key {
    ($prefix:expr, $($part:expr),+) => {{
        let mut key = String::from($prefix);
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )+
        key
    }};
}
