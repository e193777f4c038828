//! Session management on top of the key-value store.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use crate::{Store, StoreError};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shop_commerce::basket::Basket;
use shop_commerce::{CommerceError, Currency};
use tracing::{debug, info, warn};

/// Maximum retry attempts for optimistic concurrency control.
const MAX_UPDATE_RETRIES: u32 = 3;

/// A unique session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new cryptographically secure session ID.
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::Rng;

        let bytes: [u8; 18] = rand::thread_rng().gen();
        Self(format!("sess_{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Session data as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData<T> {
    pub id: SessionId,
    pub data: T,
    /// Incremented on every write.
    pub version: u64,
    /// Unix timestamp of the first write.
    pub created_at: i64,
    /// Unix timestamp of the last write.
    pub last_accessed: i64,
}

/// Typed, versioned sessions under one key namespace.
pub struct Session<T> {
    store: Store,
    namespace: String,
    _phantom: PhantomData<T>,
}

impl<T> Session<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Sessions stored under `namespace:<id>` keys.
    pub fn new(store: Store, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            _phantom: PhantomData,
        }
    }

    pub fn get(&self, id: &SessionId) -> Result<Option<T>, StoreError> {
        Ok(self.get_versioned(id)?.map(|s| s.data))
    }

    /// Full session data including version.
    pub fn get_versioned(&self, id: &SessionId) -> Result<Option<SessionData<T>>, StoreError> {
        self.store.get(&self.session_key(id))
    }

    /// Unconditional write.
    pub fn set(&self, id: &SessionId, data: &T) -> Result<u64, StoreError> {
        let current = self.get_versioned(id)?;
        let written = self.next(id, data, current.as_ref());
        self.store.set(&self.session_key(id), &written)?;
        Ok(written.version)
    }

    /// Write only if the stored version is still `expected_version`
    /// (0 meaning absent). Returns the new version.
    pub fn set_versioned(
        &self,
        id: &SessionId,
        data: &T,
        expected_version: u64,
    ) -> Result<u64, StoreError> {
        let key = self.session_key(id);
        let current = self.get_versioned(id)?;
        let written = self.next(id, data, current.as_ref());
        if written.version != expected_version + 1 {
            return Err(StoreError::ConcurrentModification(key));
        }

        let swapped = self
            .store
            .set_if(&key, &written, |stored: Option<&SessionData<T>>| {
                stored.map_or(0, |s| s.version) == expected_version
            })?;
        if !swapped {
            return Err(StoreError::ConcurrentModification(key));
        }
        Ok(written.version)
    }

    pub fn delete(&self, id: &SessionId) -> Result<(), StoreError> {
        self.store.delete(&self.session_key(id))
    }

    pub fn exists(&self, id: &SessionId) -> Result<bool, StoreError> {
        self.store.exists(&self.session_key(id))
    }

    fn next(&self, id: &SessionId, data: &T, current: Option<&SessionData<T>>) -> SessionData<T> {
        let now = chrono::Utc::now().timestamp();
        SessionData {
            id: id.clone(),
            data: data.clone(),
            version: current.map_or(0, |s| s.version) + 1,
            created_at: current.map_or(now, |s| s.created_at),
            last_accessed: now,
        }
    }

    fn session_key(&self, id: &SessionId) -> String {
        crate::store_key!(self.namespace.as_str(), id)
    }
}

impl<T> Session<T>
where
    T: Serialize + DeserializeOwned + Clone + Default,
{
    /// Get session data, creating a default session if it doesn't exist.
    pub fn get_or_create(&self, id: &SessionId) -> Result<T, StoreError> {
        match self.get(id)? {
            Some(data) => Ok(data),
            None => {
                let data = T::default();
                self.set(id, &data)?;
                Ok(data)
            }
        }
    }

    /// Update session data with a closure, using optimistic concurrency control.
    ///
    /// Retries up to `MAX_UPDATE_RETRIES` times when another writer bumps the
    /// version between the read and the write.
    pub fn update<F>(&self, id: &SessionId, f: F) -> Result<T, StoreError>
    where
        F: Fn(&mut T),
    {
        for attempt in 0..MAX_UPDATE_RETRIES {
            let (mut data, expected_version) = match self.get_versioned(id)? {
                Some(session) => (session.data, session.version),
                None => (T::default(), 0),
            };

            f(&mut data);

            match self.set_versioned(id, &data, expected_version) {
                Ok(_) => return Ok(data),
                Err(StoreError::ConcurrentModification(_)) => {
                    debug!(session = %id, attempt, "session version conflict, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::ConcurrentModification(
            "max retries exceeded".to_string(),
        ))
    }
}

/// One basket per session, with writes serialized per session.
///
/// [`BasketSessions::with_basket`] is the only way to mutate a stored basket:
/// it holds the session's lock across load, change and write-back, so two
/// requests on the same session cannot interleave.
pub struct BasketSessions {
    sessions: Session<Basket>,
    currency: Currency,
    locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl BasketSessions {
    /// Baskets stored in `store`, created in `currency`.
    pub fn new(store: Store, currency: Currency) -> Self {
        Self {
            sessions: Session::new(store, "basket"),
            currency,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// The stored basket, if any.
    pub fn load(&self, id: &SessionId) -> Result<Option<Basket>, CommerceError> {
        Ok(self.sessions.get(id)?)
    }

    /// Stored version, 0 when no basket exists.
    pub fn version(&self, id: &SessionId) -> Result<u64, CommerceError> {
        Ok(self.sessions.get_versioned(id)?.map_or(0, |s| s.version))
    }

    /// The stored basket, or a new empty one that is written immediately.
    pub fn get_or_create(&self, id: &SessionId) -> Result<Basket, CommerceError> {
        self.serialized(id, || -> Result<Basket, CommerceError> {
            if let Some(basket) = self.sessions.get(id)? {
                return Ok(basket);
            }
            let basket = Basket::new(id.as_str(), self.currency);
            self.sessions.set_versioned(id, &basket, 0)?;
            info!(session = %id, basket = %basket.id, "basket created");
            Ok(basket)
        })
    }

    /// Run `f` on the session's basket and store the result.
    ///
    /// `f` works on a copy; when it fails nothing is written and the stored
    /// basket is unchanged.
    pub fn with_basket<R, F>(&self, id: &SessionId, f: F) -> Result<R, CommerceError>
    where
        F: FnOnce(&mut Basket) -> Result<R, CommerceError>,
    {
        self.serialized(id, || -> Result<R, CommerceError> {
            let (mut basket, version) = match self.sessions.get_versioned(id)? {
                Some(session) => (session.data, session.version),
                None => (Basket::new(id.as_str(), self.currency), 0),
            };

            let result = match f(&mut basket) {
                Ok(result) => result,
                Err(e) => {
                    warn!(session = %id, error = %e, "basket change discarded");
                    return Err(e);
                }
            };

            let version = self.sessions.set_versioned(id, &basket, version)?;
            debug!(session = %id, basket = %basket.id, version, "basket stored");
            Ok(result)
        })
    }

    /// Drop the session's basket.
    pub fn delete(&self, id: &SessionId) -> Result<(), CommerceError> {
        self.serialized(id, || -> Result<(), CommerceError> {
            self.sessions.delete(id)?;
            info!(session = %id, "basket deleted");
            Ok(())
        })
    }

    /// Run `f` holding the session's lock.
    ///
    /// A lock lives in the map only while some call holds it, so idle
    /// sessions cost nothing here.
    fn serialized<R>(&self, id: &SessionId, f: impl FnOnce() -> R) -> R {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id.clone())
            .or_default()
            .clone();

        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        drop(lock);

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(id);
        }
        result
    }

    #[cfg(test)]
    fn held_locks(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_commerce::basket::BasketElement;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Visits {
        count: u32,
    }

    #[test]
    fn test_session_id_generate_format() {
        let id = SessionId::generate();
        let s = id.as_str();

        assert!(s.starts_with("sess_"));
        // Base64 encoded 18 bytes = 24 chars, plus "sess_" = 29 chars
        assert_eq!(s.len(), 29);
        assert_ne!(id, SessionId::generate());
    }

    #[test]
    fn test_session_id_serialization() {
        let id = SessionId::new("serialize-me");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""serialize-me""#);
        assert_eq!(serde_json::from_str::<SessionId>(&json).unwrap(), id);
    }

    #[test]
    fn test_versions_increase_and_created_at_is_kept() {
        let sessions = Session::<Visits>::new(Store::open_default(), "visits");
        let id = SessionId::new("a");

        assert_eq!(sessions.set(&id, &Visits { count: 1 }).unwrap(), 1);
        let first = sessions.get_versioned(&id).unwrap().unwrap();
        assert_eq!(sessions.set(&id, &Visits { count: 2 }).unwrap(), 2);
        let second = sessions.get_versioned(&id).unwrap().unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.data, Visits { count: 2 });
    }

    #[test]
    fn test_set_versioned_rejects_stale_version() {
        let sessions = Session::<Visits>::new(Store::open_default(), "visits");
        let id = SessionId::new("a");
        sessions.set(&id, &Visits { count: 1 }).unwrap();

        assert!(matches!(
            sessions.set_versioned(&id, &Visits { count: 9 }, 0),
            Err(StoreError::ConcurrentModification(_))
        ));
        assert_eq!(sessions.set_versioned(&id, &Visits { count: 2 }, 1).unwrap(), 2);
    }

    #[test]
    fn test_update_and_get_or_create() {
        let sessions = Session::<Visits>::new(Store::open_default(), "visits");
        let id = SessionId::new("a");

        assert_eq!(sessions.get_or_create(&id).unwrap(), Visits::default());
        sessions.update(&id, |v| v.count += 1).unwrap();
        let data = sessions.update(&id, |v| v.count += 1).unwrap();

        assert_eq!(data.count, 2);
        assert_eq!(sessions.get_versioned(&id).unwrap().unwrap().version, 3);
    }

    #[test]
    fn test_namespaces_are_separate() {
        let store = Store::open_default();
        let a = Session::<Visits>::new(store.clone(), "a");
        let b = Session::<Visits>::new(store.clone(), "b");
        let id = SessionId::new("same");

        a.set(&id, &Visits { count: 1 }).unwrap();
        assert!(a.exists(&id).unwrap());
        assert!(!b.exists(&id).unwrap());
        assert!(store.exists("a:same").unwrap());
    }

    #[test]
    fn test_with_basket_writes_back() {
        let baskets = BasketSessions::new(Store::open_default(), Currency::EUR);
        let id = SessionId::generate();

        let count = baskets
            .with_basket(&id, |basket| {
                basket.push_element(BasketElement::new(Currency::EUR));
                Ok(basket.len())
            })
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(baskets.load(&id).unwrap().unwrap().len(), 1);
        assert_eq!(baskets.version(&id).unwrap(), 1);
    }

    #[test]
    fn test_failed_change_is_not_stored() {
        let baskets = BasketSessions::new(Store::open_default(), Currency::EUR);
        let id = SessionId::generate();
        let created = baskets.get_or_create(&id).unwrap();

        let result: Result<(), _> = baskets.with_basket(&id, |basket| {
            basket.push_element(BasketElement::new(Currency::EUR));
            Err(CommerceError::Overflow)
        });

        assert_eq!(result, Err(CommerceError::Overflow));
        assert_eq!(baskets.load(&id).unwrap(), Some(created));
        assert_eq!(baskets.version(&id).unwrap(), 1);
    }

    #[test]
    fn test_delete() {
        let baskets = BasketSessions::new(Store::open_default(), Currency::USD);
        let id = SessionId::new("gone");
        let basket = baskets.get_or_create(&id).unwrap();
        assert_eq!(basket.currency, Currency::USD);
        assert_eq!(basket.session_id, "gone");

        baskets.delete(&id).unwrap();
        assert_eq!(baskets.load(&id).unwrap(), None);
    }

    #[test]
    fn test_idle_sessions_hold_no_lock() {
        let baskets = BasketSessions::new(Store::open_default(), Currency::EUR);
        for _ in 0..5 {
            let id = SessionId::generate();
            baskets.get_or_create(&id).unwrap();
            baskets.with_basket(&id, |_| Ok(())).unwrap();
        }
        let _: Result<(), _> =
            baskets.with_basket(&SessionId::generate(), |_| Err(CommerceError::Overflow));

        assert_eq!(baskets.held_locks(), 0);
    }
}
