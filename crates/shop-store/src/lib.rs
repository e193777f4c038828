//! Storage for baskets and customers.
//!
//! Provides an in-memory key-value store with automatic JSON serialization,
//! versioned sessions, per-session basket storage and a [`CustomerManager`]
//! implementation.
//!
//! [`CustomerManager`]: shop_commerce::customer::CustomerManager
//!
//! # Example
//!
//! ```rust,ignore
//! use shop_store::{BasketSessions, SessionId, Store};
//!
//! let baskets = BasketSessions::new(Store::open_default(), Currency::EUR);
//! let session = SessionId::generate();
//!
//! // Every change runs under the session's lock and is written back
//! baskets.with_basket(&session, |basket| {
//!     let element = provider.create_basket_element(Some(&product), &options)?;
//!     provider.basket_add_product(basket, &product, element)
//! })?;
//! ```

mod customer;
mod error;
mod kv;
mod session;

pub use customer::InMemoryCustomerManager;
pub use error::StoreError;
pub use kv::Store;
pub use session::{BasketSessions, Session, SessionData, SessionId};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{BasketSessions, InMemoryCustomerManager, Session, SessionId, Store, StoreError};
}
