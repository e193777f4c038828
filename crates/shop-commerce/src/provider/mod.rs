//! Product provider: the bridge between catalog products and baskets.
//!
//! [`ProductProvider`] decides whether a product may enter a basket, whether
//! it joins an existing line or opens a new one, what each line costs given
//! the rest of the basket, and how variations inherit from their parent.

mod engine;
mod forms;
mod options;
mod variation;

pub use engine::{AddOutcome, BasketProductProvider, ProductProvider};
pub use options::BasketOptions;
pub use variation::CopyScope;
