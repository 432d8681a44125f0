//! Domain models for storefront.

pub mod cart;
pub mod session;

pub use cart::{Cart, CartError, CartItem};
pub use session::keys as session_keys;
