//! Session-related types.

/// Session keys for checkout data.
pub mod keys {
    /// Key for the serialized checkout session.
    pub const CHECKOUT_SESSION: &str = "checkout_session";

    /// Key for the shopping cart.
    pub const CART: &str = "cart";
}
