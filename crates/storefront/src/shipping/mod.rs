//! Shipping method resolution.
//!
//! - [`client`] talks to the rate service
//! - [`cache`] holds the fingerprint and cached quote types
//! - [`loader`] coalesces, caches and localizes quotes per checkout session

pub mod cache;
pub mod client;
pub mod loader;

pub use cache::{CachedQuote, QuoteFingerprint};
pub use client::{HttpRateQuoter, QuoteError, QuoteRequest, RateQuoter};
pub use loader::{LoaderSnapshot, ShippingMethodLoader};
