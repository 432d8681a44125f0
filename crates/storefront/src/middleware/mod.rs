//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions, signed cookie)
//!
//! Checkout state is restored per handler by the [`CurrentCheckout`]
//! extractor.

pub mod checkout_guard;
pub mod session;

pub use checkout_guard::{Caller, CurrentCheckout, StepDenied};
pub use session::create_session_layer;
