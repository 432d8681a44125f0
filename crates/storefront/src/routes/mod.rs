//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness check
//! GET  /health/ready                        - Database readiness check
//!
//! # Cart
//! GET  /api/cart                            - Cart contents
//! POST /api/cart/items                      - Add an item
//!
//! # Checkout API
//! GET  /api/checkout                        - Full checkout state
//! GET  /api/checkout/steps/{step}           - Guarded step state (409 when locked)
//! POST /api/checkout/shipping-methods       - Load methods for an address
//! POST /api/checkout/shipping-methods/retry - Retry the last address
//! POST /api/checkout/shipping               - Save address + chosen method
//! POST /api/checkout/payment                - Save payment method
//! POST /api/checkout/guest                  - Save guest email
//! POST /api/checkout/next                   - Advance one step
//! POST /api/checkout/previous               - Go back one step
//! POST /api/checkout/order                  - Place the order
//! POST /api/checkout/reset                  - Start over
//!
//! # Checkout pages
//! GET  /checkout/{step}                     - Guarded step (303 when locked)
//! ```

pub mod cart;
pub mod checkout;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::service::SignedCookie;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::db;
use crate::state::AppState;

/// Create the cart API routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/items", post(cart::add))
}

/// Create the checkout API routes router.
pub fn checkout_api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show))
        .route("/steps/{step}", get(checkout::step))
        .route("/shipping-methods", post(checkout::shipping_methods))
        .route(
            "/shipping-methods/retry",
            post(checkout::retry_shipping_methods),
        )
        .route("/shipping", post(checkout::save_shipping))
        .route("/payment", post(checkout::save_payment))
        .route("/guest", post(checkout::save_guest))
        .route("/next", post(checkout::next))
        .route("/previous", post(checkout::previous))
        .route("/order", post(checkout::place_order))
        .route("/reset", post(checkout::reset))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/cart", cart_routes())
        .nest("/api/checkout", checkout_api_routes())
        .route("/checkout/{step}", get(checkout::page))
}

/// Build the application with its session and tracing layers.
///
/// Sentry layers are added by the binary.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S, SignedCookie>) -> Router
where
    S: SessionStore + Clone,
{
    routes()
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match db::ping(state.pool()).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
