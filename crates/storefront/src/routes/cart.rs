//! Cart route handlers.
//!
//! The cart is stored in the session under [`session_keys::CART`]. Prices
//! come from the client; the cart only totals them.

use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::checkout::PersistenceError;
use crate::error::{AppError, Result};
use crate::models::{Cart, CartItem, session_keys};

/// Cart data returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    pub item_count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items.clone(),
            subtotal: cart.subtotal(),
            item_count: cart.item_count(),
        }
    }
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub quantity: u32,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart from the session. A missing cart is empty.
///
/// # Errors
///
/// Returns an error if the session store cannot be read.
pub async fn load_cart(session: &Session) -> std::result::Result<Cart, PersistenceError> {
    Ok(session
        .get::<Cart>(session_keys::CART)
        .await?
        .unwrap_or_default())
}

/// Save the cart to the session.
///
/// # Errors
///
/// Returns an error if the session store cannot be written.
pub async fn save_cart(session: &Session, cart: &Cart) -> std::result::Result<(), PersistenceError> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

// =============================================================================
// Route Handlers
// =============================================================================

/// Show the cart.
#[instrument(skip(session))]
pub async fn show(session: Session) -> Result<Json<CartView>> {
    let cart = load_cart(&session).await?;
    Ok(Json(CartView::from(&cart)))
}

/// Add an item to the cart.
#[instrument(skip_all, fields(product_id = %request.product_id))]
pub async fn add(session: Session, Json(request): Json<AddItemRequest>) -> Result<Json<CartView>> {
    if request.product_id.trim().is_empty() || request.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "productId and name are required".to_string(),
        ));
    }
    if request.quantity == 0 {
        return Err(AppError::BadRequest("quantity must be positive".to_string()));
    }
    if request.unit_price.is_sign_negative() {
        return Err(AppError::BadRequest(
            "unitPrice must not be negative".to_string(),
        ));
    }

    let mut cart = load_cart(&session).await?;
    cart.add_item(CartItem {
        product_id: request.product_id.trim().to_string(),
        name: request.name.trim().to_string(),
        unit_price: request.unit_price,
        quantity: request.quantity,
    })
    .map_err(|e| AppError::BadRequest(e.to_string()))?;
    save_cart(&session, &cart).await?;

    tracing::debug!(item_count = cart.item_count(), "Cart updated");
    Ok(Json(CartView::from(&cart)))
}
