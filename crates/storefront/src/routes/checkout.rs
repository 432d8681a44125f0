//! Checkout route handlers.
//!
//! Every handler restores the checkout through [`CurrentCheckout`], applies
//! its change and answers with the full [`CheckoutView`]. Shipping methods
//! come from the per-session loader held in [`AppState`].

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use rand::{Rng, distr::Alphanumeric};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;
use vinoteca_core::validation::{
    sanitize_address, validate_address, validate_payment_method, validate_shipping_info,
};
use vinoteca_core::{
    Address, CheckoutSession, CheckoutStep, Email, ErrorCode, FieldError, OrderData,
    PaymentMethod,
};

use crate::checkout::CheckoutError;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{Caller, CurrentCheckout};
use crate::routes::cart::{CartView, save_cart};
use crate::shipping::{LoaderSnapshot, QuoteFingerprint};
use crate::state::AppState;

/// Everything a checkout page needs to render.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutView {
    pub session: CheckoutSession,
    pub step_index: usize,
    pub can_proceed_to_payment: bool,
    pub can_proceed_to_review: bool,
    pub can_complete_order: bool,
    pub cart: CartView,
    pub shipping: LoaderSnapshot,
}

impl CheckoutView {
    async fn build(state: &AppState, checkout: &CurrentCheckout) -> Self {
        let store = &checkout.store;
        let shipping = state.loader_for(store.session_id()).await.snapshot();
        Self {
            session: store.session().clone(),
            step_index: store.current_step_index(),
            can_proceed_to_payment: store.can_proceed_to_payment(),
            can_proceed_to_review: store.can_proceed_to_review(),
            can_complete_order: store.can_complete_order(),
            cart: CartView::from(&checkout.cart),
            shipping,
        }
    }
}

/// Address submitted for a shipping quote.
#[derive(Debug, Deserialize)]
pub struct ShippingMethodsRequest {
    pub address: Address,
}

/// Shipping step form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveShippingRequest {
    pub address: Address,
    pub method_id: String,
}

/// Guest contact form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestRequest {
    pub email: String,
    #[serde(default)]
    pub email_updates: bool,
}

/// Response to a placed order.
#[derive(Debug, Serialize)]
pub struct OrderPlaced {
    pub order: OrderData,
    pub checkout: CheckoutView,
}

fn parse_step(raw: &str) -> Result<CheckoutStep> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("checkout step '{raw}'")))
}

/// Order number shown to the customer, e.g. `ORD-20261016-K3Z9QA`.
fn order_number(now: DateTime<Utc>) -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(6)
        .map(|byte| char::from(byte).to_ascii_uppercase())
        .collect();
    format!("ORD-{}-{suffix}", now.format("%Y%m%d"))
}

/// Order total sent with shipping quotes: the placed order's subtotal if
/// there is one, otherwise the cart's.
fn quote_total(checkout: &CurrentCheckout) -> Decimal {
    checkout
        .store
        .session()
        .order_subtotal()
        .unwrap_or_else(|| checkout.cart.subtotal())
}

// =============================================================================
// State
// =============================================================================

/// Full checkout state.
#[instrument(skip_all)]
pub async fn show(State(state): State<AppState>, checkout: CurrentCheckout) -> Json<CheckoutView> {
    Json(CheckoutView::build(&state, &checkout).await)
}

/// State of one step, if the customer may see it.
#[instrument(skip(state, checkout))]
pub async fn step(
    State(state): State<AppState>,
    Path(step): Path<String>,
    checkout: CurrentCheckout,
) -> Result<Response> {
    let step = parse_step(&step)?;
    if let Err(denied) = checkout.guard(step, Caller::Api) {
        return Ok(denied.into_response());
    }
    Ok(Json(CheckoutView::build(&state, &checkout).await).into_response())
}

/// Checkout page navigation. Moves the wizard to `step` when it is open and
/// redirects otherwise. After an order is placed earlier steps can still be
/// viewed but the wizard stays on confirmation.
#[instrument(skip(state, checkout))]
pub async fn page(
    State(state): State<AppState>,
    Path(step): Path<String>,
    mut checkout: CurrentCheckout,
) -> Result<Response> {
    let step = parse_step(&step)?;
    if let Err(denied) = checkout.guard(step, Caller::Page) {
        return Ok(denied.into_response());
    }
    // A placed order pins the wizard to confirmation
    let order_placed = checkout.store.session().order_data.is_some();
    if !order_placed && checkout.store.current_step() != step {
        checkout.store.set_current_step(step).await?;
    }
    Ok(Json(CheckoutView::build(&state, &checkout).await).into_response())
}

// =============================================================================
// Shipping
// =============================================================================

/// Load the shipping methods for the address being entered.
#[instrument(skip_all, fields(session_id = %checkout.store.session_id()))]
pub async fn shipping_methods(
    State(state): State<AppState>,
    checkout: CurrentCheckout,
    Json(request): Json<ShippingMethodsRequest>,
) -> Json<LoaderSnapshot> {
    let order_total = quote_total(&checkout);
    let loader = state.loader_for(checkout.store.session_id()).await;
    loader
        .load(&sanitize_address(&request.address), Some(order_total))
        .await;
    Json(loader.snapshot())
}

/// Fetch the last address's methods again.
#[instrument(skip_all, fields(session_id = %checkout.store.session_id()))]
pub async fn retry_shipping_methods(
    State(state): State<AppState>,
    checkout: CurrentCheckout,
) -> Json<LoaderSnapshot> {
    let loader = state.loader_for(checkout.store.session_id()).await;
    loader.retry().await;
    Json(loader.snapshot())
}

/// Save the shipping address and the chosen method.
///
/// The method must come from the quote currently shown for this very
/// address and order total.
#[instrument(skip_all, fields(session_id = %checkout.store.session_id()))]
pub async fn save_shipping(
    State(state): State<AppState>,
    mut checkout: CurrentCheckout,
    Json(request): Json<SaveShippingRequest>,
) -> Result<Json<CheckoutView>> {
    let address = sanitize_address(&request.address);
    let errors = validate_address(&address);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let fingerprint = QuoteFingerprint::new(&address, Some(quote_total(&checkout)));
    let loader = state.loader_for(checkout.store.session_id()).await;
    let Some(method) = loader.select(&fingerprint, &request.method_id) else {
        return Err(AppError::Validation(vec![FieldError::new(
            "method.id",
            ErrorCode::InvalidFormat,
            "Selected shipping method is not available for this address",
        )]));
    };

    let errors = validate_shipping_info(&address, &method);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    checkout.store.set_shipping_info(address, method).await?;
    Ok(Json(CheckoutView::build(&state, &checkout).await))
}

// =============================================================================
// Payment & guest
// =============================================================================

/// Save the payment selection.
#[instrument(skip_all, fields(session_id = %checkout.store.session_id()))]
pub async fn save_payment(
    State(state): State<AppState>,
    mut checkout: CurrentCheckout,
    Json(method): Json<PaymentMethod>,
) -> Result<Json<CheckoutView>> {
    let errors = validate_payment_method(&method);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    checkout.store.set_payment_method_state(method).await?;
    Ok(Json(CheckoutView::build(&state, &checkout).await))
}

/// Save the guest's contact email.
#[instrument(skip_all, fields(session_id = %checkout.store.session_id()))]
pub async fn save_guest(
    State(state): State<AppState>,
    mut checkout: CurrentCheckout,
    Json(request): Json<GuestRequest>,
) -> Result<Json<CheckoutView>> {
    let email = Email::parse(&request.email).map_err(|_| {
        AppError::Validation(vec![FieldError::new(
            "email",
            ErrorCode::InvalidFormat,
            "Invalid email address",
        )])
    })?;

    checkout
        .store
        .set_guest_info(email, request.email_updates)
        .await?;
    Ok(Json(CheckoutView::build(&state, &checkout).await))
}

// =============================================================================
// Navigation
// =============================================================================

/// Advance one step.
#[instrument(skip_all, fields(session_id = %checkout.store.session_id()))]
pub async fn next(
    State(state): State<AppState>,
    mut checkout: CurrentCheckout,
) -> Result<Json<CheckoutView>> {
    let step = checkout
        .store
        .proceed_to_next_step(checkout.cart.is_empty())
        .await?;
    tracing::info!(%step, "Checkout advanced");
    Ok(Json(CheckoutView::build(&state, &checkout).await))
}

/// Go back one step. Stays put on the first step.
#[instrument(skip_all, fields(session_id = %checkout.store.session_id()))]
pub async fn previous(
    State(state): State<AppState>,
    mut checkout: CurrentCheckout,
) -> Result<Json<CheckoutView>> {
    checkout.store.go_to_previous_step().await?;
    Ok(Json(CheckoutView::build(&state, &checkout).await))
}

/// Discard the checkout and start a new one. The cart is kept.
#[instrument(skip_all, fields(session_id = %checkout.store.session_id()))]
pub async fn reset(
    State(state): State<AppState>,
    mut checkout: CurrentCheckout,
) -> Result<Json<CheckoutView>> {
    let old_session_id = checkout.store.session_id().to_string();
    checkout.store.reset().await?;
    state.forget_loader(&old_session_id).await;
    Ok(Json(CheckoutView::build(&state, &checkout).await))
}

// =============================================================================
// Order
// =============================================================================

/// Place the order for the cart's contents.
///
/// Freezes the order in the checkout, empties the cart and moves to the
/// confirmation step.
#[instrument(skip_all, fields(session_id = %checkout.store.session_id()))]
pub async fn place_order(
    State(state): State<AppState>,
    mut checkout: CurrentCheckout,
) -> Result<Response> {
    if checkout.store.session().order_data.is_some() {
        return Err(CheckoutError::OrderAlreadyPlaced.into());
    }
    if let Err(denied) = checkout.guard(CheckoutStep::Review, Caller::Api) {
        return Ok(denied.into_response());
    }
    if checkout.cart.is_empty() {
        return Err(AppError::BadRequest("The cart is empty".to_string()));
    }
    if !checkout.store.can_proceed_to_review() {
        return Err(AppError::BadRequest(
            "Shipping and payment details are incomplete".to_string(),
        ));
    }

    let session = checkout.store.session();
    let shipping_cost = session
        .shipping_info
        .as_ref()
        .map(|info| info.method.price)
        .unwrap_or_default();
    let customer_email = session
        .guest_info
        .as_ref()
        .map(|guest| guest.email.as_str().to_string());

    let order = OrderData::new(
        Uuid::new_v4().to_string(),
        order_number(Utc::now()),
        checkout.cart.order_items(),
        shipping_cost,
        customer_email,
    );

    checkout.store.set_order_data(order.clone()).await?;
    checkout.cart.clear();
    save_cart(&checkout.session, &checkout.cart).await?;
    checkout
        .store
        .set_current_step(CheckoutStep::Confirmation)
        .await?;

    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_number", order.order_number.as_str())]),
    );

    let view = CheckoutView::build(&state, &checkout).await;
    Ok(Json(OrderPlaced {
        order,
        checkout: view,
    })
    .into_response())
}
