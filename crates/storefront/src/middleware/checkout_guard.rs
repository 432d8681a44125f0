//! Checkout extractors and step guards.
//!
//! [`CurrentCheckout`] restores the customer's checkout and cart from the
//! session at the start of a handler. [`CurrentCheckout::guard`] applies the
//! step access rules and turns a denial into the right response for the
//! caller: a redirect for pages, a JSON conflict for the API.

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use vinoteca_core::{CheckoutStep, RedirectTarget, StepAccess, check_step_access};

use crate::checkout::{CheckoutError, CheckoutStore, SessionPersistence};
use crate::error::AppError;
use crate::models::Cart;
use crate::routes::cart::load_cart;

/// The request's checkout store, cart and raw session.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(mut checkout: CurrentCheckout) -> Result<Json<CheckoutSession>> {
///     checkout.store.set_current_step(CheckoutStep::Payment).await?;
///     Ok(Json(checkout.store.session().clone()))
/// }
/// ```
pub struct CurrentCheckout {
    pub store: CheckoutStore<SessionPersistence>,
    pub cart: Cart,
    pub session: Session,
}

impl<S> FromRequestParts<S> for CurrentCheckout
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer is not installed".to_string()))?;

        let store = CheckoutStore::restore(SessionPersistence::new(session.clone())).await?;
        let cart = load_cart(&session).await?;

        Ok(Self {
            store,
            cart,
            session,
        })
    }
}

impl CurrentCheckout {
    /// Check whether `step` may be shown right now.
    ///
    /// # Errors
    ///
    /// Returns the denial for the caller to send back.
    pub fn guard(&self, step: CheckoutStep, kind: Caller) -> Result<(), StepDenied> {
        match check_step_access(step, self.store.session(), self.cart.is_empty()) {
            StepAccess::Granted => Ok(()),
            StepAccess::Redirect(redirect) => {
                tracing::debug!(%step, target = redirect.path(), "Checkout step denied");
                Err(StepDenied {
                    step,
                    redirect,
                    kind,
                })
            }
        }
    }
}

/// Who is asking for a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// A browser navigating to a page.
    Page,
    /// A JSON API client.
    Api,
}

/// A refused step, rendered according to the caller.
#[derive(Debug)]
pub struct StepDenied {
    pub step: CheckoutStep,
    pub redirect: RedirectTarget,
    pub kind: Caller,
}

impl IntoResponse for StepDenied {
    fn into_response(self) -> Response {
        match self.kind {
            Caller::Page => Redirect::to(self.redirect.path()).into_response(),
            Caller::Api => AppError::from(CheckoutError::StepLocked {
                step: self.step,
                redirect: self.redirect,
            })
            .into_response(),
        }
    }
}
