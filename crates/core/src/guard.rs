//! Step access rules for the checkout wizard.
//!
//! Each step has a precondition on the checkout session (and, for the first
//! step, on the cart). A step whose precondition fails is answered with the
//! step the customer should be sent to instead.

use serde::Serialize;

use crate::types::{CheckoutSession, CheckoutStep};

/// Where a denied step sends the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectTarget {
    Cart,
    Shipping,
    Payment,
}

impl RedirectTarget {
    /// Storefront path of the target page.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Cart => "/cart",
            Self::Shipping => "/checkout/shipping",
            Self::Payment => "/checkout/payment",
        }
    }
}

/// Outcome of a step access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAccess {
    Granted,
    Redirect(RedirectTarget),
}

impl StepAccess {
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Decide whether `step` may be shown for `session`.
///
/// The shipping step needs a non-empty cart, except right after an order is
/// placed (the cart has been emptied but the customer may still look back).
/// Payment needs shipping info, review needs shipping info and a payment
/// method, and confirmation needs a placed order or a session already at the
/// end of the wizard.
#[must_use]
pub fn check_step_access(
    step: CheckoutStep,
    session: &CheckoutSession,
    cart_is_empty: bool,
) -> StepAccess {
    match step {
        CheckoutStep::Shipping => {
            if !cart_is_empty || session.current_step == CheckoutStep::Confirmation {
                StepAccess::Granted
            } else {
                StepAccess::Redirect(RedirectTarget::Cart)
            }
        }
        CheckoutStep::Payment => {
            if session.shipping_info.is_some() {
                StepAccess::Granted
            } else {
                StepAccess::Redirect(RedirectTarget::Shipping)
            }
        }
        CheckoutStep::Review => match (&session.shipping_info, &session.payment_method) {
            (Some(_), Some(_)) => StepAccess::Granted,
            (None, _) => StepAccess::Redirect(RedirectTarget::Shipping),
            (Some(_), None) => StepAccess::Redirect(RedirectTarget::Payment),
        },
        CheckoutStep::Confirmation => {
            if session.has_order_id()
                || matches!(
                    session.current_step,
                    CheckoutStep::Confirmation | CheckoutStep::Review
                )
            {
                StepAccess::Granted
            } else {
                StepAccess::Redirect(RedirectTarget::Cart)
            }
        }
    }
}
