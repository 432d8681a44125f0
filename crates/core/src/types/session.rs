//! Checkout session data.
//!
//! [`CheckoutSession`] is the state of one customer's checkout wizard. It is
//! serialized to the session store after every change and rebuilt from it on
//! the next request, so deserialization is deliberately forgiving about the
//! current step: an unknown step name restores as [`CheckoutStep::Shipping`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::address::Address;
use super::email::Email;
use super::order::OrderData;
use super::payment::PaymentMethod;
use super::shipping::ShippingMethod;
use super::step::CheckoutStep;

/// Address and method chosen on the shipping step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub address: Address,
    pub method: ShippingMethod,
}

/// Contact details of a customer checking out without an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestInfo {
    pub email: Email,
    #[serde(default)]
    pub email_updates: bool,
}

/// State of a checkout wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    #[serde(default)]
    pub session_id: String,
    #[serde(default, deserialize_with = "lenient_step")]
    pub current_step: CheckoutStep,
    #[serde(default)]
    pub shipping_info: Option<ShippingInfo>,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub guest_info: Option<GuestInfo>,
    #[serde(default)]
    pub order_data: Option<OrderData>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Read a step name, mapping anything unrecognized to the first step.
fn lenient_step<'de, D>(deserializer: D) -> Result<CheckoutStep, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw
        .as_str()
        .and_then(|name| name.parse().ok())
        .unwrap_or_default())
}

impl CheckoutSession {
    /// Start a new session on the shipping step.
    #[must_use]
    pub fn new(session_id: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            session_id: session_id.into(),
            expires_at,
            ..Self::default()
        }
    }

    /// Rebuild a session from its persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an object or a nested record is
    /// malformed. An unknown `currentStep` is not an error.
    pub fn from_persisted(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Subtotal of the placed order, if there is one.
    #[must_use]
    pub fn order_subtotal(&self) -> Option<Decimal> {
        self.order_data.as_ref().map(|order| order.subtotal)
    }

    /// Whether an order with a non-empty id has been recorded.
    #[must_use]
    pub fn has_order_id(&self) -> bool {
        self.order_data
            .as_ref()
            .is_some_and(|order| !order.order_id.is_empty())
    }

    /// Whether the session expired before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }
}
