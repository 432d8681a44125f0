//! Payment method chosen at checkout.
//!
//! Only the choice is recorded here. Card numbers and other credentials
//! never enter the checkout session.

use serde::{Deserialize, Serialize};

/// Kind of payment the customer selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    /// Cash on delivery.
    Cash,
    CreditCard,
}

/// The customer's payment selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    #[serde(rename = "type")]
    pub kind: PaymentKind,
    /// Cardholder name, required for card payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_name: Option<String>,
}

impl PaymentMethod {
    /// Cash on delivery.
    #[must_use]
    pub const fn cash() -> Self {
        Self {
            kind: PaymentKind::Cash,
            holder_name: None,
        }
    }
}
