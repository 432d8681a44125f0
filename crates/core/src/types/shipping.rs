//! Shipping methods quoted for an address.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier of the method substituted when the rate service fails.
pub const FALLBACK_METHOD_ID: &str = "standard";

/// A shipping option the customer can choose.
///
/// `price` and `estimated_days` are passed through from the rate service;
/// `name` and `description` are localized before they reach the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingMethod {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub estimated_days: u32,
}

impl ShippingMethod {
    /// The "standard" method offered when no quote could be fetched.
    ///
    /// Name and description are the untranslated defaults.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            id: FALLBACK_METHOD_ID.to_string(),
            name: "Standard".to_string(),
            description: "Standard shipping".to_string(),
            price: Decimal::new(599, 2),
            estimated_days: 4,
        }
    }

    /// Translation key for the method's name.
    #[must_use]
    pub fn name_key(&self) -> String {
        format!("checkout.shippingMethod.{}.name", self.id)
    }

    /// Translation key for the method's description.
    #[must_use]
    pub fn description_key(&self) -> String {
        format!("checkout.shippingMethod.{}.description", self.id)
    }
}
