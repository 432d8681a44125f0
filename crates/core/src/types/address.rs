//! Postal addresses entered during checkout.

use serde::{Deserialize, Serialize};

/// Whether an address is used for shipping or billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    #[default]
    Shipping,
    Billing,
}

/// A postal address as entered in the checkout form.
///
/// Fields default to empty strings so partially filled forms still
/// deserialize; completeness is decided by the validators in
/// [`crate::validation`], not by the type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    #[serde(rename = "type")]
    pub kind: AddressKind,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    pub country: String,
    pub phone: String,
}
