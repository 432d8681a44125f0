//! Placed order summary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::CurrencyCode;

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub line_total: Decimal,
}

impl OrderItem {
    /// Create a line, computing its total from the unit price.
    #[must_use]
    pub fn new(product_id: String, name: String, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            line_total: unit_price.saturating_mul(Decimal::from(quantity)),
            product_id,
            name,
            quantity,
            unit_price,
        }
    }
}

/// The order produced when checkout completes.
///
/// Recorded once per checkout session and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    pub order_id: String,
    pub order_number: String,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
}

impl OrderData {
    /// Build an order from its lines and shipping cost.
    ///
    /// Prices are tax-inclusive, so `tax` is recorded as zero.
    #[must_use]
    pub fn new(
        order_id: String,
        order_number: String,
        items: Vec<OrderItem>,
        shipping_cost: Decimal,
        customer_email: Option<String>,
    ) -> Self {
        let subtotal = items
            .iter()
            .fold(Decimal::ZERO, |total, item| total.saturating_add(item.line_total));
        Self {
            order_id,
            order_number,
            items,
            subtotal,
            shipping_cost,
            tax: Decimal::ZERO,
            total: subtotal.saturating_add(shipping_cost),
            currency: CurrencyCode::default(),
            customer_email,
        }
    }
}
