//! Session-backed shopping cart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vinoteca_core::OrderItem;

/// Errors changing the cart.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("Cart total is too large")]
    TotalOverflow,
}

/// A product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl CartItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.saturating_mul(Decimal::from(self.quantity))
    }

    fn checked_line_total(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// The customer's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a line, merging quantities with an existing line for the same
    /// product. The newest name and price win.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::TotalOverflow`] and leaves the cart unchanged if
    /// the new subtotal cannot be represented.
    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        let mut items = self.items.clone();
        if let Some(existing) = items
            .iter_mut()
            .find(|existing| existing.product_id == item.product_id)
        {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
            existing.name = item.name;
            existing.unit_price = item.unit_price;
        } else {
            items.push(item);
        }

        items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| {
                total.checked_add(item.checked_line_total()?)
            })
            .ok_or(CartError::TotalOverflow)?;
        self.items = items;
        Ok(())
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .fold(Decimal::ZERO, |total, item| total.saturating_add(item.line_total()))
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |count, item| count.saturating_add(item.quantity))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// The cart's lines as order lines.
    #[must_use]
    pub fn order_items(&self) -> Vec<OrderItem> {
        self.items
            .iter()
            .map(|item| {
                OrderItem::new(
                    item.product_id.clone(),
                    item.name.clone(),
                    item.quantity,
                    item.unit_price,
                )
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(product_id: &str, quantity: u32, cents: i64) -> CartItem {
        CartItem {
            product_id: product_id.to_string(),
            name: product_id.to_uppercase(),
            unit_price: Decimal::new(cents, 2),
            quantity,
        }
    }

    #[test]
    fn test_add_item_merges_quantities() {
        let mut cart = Cart::default();
        assert!(cart.is_empty());

        cart.add_item(item("rioja", 1, 1800)).unwrap();
        cart.add_item(item("albarino", 2, 1250)).unwrap();
        cart.add_item(item("rioja", 2, 1800)).unwrap();

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items[0].quantity, 3);
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.subtotal(), Decimal::new(7900, 2));
    }

    #[test]
    fn test_clear_and_order_items() {
        let mut cart = Cart::default();
        cart.add_item(item("rioja", 2, 1800)).unwrap();

        let lines = cart.order_items();
        assert_eq!(lines[0].line_total, Decimal::new(3600, 2));

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Decimal::ZERO);
    }

    #[test]
    fn test_overflowing_total_is_rejected() {
        let huge = CartItem {
            unit_price: Decimal::from_i128_with_scale(7 * 10_i128.pow(28), 0),
            ..item("vault", 2, 0)
        };
        let mut cart = Cart::default();
        assert_eq!(cart.add_item(huge.clone()), Err(CartError::TotalOverflow));
        assert!(cart.is_empty());

        let single = CartItem {
            quantity: 1,
            ..huge
        };
        cart.add_item(single.clone()).unwrap();
        // Merging would double the line
        assert_eq!(cart.add_item(single.clone()), Err(CartError::TotalOverflow));
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.subtotal(), single.unit_price);
    }
}
