//! Cache types for shipping quotes.

use rust_decimal::Decimal;
use vinoteca_core::{Address, ShippingMethod};

/// Cache key identifying a distinct quote request.
///
/// Country and postal code are trimmed and upper-cased so that cosmetic edits
/// to the form do not trigger a new fetch. A missing order total counts as zero.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct QuoteFingerprint {
    pub country: String,
    pub postal_code: String,
    pub order_total: Decimal,
}

impl QuoteFingerprint {
    #[must_use]
    pub fn new(address: &Address, order_total: Option<Decimal>) -> Self {
        Self {
            country: address.country.trim().to_uppercase(),
            postal_code: address.postal_code.trim().to_uppercase(),
            order_total: order_total.unwrap_or_default().normalize(),
        }
    }
}

/// Outcome of a completed fetch.
///
/// Failed fetches are cached too: `methods` then holds the fallback method
/// and `error` the message shown to the customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedQuote {
    pub methods: Vec<ShippingMethod>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_normalizes_address_fields() {
        let address = Address {
            country: " es ".to_string(),
            postal_code: "28013 ".to_string(),
            city: "Madrid".to_string(),
            ..Address::default()
        };
        let other = Address {
            country: "ES".to_string(),
            postal_code: "28013".to_string(),
            city: "Alcala".to_string(),
            ..Address::default()
        };
        assert_eq!(
            QuoteFingerprint::new(&address, Some(Decimal::new(5000, 2))),
            QuoteFingerprint::new(&other, Some(Decimal::new(50, 0)))
        );
    }

    #[test]
    fn test_missing_total_counts_as_zero() {
        let address = Address {
            country: "RO".to_string(),
            postal_code: "010011".to_string(),
            ..Address::default()
        };
        assert_eq!(
            QuoteFingerprint::new(&address, None),
            QuoteFingerprint::new(&address, Some(Decimal::ZERO))
        );
        assert_ne!(
            QuoteFingerprint::new(&address, None),
            QuoteFingerprint::new(&address, Some(Decimal::ONE))
        );
    }
}
