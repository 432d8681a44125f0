//! Currency codes.
//!
//! Amounts are carried as `Decimal` in the currency's standard unit
//! (euros, not cents).

use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes accepted at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    EUR,
    USD,
    GBP,
    RON,
    MDL,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_currency_is_euro() {
        assert_eq!(CurrencyCode::default(), CurrencyCode::EUR);
    }
}
