//! Checkout wizard steps.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A step of the checkout wizard.
///
/// Steps are ordered: shipping → payment → review → confirmation.
/// `Confirmation` is terminal for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    #[default]
    Shipping,
    Payment,
    Review,
    Confirmation,
}

/// Error returned when a string does not name a checkout step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid checkout step: {0}")]
pub struct InvalidStep(pub String);

impl CheckoutStep {
    /// All steps in wizard order.
    pub const ALL: [Self; 4] = [Self::Shipping, Self::Payment, Self::Review, Self::Confirmation];

    /// The step's wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shipping => "shipping",
            Self::Payment => "payment",
            Self::Review => "review",
            Self::Confirmation => "confirmation",
        }
    }

    /// Zero-based position in the wizard.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Shipping => 0,
            Self::Payment => 1,
            Self::Review => 2,
            Self::Confirmation => 3,
        }
    }

    /// The step after this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Shipping => Some(Self::Payment),
            Self::Payment => Some(Self::Review),
            Self::Review => Some(Self::Confirmation),
            Self::Confirmation => None,
        }
    }

    /// The step before this one, if any.
    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Shipping => None,
            Self::Payment => Some(Self::Shipping),
            Self::Review => Some(Self::Payment),
            Self::Confirmation => Some(Self::Review),
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CheckoutStep {
    type Err = InvalidStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shipping" => Ok(Self::Shipping),
            "payment" => Ok(Self::Payment),
            "review" => Ok(Self::Review),
            "confirmation" => Ok(Self::Confirmation),
            _ => Err(InvalidStep(s.to_string())),
        }
    }
}
