//! Core types for the checkout.
//!
//! This module provides the data carried through the checkout wizard.

pub mod address;
pub mod email;
pub mod money;
pub mod order;
pub mod payment;
pub mod session;
pub mod shipping;
pub mod step;

pub use address::{Address, AddressKind};
pub use email::{Email, EmailError};
pub use money::CurrencyCode;
pub use order::{OrderData, OrderItem};
pub use payment::{PaymentKind, PaymentMethod};
pub use session::{CheckoutSession, GuestInfo, ShippingInfo};
pub use shipping::{FALLBACK_METHOD_ID, ShippingMethod};
pub use step::{CheckoutStep, InvalidStep};
