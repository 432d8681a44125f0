//! Vinoteca Core - Checkout domain library.
//!
//! This crate provides the types and pure rules shared by the checkout
//! service:
//! - `storefront` - HTTP service running the checkout wizard
//! - `integration-tests` - end-to-end checks against the storefront router
//!
//! # Architecture
//!
//! The core crate contains only types, predicates and validation - no I/O, no
//! session storage, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Addresses, shipping methods, checkout steps and session data
//! - [`validation`] - Address/payment/shipping validation rules
//! - [`guard`] - Step access predicates for the checkout wizard

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod guard;
pub mod types;
pub mod validation;

pub use guard::{RedirectTarget, StepAccess, check_step_access};
pub use types::*;
pub use validation::{ErrorCode, FieldError, is_address_complete_for_quoting};
