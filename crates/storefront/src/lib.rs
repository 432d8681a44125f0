//! Vinoteca Storefront library.
//!
//! This crate provides the checkout service as a library, allowing it to be
//! tested and reused. The binary in `main.rs` adds configuration, Sentry and
//! the `PostgreSQL` session store.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod shipping;
pub mod state;
pub mod translations;

pub use routes::app;
pub use state::AppState;
