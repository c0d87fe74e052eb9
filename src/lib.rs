//! BrewPay Checkout Library
//!
//! This crate provides the client-side checkout workflow: payment validation
//! (card number, expiry, CVV), branching between Cash-on-Delivery, card and
//! simulated QR/UPI payment, and the timed asynchronous order-submission
//! state machine.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod clients;
pub mod config;
pub mod errors;
pub mod events;
pub mod logging;
pub mod models;
pub mod services;
pub mod validation;

pub use config::CheckoutConfig;
pub use errors::ServiceError;
pub use services::checkout::OrderFormController;
