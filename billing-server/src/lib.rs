//! Marketplace billing engine
//!
//! Usage metering, plan limits, per-order commission and monthly invoicing
//! for businesses selling through the marketplace.
//!
//! - [`billing`]: the engine (plans, limits, commission, recorder, invoices)
//! - [`db`]: storage abstraction and adapters
//! - [`api`]: HTTP trigger and query surface
//! - [`core`]: configuration
//! - [`common`]: logging

pub mod api;
pub mod billing;
pub mod common;
pub mod core;
pub mod db;
pub mod error;
pub mod state;

pub use crate::core::{BillingSettings, Config, Environment};
pub use state::AppState;
