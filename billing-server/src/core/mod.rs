//! Core server configuration

pub mod config;

pub use config::{BillingSettings, Config, Environment};
