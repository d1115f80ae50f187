//! Shared types for the marketplace billing engine
//!
//! Domain models (plans, usage, orders, commission records, invoices),
//! the unified error system and money helpers used by every crate in the
//! workspace.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, ErrorCode};
