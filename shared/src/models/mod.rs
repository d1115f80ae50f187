//! Data models
//!
//! Shared between the billing engine, its storage adapters and API clients.
//! Money is `rust_decimal::Decimal`, serialized as JSON numbers.

pub mod business;
pub mod commission;
pub mod invoice;
pub mod order;
pub mod period;
pub mod plan;

// Re-exports
pub use business::*;
pub use commission::*;
pub use invoice::*;
pub use order::*;
pub use period::*;
pub use plan::*;
