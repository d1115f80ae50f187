//! Billing engine
//!
//! - [`plans`]: plan catalog (resolution, defaults, seeding)
//! - [`limits`]: monthly limit checks and usage counters
//! - [`commission`]: per-order commission math
//! - [`recorder`]: idempotent commission recording on order completion
//! - [`invoice`]: monthly invoice generation
//! - [`scheduler`]: background monthly invoicing

pub mod commission;
pub mod invoice;
pub mod limits;
pub mod plans;
pub mod recorder;
pub mod scheduler;

pub use commission::{CommissionCalculator, CommissionInput, calculate, classify_channel};
pub use invoice::{BatchReport, InvoiceGenerator};
pub use limits::{LimitCheck, LimitEnforcer, Locale, UsageSummary};
pub use plans::{PlanCatalog, default_plans, seed_default_plans};
pub use recorder::{CommissionRecorder, RecordOutcome, SkipReason};
pub use scheduler::InvoiceScheduler;
