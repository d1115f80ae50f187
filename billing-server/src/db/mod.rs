//! Storage layer
//!
//! `BillingStore` is the only path by which the engine touches persisted
//! state. Two adapters:
//! - [`MemoryStore`]: in-process, used by tests and local development
//! - [`PgStore`]: PostgreSQL via sqlx
//!
//! Counters are always mutated with field-level increments. No adapter
//! reads a document, changes it and writes it back.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::models::{
    BillingPeriod, Business, CommissionRecord, Invoice, LimitType, MonthUsage, PlanDocument,
};
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Duplicate(db.message().to_string())
            }
            // usage/balance rows reference businesses(id)
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                RepoError::NotFound(db.message().to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(err: serde_json::Error) -> Self {
        RepoError::Serialization(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Persisted state of the billing engine
#[async_trait]
pub trait BillingStore: Send + Sync {
    // ========== Plan Catalog ==========

    /// Primary key lookup
    async fn find_plan_by_id(&self, id: &str) -> RepoResult<Option<PlanDocument>>;
    /// Secondary lookup on the `code` field
    async fn find_plan_by_code(&self, code: &str) -> RepoResult<Option<PlanDocument>>;
    async fn list_plans(&self) -> RepoResult<Vec<PlanDocument>>;
    async fn upsert_plan(&self, plan: &PlanDocument) -> RepoResult<()>;
    /// Returns `true` if the plan was inserted, `false` if the id already existed
    async fn insert_plan_if_absent(&self, plan: &PlanDocument) -> RepoResult<bool>;

    // ========== Businesses ==========

    async fn find_business(&self, id: &str) -> RepoResult<Option<Business>>;
    /// Creates or replaces profile fields. Counters and `account_balance`
    /// of an existing business are left untouched.
    async fn upsert_business(&self, business: &Business) -> RepoResult<()>;
    async fn list_business_ids(&self) -> RepoResult<Vec<String>>;

    // ========== Usage Ledger ==========

    /// Counters of one month, zeroed when nothing was recorded
    async fn month_usage(&self, business_id: &str, period: BillingPeriod)
    -> RepoResult<MonthUsage>;

    /// Atomically add `amount` to the counter of `limit_type`
    async fn increment_usage(
        &self,
        business_id: &str,
        period: BillingPeriod,
        limit_type: LimitType,
        amount: u64,
    ) -> RepoResult<()>;

    /// Per-field atomic update for one recorded order:
    /// `orders += 1`, `total_commission += commission`, `last_order_at = at`
    async fn record_order_usage(
        &self,
        business_id: &str,
        period: BillingPeriod,
        commission: Decimal,
        at: i64,
    ) -> RepoResult<()>;

    async fn increment_account_balance(&self, business_id: &str, amount: Decimal)
    -> RepoResult<()>;

    /// Reset `account_balance` to zero, returning the amount cleared
    async fn clear_account_balance(&self, business_id: &str) -> RepoResult<Decimal>;

    // ========== Commission ledger ==========

    /// Create-if-absent keyed by `order_id`.
    /// Returns `false` when a record for the order already exists.
    async fn insert_commission_if_absent(&self, record: &CommissionRecord) -> RepoResult<bool>;
    async fn find_commission_by_order(&self, order_id: &str)
    -> RepoResult<Option<CommissionRecord>>;
    async fn list_commissions(
        &self,
        business_id: &str,
        period: BillingPeriod,
    ) -> RepoResult<Vec<CommissionRecord>>;

    // ========== Invoices ==========

    async fn find_invoice(
        &self,
        business_id: &str,
        period: BillingPeriod,
    ) -> RepoResult<Option<Invoice>>;
    /// Upsert keyed by business + period
    async fn save_invoice(&self, invoice: &Invoice) -> RepoResult<()>;
    async fn list_invoices(&self, business_id: &str) -> RepoResult<Vec<Invoice>>;
}
