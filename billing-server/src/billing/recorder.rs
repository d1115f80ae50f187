//! Commission Recorder
//!
//! Reacts to order status changes. On a transition into `delivered` or
//! `completed` it writes at most one `CommissionRecord` per order and then
//! updates the usage ledger. The ledger is only touched when the
//! create-if-absent insert actually created the record, so a retried or
//! doubled trigger never double-counts.
//!
//! Billing never blocks the order lifecycle: resolution failures are
//! skipped with a warning and store failures are logged, not propagated.
//! Only a resolved plan is billed; the fallback rate is reserved for
//! standalone calculations.

use serde::Serialize;
use shared::models::{BillingPeriod, CommissionRecord, Order, OrderStatusChange};
use shared::util::now_millis;
use std::sync::Arc;

use super::commission::{CommissionCalculator, classify_channel};
use super::plans::PlanCatalog;
use crate::common::logger::LEDGER_TARGET;
use crate::db::BillingStore;
use crate::error::ServiceResult;

/// Why a trigger was skipped
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    BusinessIdMissing,
    BusinessNotFound(String),
    /// Plan code the business is billed under did not resolve
    PlanNotFound(String),
    InvalidOrderTotal(String),
    /// Store failure while recording; nothing is retried
    StoreFailure(String),
}

/// Result of handling one trigger
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum RecordOutcome {
    Recorded(Box<CommissionRecord>),
    /// The record was written but the usage ledger update failed.
    /// Usage and balance need reconciliation for this record.
    LedgerIncomplete(Box<CommissionRecord>),
    /// A record for this order already exists
    Duplicate,
    /// Status change does not trigger commission
    NotTriggered,
    Skipped(SkipReason),
}

impl RecordOutcome {
    pub fn record(&self) -> Option<&CommissionRecord> {
        match self {
            Self::Recorded(record) | Self::LedgerIncomplete(record) => Some(record.as_ref()),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct CommissionRecorder {
    store: Arc<dyn BillingStore>,
    catalog: Arc<PlanCatalog>,
    calculator: CommissionCalculator,
}

impl CommissionRecorder {
    pub fn new(store: Arc<dyn BillingStore>, catalog: Arc<PlanCatalog>) -> Self {
        let calculator = CommissionCalculator::new(store.clone(), catalog.clone());
        Self {
            store,
            catalog,
            calculator,
        }
    }

    /// Trigger entry point. Never fails.
    pub async fn on_order_status_changed(&self, change: &OrderStatusChange) -> RecordOutcome {
        if !change.is_commission_trigger() {
            return RecordOutcome::NotTriggered;
        }

        match self.record_order(&change.after).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    order_id = %change.after.id,
                    error = %e,
                    "Commission recording failed, order continues unbilled"
                );
                RecordOutcome::Skipped(SkipReason::StoreFailure(e.to_string()))
            }
        }
    }

    /// Record commission for a delivered/completed order
    pub async fn record_order(&self, order: &Order) -> ServiceResult<RecordOutcome> {
        let Some(business_id) = order.owner_id() else {
            tracing::warn!(order_id = %order.id, "Order has no business id, commission skipped");
            return Ok(RecordOutcome::Skipped(SkipReason::BusinessIdMissing));
        };

        if order.total_amount.is_sign_negative() {
            tracing::warn!(
                order_id = %order.id,
                total = %order.total_amount,
                "Negative order total, commission skipped"
            );
            return Ok(RecordOutcome::Skipped(SkipReason::InvalidOrderTotal(
                order.total_amount.to_string(),
            )));
        }

        let Some(business) = self.store.find_business(business_id).await? else {
            tracing::warn!(
                order_id = %order.id,
                business_id = %business_id,
                "Business not found, commission skipped"
            );
            return Ok(RecordOutcome::Skipped(SkipReason::BusinessNotFound(
                business_id.to_string(),
            )));
        };

        // Fast path; the insert below is the real guard
        if self.store.find_commission_by_order(&order.id).await?.is_some() {
            tracing::debug!(order_id = %order.id, "Commission already recorded");
            return Ok(RecordOutcome::Duplicate);
        }

        let Some(plan) = self.catalog.plan_for_business(&business).await? else {
            let code = self.catalog.plan_code_for(&business);
            tracing::warn!(
                order_id = %order.id,
                business_id = %business_id,
                plan = %code,
                "Plan not found, commission skipped"
            );
            return Ok(RecordOutcome::Skipped(SkipReason::PlanNotFound(
                code.to_string(),
            )));
        };

        let now = now_millis();
        let payment_method = order.payment_method();
        let result = self
            .calculator
            .calculate_with_plan(
                business_id,
                Some(&plan),
                BillingPeriod::from_millis(now),
                order.total_amount,
                classify_channel(order, &business),
                payment_method,
            )
            .await?;

        let record = CommissionRecord::from_result(
            uuid::Uuid::new_v4().to_string(),
            &order.id,
            business_id,
            order.total_amount,
            payment_method,
            result,
            now,
        );

        if !self.store.insert_commission_if_absent(&record).await? {
            tracing::debug!(order_id = %order.id, "Commission recorded concurrently, skipping");
            return Ok(RecordOutcome::Duplicate);
        }

        if let Err(e) = self.apply_usage(&record).await {
            tracing::error!(
                target: LEDGER_TARGET,
                record_id = %record.id,
                order_id = %record.order_id,
                business_id = %record.business_id,
                period = %record.period,
                total_commission = %record.total_commission,
                error = %e,
                "Commission recorded but usage ledger not updated, needs reconciliation"
            );
            return Ok(RecordOutcome::LedgerIncomplete(Box::new(record)));
        }

        tracing::info!(
            target: LEDGER_TARGET,
            order_id = %record.order_id,
            business_id = %record.business_id,
            period = %record.period,
            courier_type = record.courier_type.as_str(),
            total_commission = %record.total_commission,
            collection_status = record.collection_status.as_str(),
            is_free_order = record.is_free_order,
            "Commission recorded"
        );
        Ok(RecordOutcome::Recorded(Box::new(record)))
    }

    /// Ledger updates for a freshly inserted record
    async fn apply_usage(&self, record: &CommissionRecord) -> ServiceResult<()> {
        self.store
            .record_order_usage(
                &record.business_id,
                record.period,
                record.total_commission,
                record.created_at,
            )
            .await?;

        let owed = record.owed_amount();
        if !owed.is_zero() {
            self.store
                .increment_account_balance(&record.business_id, owed)
                .await?;
        }
        Ok(())
    }
}
