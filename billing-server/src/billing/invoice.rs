//! Invoice Generator
//!
//! One draft invoice per business per calendar month, built from the
//! usage ledger and the business's plan. Line items, in order:
//!
//! 1. subscription fee (if `monthly_fee > 0`)
//! 2. aggregated commission (if `total_commission > 0` and orders > 0)
//! 3. order overage (if `order_limit` is set and exceeded)
//! 4. table reservation overage (same rule)
//!
//! `tax = round2(subtotal × 19%)`, `total = round2(subtotal + tax)`.

use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{
    BillingPeriod, Invoice, InvoiceLineItem, InvoiceStatus, LineItemType, MonthUsage, Plan,
};
use shared::util::{VAT_RATE, now_millis, percent_of, round2};
use std::sync::Arc;

use super::plans::PlanCatalog;
use crate::common::logger::LEDGER_TARGET;
use crate::db::BillingStore;
use crate::error::ServiceResult;

/// Billable line items for one month, in fixed order
pub fn build_line_items(plan: &Plan, usage: &MonthUsage) -> Vec<InvoiceLineItem> {
    let mut items = Vec::new();

    if plan.monthly_fee > Decimal::ZERO {
        items.push(InvoiceLineItem {
            description: format!("Monthly subscription ({})", plan.name),
            quantity: 1,
            unit_price: plan.monthly_fee,
            total: plan.monthly_fee,
            item_type: LineItemType::Subscription,
        });
    }

    // zero orders with a nonzero commission sum would divide by zero
    if usage.total_commission > Decimal::ZERO && usage.orders > 0 {
        let total = round2(usage.total_commission);
        items.push(InvoiceLineItem {
            description: format!("Commission ({} orders)", usage.orders),
            quantity: usage.orders,
            unit_price: round2(total / Decimal::from(usage.orders)),
            total,
            item_type: LineItemType::Commission,
        });
    }

    if let Some(item) = overage_item(
        "Order overage",
        plan.order_limit,
        usage.orders,
        plan.order_overage_fee,
    ) {
        items.push(item);
    }

    if let Some(item) = overage_item(
        "Table reservation overage",
        plan.table_reservation_limit,
        usage.table_reservations,
        plan.table_reservation_overage_fee,
    ) {
        items.push(item);
    }

    items
}

fn overage_item(
    label: &str,
    limit: Option<u32>,
    used: u64,
    fee: Decimal,
) -> Option<InvoiceLineItem> {
    let limit = u64::from(limit?);
    let excess = used.checked_sub(limit).filter(|&e| e > 0)?;
    let total = round2(Decimal::from(excess) * fee);
    (total > Decimal::ZERO).then(|| InvoiceLineItem {
        description: format!("{label} ({excess} over limit of {limit})"),
        quantity: excess,
        unit_price: fee,
        total,
        item_type: LineItemType::Overage,
    })
}

/// Assemble a draft invoice (pure)
pub fn build_invoice(
    id: String,
    business_id: &str,
    plan: &Plan,
    period: BillingPeriod,
    usage: &MonthUsage,
    created_at: i64,
) -> Invoice {
    let line_items = build_line_items(plan, usage);
    let subtotal: Decimal = line_items.iter().map(|item| item.total).sum();
    let tax = percent_of(subtotal, VAT_RATE);
    let total = round2(subtotal + tax);

    Invoice {
        id,
        invoice_number: Invoice::number_for(business_id, &period),
        business_id: business_id.to_string(),
        plan_id: plan.id.clone(),
        period,
        period_start: period.first_day(),
        period_end: period.last_day(),
        line_items,
        subtotal,
        tax_rate: VAT_RATE,
        tax,
        total,
        currency: plan.currency.clone(),
        status: InvoiceStatus::Draft,
        due_date: period.due_date(),
        created_at,
    }
}

/// Monthly batch result
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchReport {
    pub period: Option<BillingPeriod>,
    pub generated: usize,
    /// No invoice owed (business or plan missing)
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct InvoiceGenerator {
    store: Arc<dyn BillingStore>,
    catalog: Arc<PlanCatalog>,
}

impl InvoiceGenerator {
    pub fn new(store: Arc<dyn BillingStore>, catalog: Arc<PlanCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Generate (or regenerate) the draft invoice of one business for one month.
    ///
    /// `Ok(None)` means no invoice is owed (unknown business or plan).
    /// An invoice that already left `draft` is returned unchanged.
    pub async fn generate_monthly_invoice(
        &self,
        business_id: &str,
        year: i32,
        month: u32,
    ) -> ServiceResult<Option<Invoice>> {
        let period = BillingPeriod::new(year, month)?;
        self.generate_for_period(business_id, period).await
    }

    pub async fn generate_for_period(
        &self,
        business_id: &str,
        period: BillingPeriod,
    ) -> ServiceResult<Option<Invoice>> {
        let Some(business) = self.store.find_business(business_id).await? else {
            tracing::warn!(business_id = %business_id, period = %period, "Business not found, no invoice");
            return Ok(None);
        };
        let Some(plan) = self.catalog.plan_for_business(&business).await? else {
            tracing::warn!(
                business_id = %business_id,
                period = %period,
                plan = ?business.subscription_plan,
                "Plan not found, no invoice"
            );
            return Ok(None);
        };

        let existing = self.store.find_invoice(business_id, period).await?;
        if let Some(invoice) = existing
            .as_ref()
            .filter(|invoice| invoice.status != InvoiceStatus::Draft)
        {
            tracing::debug!(
                business_id = %business_id,
                period = %period,
                status = invoice.status.as_str(),
                "Invoice already issued, not regenerated"
            );
            return Ok(Some(invoice.clone()));
        }

        let usage = self.store.month_usage(business_id, period).await?;
        let id = existing
            .map(|draft| draft.id)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let invoice = build_invoice(id, business_id, &plan, period, &usage, now_millis());
        self.store.save_invoice(&invoice).await?;

        tracing::info!(
            target: LEDGER_TARGET,
            business_id = %business_id,
            period = %period,
            invoice_number = %invoice.invoice_number,
            line_items = invoice.line_items.len(),
            total = %invoice.total,
            "Invoice generated"
        );
        Ok(Some(invoice))
    }

    pub async fn find_invoice(
        &self,
        business_id: &str,
        period: BillingPeriod,
    ) -> ServiceResult<Option<Invoice>> {
        Ok(self.store.find_invoice(business_id, period).await?)
    }

    /// Invoice every business for `period`, `concurrency` at a time
    pub async fn run_monthly_invoicing(
        &self,
        period: BillingPeriod,
        concurrency: usize,
    ) -> ServiceResult<BatchReport> {
        let business_ids = self.store.list_business_ids().await?;
        tracing::info!(period = %period, businesses = business_ids.len(), "Monthly invoicing started");

        let outcomes: Vec<_> = stream::iter(business_ids)
            .map(|business_id| async move {
                let outcome = self.generate_for_period(&business_id, period).await;
                (business_id, outcome)
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut report = BatchReport {
            period: Some(period),
            ..Default::default()
        };
        for (business_id, outcome) in outcomes {
            match outcome {
                Ok(Some(_)) => report.generated += 1,
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    tracing::error!(business_id = %business_id, period = %period, error = %e, "Invoice generation failed");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            period = %period,
            generated = report.generated,
            skipped = report.skipped,
            failed = report.failed,
            "Monthly invoicing finished"
        );
        Ok(report)
    }
}
