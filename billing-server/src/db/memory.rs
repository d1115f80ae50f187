//! In-process store
//!
//! Every counter lives in its own `DashMap` entry and is mutated while the
//! entry's shard lock is held, so concurrent increments never lose updates.
//! The plan catalog is read-heavy and sits behind a `parking_lot::RwLock`.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use shared::models::{
    BillingPeriod, Business, CommissionRecord, Invoice, LimitType, MonthUsage, PlanDocument,
};
use std::collections::BTreeMap;

use super::{BillingStore, RepoError, RepoResult};

type UsageKey = (String, BillingPeriod);

#[derive(Default)]
pub struct MemoryStore {
    plans: RwLock<BTreeMap<String, PlanDocument>>,
    businesses: DashMap<String, Business>,
    usage: DashMap<UsageKey, MonthUsage>,
    /// Keyed by `order_id`
    commissions: DashMap<String, CommissionRecord>,
    invoices: DashMap<UsageKey, Invoice>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_business(&self, business_id: &str) -> RepoResult<()> {
        if self.businesses.contains_key(business_id) {
            Ok(())
        } else {
            Err(RepoError::NotFound(format!("business {business_id}")))
        }
    }
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn find_plan_by_id(&self, id: &str) -> RepoResult<Option<PlanDocument>> {
        Ok(self.plans.read().get(id).cloned())
    }

    async fn find_plan_by_code(&self, code: &str) -> RepoResult<Option<PlanDocument>> {
        Ok(self
            .plans
            .read()
            .values()
            .find(|p| p.code.as_deref() == Some(code))
            .cloned())
    }

    async fn list_plans(&self) -> RepoResult<Vec<PlanDocument>> {
        Ok(self.plans.read().values().cloned().collect())
    }

    async fn upsert_plan(&self, plan: &PlanDocument) -> RepoResult<()> {
        self.plans.write().insert(plan.id.clone(), plan.clone());
        Ok(())
    }

    async fn insert_plan_if_absent(&self, plan: &PlanDocument) -> RepoResult<bool> {
        let mut plans = self.plans.write();
        if plans.contains_key(&plan.id) {
            return Ok(false);
        }
        plans.insert(plan.id.clone(), plan.clone());
        Ok(true)
    }

    async fn find_business(&self, id: &str) -> RepoResult<Option<Business>> {
        Ok(self.businesses.get(id).map(|b| b.value().clone()))
    }

    async fn upsert_business(&self, business: &Business) -> RepoResult<()> {
        match self.businesses.entry(business.id.clone()) {
            Entry::Occupied(mut existing) => {
                let current = existing.get_mut();
                current.name = business.name.clone();
                current.business_type = business.business_type.clone();
                current.subscription_plan = business.subscription_plan.clone();
                current.has_own_courier = business.has_own_courier;
            }
            Entry::Vacant(slot) => {
                slot.insert(business.clone());
            }
        }
        Ok(())
    }

    async fn list_business_ids(&self) -> RepoResult<Vec<String>> {
        let mut ids: Vec<String> = self.businesses.iter().map(|b| b.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }

    async fn month_usage(
        &self,
        business_id: &str,
        period: BillingPeriod,
    ) -> RepoResult<MonthUsage> {
        Ok(self
            .usage
            .get(&(business_id.to_string(), period))
            .map(|u| u.value().clone())
            .unwrap_or_default())
    }

    async fn increment_usage(
        &self,
        business_id: &str,
        period: BillingPeriod,
        limit_type: LimitType,
        amount: u64,
    ) -> RepoResult<()> {
        self.ensure_business(business_id)?;
        let mut usage = self
            .usage
            .entry((business_id.to_string(), period))
            .or_default();
        *usage.counter_mut(limit_type) += amount;
        Ok(())
    }

    async fn record_order_usage(
        &self,
        business_id: &str,
        period: BillingPeriod,
        commission: Decimal,
        at: i64,
    ) -> RepoResult<()> {
        {
            let mut business = self
                .businesses
                .get_mut(business_id)
                .ok_or_else(|| RepoError::NotFound(format!("business {business_id}")))?;
            business.last_order_at = Some(at);
        }
        let mut usage = self
            .usage
            .entry((business_id.to_string(), period))
            .or_default();
        usage.orders += 1;
        usage.total_commission += commission;
        Ok(())
    }

    async fn increment_account_balance(
        &self,
        business_id: &str,
        amount: Decimal,
    ) -> RepoResult<()> {
        let mut business = self
            .businesses
            .get_mut(business_id)
            .ok_or_else(|| RepoError::NotFound(format!("business {business_id}")))?;
        business.account_balance += amount;
        Ok(())
    }

    async fn clear_account_balance(&self, business_id: &str) -> RepoResult<Decimal> {
        let mut business = self
            .businesses
            .get_mut(business_id)
            .ok_or_else(|| RepoError::NotFound(format!("business {business_id}")))?;
        Ok(std::mem::take(&mut business.account_balance))
    }

    async fn insert_commission_if_absent(&self, record: &CommissionRecord) -> RepoResult<bool> {
        match self.commissions.entry(record.order_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
        }
    }

    async fn find_commission_by_order(
        &self,
        order_id: &str,
    ) -> RepoResult<Option<CommissionRecord>> {
        Ok(self.commissions.get(order_id).map(|r| r.value().clone()))
    }

    async fn list_commissions(
        &self,
        business_id: &str,
        period: BillingPeriod,
    ) -> RepoResult<Vec<CommissionRecord>> {
        let mut records: Vec<CommissionRecord> = self
            .commissions
            .iter()
            .filter(|r| r.business_id == business_id && r.period == period)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn find_invoice(
        &self,
        business_id: &str,
        period: BillingPeriod,
    ) -> RepoResult<Option<Invoice>> {
        Ok(self
            .invoices
            .get(&(business_id.to_string(), period))
            .map(|i| i.value().clone()))
    }

    async fn save_invoice(&self, invoice: &Invoice) -> RepoResult<()> {
        self.invoices.insert(
            (invoice.business_id.clone(), invoice.period),
            invoice.clone(),
        );
        Ok(())
    }

    async fn list_invoices(&self, business_id: &str) -> RepoResult<Vec<Invoice>> {
        let mut invoices: Vec<Invoice> = self
            .invoices
            .iter()
            .filter(|i| i.business_id == business_id)
            .map(|i| i.value().clone())
            .collect();
        invoices.sort_by_key(|i| i.period);
        Ok(invoices)
    }
}
