//! Plan Catalog
//!
//! Two-step resolution of a plan code: primary key first, then the `code`
//! field. Stored documents are merged with [`PlanDefaults`] on load, so every
//! consumer sees the same resolved values. Resolved plans are cached
//! in-process for a short TTL (plans are read on every order).

use parking_lot::RwLock;
use rust_decimal_macros::dec;
use shared::models::{Business, OverageAction, PerOrderFeeType, Plan, PlanDefaults, PlanDocument};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::db::{BillingStore, RepoResult};

struct CacheEntry {
    plan: Plan,
    expires_at: Instant,
}

pub struct PlanCatalog {
    store: Arc<dyn BillingStore>,
    defaults: PlanDefaults,
    ttl: Duration,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl PlanCatalog {
    pub fn new(store: Arc<dyn BillingStore>, ttl: Duration) -> Self {
        Self {
            store,
            defaults: PlanDefaults::STANDARD,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn defaults(&self) -> &PlanDefaults {
        &self.defaults
    }

    /// Resolve a plan code: lookup by id, then by `code` field
    pub async fn resolve(&self, code: &str) -> RepoResult<Option<Plan>> {
        if let Some(plan) = self.cached(code) {
            return Ok(Some(plan));
        }

        let doc = match self.store.find_plan_by_id(code).await? {
            Some(doc) => Some(doc),
            None => self.store.find_plan_by_code(code).await?,
        };
        let Some(doc) = doc else {
            tracing::debug!(plan = %code, "Plan not found by id or code");
            return Ok(None);
        };

        let plan = self.defaults.resolve(doc);
        if !self.ttl.is_zero() {
            self.cache.write().insert(
                code.to_string(),
                CacheEntry {
                    plan: plan.clone(),
                    expires_at: Instant::now() + self.ttl,
                },
            );
        }
        Ok(Some(plan))
    }

    /// Plan code a business is billed under (`subscription_plan`, else the default)
    pub fn plan_code_for<'a>(&self, business: &'a Business) -> &'a str {
        business
            .subscription_plan
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(self.defaults.plan_code)
    }

    pub async fn plan_for_business(&self, business: &Business) -> RepoResult<Option<Plan>> {
        self.resolve(self.plan_code_for(business)).await
    }

    pub async fn list(&self) -> RepoResult<Vec<Plan>> {
        let docs = self.store.list_plans().await?;
        Ok(docs
            .into_iter()
            .map(|doc| self.defaults.resolve(doc))
            .collect())
    }

    /// Create or replace a plan document, then drop the cache
    pub async fn upsert(&self, doc: PlanDocument) -> RepoResult<Plan> {
        self.store.upsert_plan(&doc).await?;
        self.invalidate();
        tracing::info!(plan_id = %doc.id, "Plan saved");
        Ok(self.defaults.resolve(doc))
    }

    pub fn invalidate(&self) {
        self.cache.write().clear();
    }

    fn cached(&self, code: &str) -> Option<Plan> {
        let cache = self.cache.read();
        cache
            .get(code)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.plan.clone())
    }
}

/// Default catalog: free, basic, premium, ultra
pub fn default_plans() -> Vec<PlanDocument> {
    vec![
        PlanDocument {
            id: "free".into(),
            code: Some("free".into()),
            name: Some("Free".into()),
            monthly_fee: Some(dec!(0)),
            yearly_fee: Some(dec!(0)),
            commission_click_collect: Some(dec!(5)),
            commission_own_courier: Some(dec!(4)),
            commission_lokma_courier: Some(dec!(7)),
            free_order_count: Some(0),
            order_limit: Some(30),
            order_overage_action: Some(OverageAction::Block),
            campaign_limit: Some(0),
            table_reservation_limit: Some(0),
            per_order_fee_type: Some(PerOrderFeeType::None),
            is_active: Some(true),
            ..Default::default()
        },
        PlanDocument {
            id: "basic".into(),
            code: Some("basic".into()),
            name: Some("Basic".into()),
            monthly_fee: Some(dec!(29)),
            yearly_fee: Some(dec!(290)),
            commission_click_collect: Some(dec!(5)),
            commission_own_courier: Some(dec!(4)),
            commission_lokma_courier: Some(dec!(7)),
            free_order_count: Some(10),
            order_limit: Some(200),
            order_overage_action: Some(OverageAction::OverageFee),
            order_overage_fee: Some(dec!(0.50)),
            campaign_limit: Some(4),
            table_reservation_limit: Some(50),
            table_reservation_overage_fee: Some(dec!(0.30)),
            per_order_fee_type: Some(PerOrderFeeType::None),
            is_active: Some(true),
            ..Default::default()
        },
        PlanDocument {
            id: "premium".into(),
            code: Some("premium".into()),
            name: Some("Premium".into()),
            monthly_fee: Some(dec!(59)),
            yearly_fee: Some(dec!(590)),
            commission_click_collect: Some(dec!(4)),
            commission_own_courier: Some(dec!(3)),
            commission_lokma_courier: Some(dec!(6)),
            free_order_count: Some(25),
            order_limit: Some(1000),
            order_overage_action: Some(OverageAction::OverageFee),
            order_overage_fee: Some(dec!(0.30)),
            campaign_limit: Some(12),
            table_reservation_limit: Some(200),
            table_reservation_overage_fee: Some(dec!(0.20)),
            per_order_fee_type: Some(PerOrderFeeType::Fixed),
            per_order_fee_amount: Some(dec!(0.25)),
            is_active: Some(true),
            ..Default::default()
        },
        PlanDocument {
            id: "ultra".into(),
            code: Some("ultra".into()),
            name: Some("Ultra".into()),
            monthly_fee: Some(dec!(99)),
            yearly_fee: Some(dec!(990)),
            commission_click_collect: Some(dec!(3)),
            commission_own_courier: Some(dec!(2.5)),
            commission_lokma_courier: Some(dec!(5)),
            free_order_count: Some(50),
            order_limit: None,
            order_overage_action: Some(OverageAction::None),
            campaign_limit: None,
            table_reservation_limit: None,
            per_order_fee_type: Some(PerOrderFeeType::Percentage),
            per_order_fee_amount: Some(dec!(0.5)),
            is_active: Some(true),
            ..Default::default()
        },
    ]
}

/// Insert the default catalog, never overwriting existing plans.
/// Returns the number of plans inserted.
pub async fn seed_default_plans(store: &dyn BillingStore) -> RepoResult<usize> {
    let mut inserted = 0;
    for plan in default_plans() {
        if store.insert_plan_if_absent(&plan).await? {
            tracing::info!(plan_id = %plan.id, "Seeded default plan");
            inserted += 1;
        }
    }
    Ok(inserted)
}
