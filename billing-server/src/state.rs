//! Application state shared by the HTTP handlers and background tasks

use std::sync::Arc;

use crate::billing::{
    CommissionCalculator, CommissionRecorder, InvoiceGenerator, InvoiceScheduler, LimitEnforcer,
    PlanCatalog,
};
use crate::core::{BillingSettings, Config};
use crate::db::{BillingStore, MemoryStore, PgStore};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub settings: BillingSettings,
    pub store: Arc<dyn BillingStore>,
    pub catalog: Arc<PlanCatalog>,
    pub limits: LimitEnforcer,
    pub calculator: CommissionCalculator,
    pub recorder: CommissionRecorder,
    pub invoices: InvoiceGenerator,
}

impl AppState {
    /// Wire the engine components over one store
    pub fn with_store(store: Arc<dyn BillingStore>, settings: &BillingSettings) -> Self {
        let catalog = Arc::new(PlanCatalog::new(store.clone(), settings.plan_cache_ttl));
        Self {
            settings: settings.clone(),
            limits: LimitEnforcer::new(store.clone(), catalog.clone()),
            calculator: CommissionCalculator::new(store.clone(), catalog.clone()),
            recorder: CommissionRecorder::new(store.clone(), catalog.clone()),
            invoices: InvoiceGenerator::new(store.clone(), catalog.clone()),
            catalog,
            store,
        }
    }

    /// PostgreSQL when `DATABASE_URL` is set, otherwise the in-memory store
    /// (only reachable in development, config rejects it elsewhere)
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let store: Arc<dyn BillingStore> = match &config.database_url {
            Some(url) => {
                let pg = PgStore::connect(url, config.database_max_connections).await?;
                tracing::info!("PostgreSQL store ready");
                Arc::new(pg)
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory store (data is not persisted)");
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::with_store(store, &config.billing))
    }

    pub fn invoice_scheduler(&self, config: &Config) -> Arc<InvoiceScheduler> {
        Arc::new(InvoiceScheduler::new(
            self.invoices.clone(),
            config.invoice_scheduler_interval,
            self.settings.invoice_concurrency,
        ))
    }
}
