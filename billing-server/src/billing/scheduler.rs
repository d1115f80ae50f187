//! Monthly invoicing scheduler
//!
//! Wakes up on a fixed interval and invoices the previous calendar month
//! once per process. Regeneration is safe (drafts are replaced, issued
//! invoices are kept), so a restart simply runs the batch again.

use parking_lot::Mutex;
use shared::models::BillingPeriod;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::invoice::{BatchReport, InvoiceGenerator};

pub struct InvoiceScheduler {
    generator: InvoiceGenerator,
    interval: Duration,
    concurrency: usize,
    last_period: Mutex<Option<BillingPeriod>>,
}

impl InvoiceScheduler {
    pub fn new(generator: InvoiceGenerator, interval: Duration, concurrency: usize) -> Self {
        Self {
            generator,
            interval,
            concurrency,
            last_period: Mutex::new(None),
        }
    }

    /// Run forever in a background task
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(interval_secs = self.interval.as_secs(), "Invoice scheduler started");
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                ticker.tick().await;
                self.tick(BillingPeriod::current()).await;
            }
        })
    }

    /// Invoice the month before `now` unless already done.
    /// Returns the batch report when a batch ran.
    pub async fn tick(&self, now: BillingPeriod) -> Option<BatchReport> {
        let target = now.previous();
        if *self.last_period.lock() == Some(target) {
            return None;
        }

        match self
            .generator
            .run_monthly_invoicing(target, self.concurrency)
            .await
        {
            Ok(report) => {
                *self.last_period.lock() = Some(target);
                Some(report)
            }
            Err(e) => {
                // retried on the next tick
                tracing::error!(period = %target, error = %e, "Monthly invoicing failed");
                None
            }
        }
    }
}
