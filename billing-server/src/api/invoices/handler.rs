//! Invoice API Handlers

use axum::{Json, extract::State};
use serde::Deserialize;
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{BillingPeriod, Invoice};

use crate::api::ApiResult;
use crate::billing::BatchReport;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub business_id: String,
    pub year: i32,
    pub month: u32,
}

/// POST /api/invoices/generate
///
/// 404 when no invoice is owed (unknown business or plan).
pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<Invoice> {
    let invoice = state
        .invoices
        .generate_monthly_invoice(&req.business_id, req.year, req.month)
        .await?
        .ok_or_else(|| {
            AppError::with_message(ErrorCode::InvoiceNotFound, "No invoice owed")
                .with_detail("business_id", req.business_id.as_str())
        })?;
    Ok(ApiResponse::success(invoice))
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub year: i32,
    pub month: u32,
}

/// POST /api/invoices/run
pub async fn run(
    State(state): State<AppState>,
    Json(req): Json<RunRequest>,
) -> ApiResult<BatchReport> {
    let period = BillingPeriod::new(req.year, req.month)?;
    let report = state
        .invoices
        .run_monthly_invoicing(period, state.settings.invoice_concurrency)
        .await?;
    Ok(ApiResponse::success(report))
}
