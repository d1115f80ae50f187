//! Business API Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{
    BillingPeriod, Business, CommissionRecord, CommissionResult, CourierType, Invoice, LimitType,
    PaymentMethod,
};

use crate::api::ApiResult;
use crate::billing::{LimitCheck, Locale, UsageSummary};
use crate::error::ServiceError;
use crate::state::AppState;

fn parse_limit_type(raw: &str) -> Result<LimitType, AppError> {
    raw.parse()
}

/// `?period=YYYY-MM`, current month when absent
fn parse_period(raw: Option<&str>) -> Result<BillingPeriod, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.parse(),
        None => Ok(BillingPeriod::current()),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpsertBusinessRequest {
    pub name: Option<String>,
    pub business_type: Option<String>,
    pub subscription_plan: Option<String>,
    #[serde(default)]
    pub has_own_courier: bool,
}

/// PUT /api/businesses/{id}
///
/// Profile fields only; the account balance is kept as stored.
pub async fn upsert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpsertBusinessRequest>,
) -> ApiResult<Business> {
    if id.trim().is_empty() {
        return Err(AppError::validation("business id must not be empty"));
    }
    let profile = Business {
        id: id.clone(),
        name: req.name,
        business_type: req.business_type,
        subscription_plan: req.subscription_plan,
        has_own_courier: req.has_own_courier,
        ..Default::default()
    };
    state
        .store
        .upsert_business(&profile)
        .await
        .map_err(ServiceError::from)?;
    let business = state
        .store
        .find_business(&id)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| AppError::business_not_found(&id))?;
    tracing::info!(business_id = %id, plan = ?business.subscription_plan, "Business profile saved");
    Ok(ApiResponse::success(business))
}

#[derive(Debug, Deserialize)]
pub struct LocaleQuery {
    pub locale: Option<String>,
}

/// GET /api/businesses/{id}/limits/{limit_type}
pub async fn check_limit(
    State(state): State<AppState>,
    Path((id, limit_type)): Path<(String, String)>,
    Query(query): Query<LocaleQuery>,
) -> ApiResult<LimitCheck> {
    let limit_type = parse_limit_type(&limit_type)?;
    let locale = query
        .locale
        .as_deref()
        .map(Locale::from_tag)
        .unwrap_or_default();
    let check = state.limits.check_limit(&id, limit_type, locale).await?;
    Ok(ApiResponse::success(check))
}

#[derive(Debug, Default, Deserialize)]
pub struct IncrementRequest {
    pub amount: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct IncrementResponse {
    pub business_id: String,
    pub limit_type: LimitType,
    pub amount: u64,
}

/// POST /api/businesses/{id}/usage/{limit_type}
///
/// Body is optional, `amount` defaults to 1.
pub async fn increment_usage(
    State(state): State<AppState>,
    Path((id, limit_type)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<IncrementResponse> {
    let limit_type = parse_limit_type(&limit_type)?;
    let req: IncrementRequest = if body.is_empty() {
        IncrementRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::invalid_request(format!("Invalid body: {e}")))?
    };
    let amount = req.amount.unwrap_or(1);
    state.limits.increment_usage(&id, limit_type, amount).await?;
    Ok(ApiResponse::success(IncrementResponse {
        business_id: id,
        limit_type,
        amount,
    }))
}

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub period: Option<String>,
}

/// GET /api/businesses/{id}/usage
pub async fn usage_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<UsageSummary> {
    let period = parse_period(query.period.as_deref())?;
    let summary = state.limits.usage_summary(&id, period).await?;
    Ok(ApiResponse::success(summary))
}

#[derive(Debug, Serialize)]
pub struct ClearBalanceResponse {
    pub business_id: String,
    pub cleared: Decimal,
}

/// POST /api/businesses/{id}/balance/clear
pub async fn clear_balance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ClearBalanceResponse> {
    let cleared = state
        .store
        .clear_account_balance(&id)
        .await
        .map_err(ServiceError::from)?;
    tracing::info!(
        target: crate::common::logger::LEDGER_TARGET,
        business_id = %id,
        cleared = %cleared,
        "Account balance cleared"
    );
    Ok(ApiResponse::success(ClearBalanceResponse {
        business_id: id,
        cleared,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CommissionQuoteRequest {
    pub order_total: Decimal,
    pub courier_type: CourierType,
    /// Cash when absent
    pub payment_method: Option<PaymentMethod>,
}

/// POST /api/businesses/{id}/commission/quote
///
/// Prices an order without recording it. Unknown businesses and plans
/// are quoted at the fallback rate.
pub async fn quote_commission(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CommissionQuoteRequest>,
) -> ApiResult<CommissionResult> {
    if req.order_total.is_sign_negative() {
        return Err(AppError::validation("order_total must not be negative")
            .with_detail("order_total", req.order_total.to_string()));
    }
    let result = state
        .calculator
        .calculate_commission(
            &id,
            req.order_total,
            req.courier_type,
            req.payment_method.unwrap_or(PaymentMethod::Cash),
        )
        .await?;
    Ok(ApiResponse::success(result))
}

/// GET /api/businesses/{id}/commissions
pub async fn list_commissions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PeriodQuery>,
) -> ApiResult<Vec<CommissionRecord>> {
    let period = parse_period(query.period.as_deref())?;
    let records = state
        .store
        .list_commissions(&id, period)
        .await
        .map_err(ServiceError::from)?;
    Ok(ApiResponse::success(records))
}

/// GET /api/businesses/{id}/invoices
pub async fn list_invoices(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Invoice>> {
    let invoices = state
        .store
        .list_invoices(&id)
        .await
        .map_err(ServiceError::from)?;
    Ok(ApiResponse::success(invoices))
}

/// GET /api/businesses/{id}/invoices/{period}
pub async fn get_invoice(
    State(state): State<AppState>,
    Path((id, period)): Path<(String, String)>,
) -> ApiResult<Invoice> {
    let period: BillingPeriod = period.parse()?;
    let invoice = state
        .invoices
        .find_invoice(&id, period)
        .await?
        .ok_or_else(|| {
            AppError::new(ErrorCode::InvoiceNotFound)
                .with_detail("business_id", id.as_str())
                .with_detail("period", period.key())
        })?;
    Ok(ApiResponse::success(invoice))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_period_defaults_to_current_month() {
        assert_eq!(parse_period(None).unwrap(), BillingPeriod::current());
        assert_eq!(parse_period(Some(" ")).unwrap(), BillingPeriod::current());
        assert_eq!(parse_period(Some("2025-04")).unwrap().to_string(), "2025-04");
        let err = parse_period(Some("2025-4")).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidBillingPeriod);
    }

    #[test]
    fn test_parse_limit_type_rejects_unknown() {
        let err = parse_limit_type("sms").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidLimitType);
    }
}
