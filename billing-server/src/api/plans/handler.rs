//! Plan API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::error::{ApiResponse, AppError};
use shared::models::{Plan, PlanDocument};

use crate::api::ApiResult;
use crate::error::ServiceError;
use crate::state::AppState;

/// GET /api/plans
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Plan>> {
    let plans = state.catalog.list().await.map_err(ServiceError::from)?;
    Ok(ApiResponse::success(plans))
}

/// GET /api/plans/{code} (by id, then by code)
pub async fn get_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Plan> {
    let plan = state
        .catalog
        .resolve(&code)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| AppError::plan_not_found(&code))?;
    Ok(ApiResponse::success(plan))
}

/// PUT /api/plans (create or replace, drops the plan cache)
pub async fn upsert(
    State(state): State<AppState>,
    Json(doc): Json<PlanDocument>,
) -> ApiResult<Plan> {
    if doc.id.trim().is_empty() {
        return Err(AppError::validation("plan id must not be empty").with_detail("field", "id"));
    }
    let plan = state.catalog.upsert(doc).await.map_err(ServiceError::from)?;
    Ok(ApiResponse::success(plan))
}
