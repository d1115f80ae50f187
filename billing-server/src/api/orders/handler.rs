//! Order trigger handler

use axum::{Json, extract::State};
use shared::error::ApiResponse;
use shared::models::OrderStatusChange;

use crate::billing::RecordOutcome;
use crate::state::AppState;

/// POST /api/orders/status-changed
///
/// Always answers 200: billing outcomes (including failures) are reported in
/// the body and never fail the order update that fired the trigger.
pub async fn status_changed(
    State(state): State<AppState>,
    Json(change): Json<OrderStatusChange>,
) -> ApiResponse<RecordOutcome> {
    let outcome = state.recorder.on_order_status_changed(&change).await;
    ApiResponse::success(outcome)
}
