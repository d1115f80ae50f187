//! Order lifecycle trigger

mod handler;

use axum::{Router, routing::post};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/orders/status-changed", post(handler::status_changed))
}
