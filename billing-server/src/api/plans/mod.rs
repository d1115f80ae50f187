//! Plan catalog API

mod handler;

use axum::{Router, routing::get};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/plans", get(handler::list).put(handler::upsert))
        .route("/api/plans/{code}", get(handler::get_by_code))
}
