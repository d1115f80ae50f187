//! Invoice generation API

mod handler;

use axum::{Router, routing::post};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/invoices/generate", post(handler::generate))
        .route("/api/invoices/run", post(handler::run))
}
