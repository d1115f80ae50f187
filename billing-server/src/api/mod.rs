//! HTTP interface
//!
//! | Prefix | Module |
//! |--------|--------|
//! | /health | [`health`] |
//! | /api/orders | [`orders`] (commission trigger) |
//! | /api/businesses | [`businesses`] (limits, usage, balance, ledger) |
//! | /api/invoices | [`invoices`] |
//! | /api/plans | [`plans`] |
//!
//! Authentication is handled in front of this service.

pub mod businesses;
pub mod health;
pub mod invoices;
pub mod orders;
pub mod plans;

use axum::Router;
use http::{HeaderName, HeaderValue};
use shared::error::{ApiResponse, AppError};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::state::AppState;

/// Handler result: `ApiResponse` envelope or an `AppError` body
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// All routes, no middleware
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(orders::router())
        .merge(businesses::router())
        .merge(invoices::router())
        .merge(plans::router())
}

/// Routes with middleware and state applied
pub fn build_app(state: AppState) -> Router {
    build_router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .with_state(state)
}
