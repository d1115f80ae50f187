//! Per-business billing API
//!
//! | Path | Method | Purpose |
//! |------|--------|---------|
//! | /api/businesses/{id} | PUT | create or update the billing profile |
//! | /api/businesses/{id}/limits/{limit_type} | GET | may one more action run? |
//! | /api/businesses/{id}/usage/{limit_type} | POST | count a successful action |
//! | /api/businesses/{id}/usage | GET | month counters and limits |
//! | /api/businesses/{id}/balance/clear | POST | operator settles the cash balance |
//! | /api/businesses/{id}/commission/quote | POST | price an order without recording it |
//! | /api/businesses/{id}/commissions | GET | commission ledger of a month |
//! | /api/businesses/{id}/invoices | GET | all stored invoices |
//! | /api/businesses/{id}/invoices/{period} | GET | stored invoice of a month |

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().nest("/api/businesses", routes())
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", put(handler::upsert))
        .route("/{id}/limits/{limit_type}", get(handler::check_limit))
        .route("/{id}/usage/{limit_type}", post(handler::increment_usage))
        .route("/{id}/usage", get(handler::usage_summary))
        .route("/{id}/balance/clear", post(handler::clear_balance))
        .route("/{id}/commission/quote", post(handler::quote_commission))
        .route("/{id}/commissions", get(handler::list_commissions))
        .route("/{id}/invoices", get(handler::list_invoices))
        .route("/{id}/invoices/{period}", get(handler::get_invoice))
}
