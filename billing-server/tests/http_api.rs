//! HTTP surface, driven in-process with `oneshot`

use axum::Router;
use axum::body::Body;
use billing_server::billing::seed_default_plans;
use billing_server::db::MemoryStore;
use billing_server::{AppState, BillingSettings, api};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use shared::models::BillingPeriod;
use std::sync::Arc;
use tower::ServiceExt;

async fn app() -> Router {
    let store = Arc::new(MemoryStore::new());
    seed_default_plans(store.as_ref()).await.unwrap();
    api::build_app(AppState::with_store(store, &BillingSettings::default()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn status_change(order_id: &str, before: &str, after: &str) -> Value {
    let order = |status: &str| {
        json!({
            "id": order_id,
            "butcherId": "b1",
            "totalAmount": 50,
            "paymentMethod": "cash",
            "orderType": "delivery",
            "status": status,
        })
    };
    json!({ "before": order(before), "after": order(after) })
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "billing-server");
}

#[tokio::test]
async fn order_trigger_to_invoice() {
    let app = app().await;
    let period = BillingPeriod::current();

    let (status, body) = send(
        &app,
        "PUT",
        "/api/businesses/b1",
        Some(json!({ "name": "Metzgerei", "subscription_plan": "free" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["subscription_plan"], "free");

    let (status, body) = send(
        &app,
        "POST",
        "/api/orders/status-changed",
        Some(status_change("o-1", "onTheWay", "delivered")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "recorded");
    assert_eq!(body["data"]["data"]["courier_type"], "lokma_courier");
    assert_eq!(body["data"]["data"]["total_commission"].as_f64(), Some(3.5));

    // replay
    let (status, body) = send(
        &app,
        "POST",
        "/api/orders/status-changed",
        Some(status_change("o-1", "onTheWay", "delivered")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "duplicate");

    let (status, body) = send(&app, "GET", "/api/businesses/b1/limits/orders?locale=en", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["allowed"], true);
    assert_eq!(body["data"]["current_usage"], 1);
    assert_eq!(body["data"]["limit"], 30);
    assert_eq!(body["data"]["remaining"], 29);

    let (status, body) = send(
        &app,
        "POST",
        "/api/invoices/generate",
        Some(json!({ "business_id": "b1", "year": period.year(), "month": period.month() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // 3.50 + round2(0.665)
    assert_eq!(body["data"]["total"].as_f64(), Some(4.17));
    assert_eq!(body["data"]["line_items"][0]["type"], "commission");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/businesses/b1/invoices/{period}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "draft");

    let (status, body) = send(&app, "POST", "/api/businesses/b1/balance/clear", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cleared"].as_f64(), Some(3.5));
    let (_, body) = send(&app, "POST", "/api/businesses/b1/balance/clear", None).await;
    assert_eq!(body["data"]["cleared"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn trigger_for_unknown_business_still_answers_ok() {
    let app = app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/orders/status-changed",
        Some(status_change("o-9", "ready", "completed")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "skipped");
    assert_eq!(body["data"]["data"]["reason"], "business_not_found");
}

#[tokio::test]
async fn no_invoice_owed_is_not_found() {
    let app = app().await;
    let (status, _) = send(
        &app,
        "POST",
        "/api/invoices/generate",
        Some(json!({ "business_id": "nobody", "year": 2025, "month": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/api/invoices/generate",
        Some(json!({ "business_id": "nobody", "year": 2025, "month": 13 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn usage_endpoints_validate_input() {
    let app = app().await;
    send(
        &app,
        "PUT",
        "/api/businesses/b1",
        Some(json!({ "subscription_plan": "basic" })),
    )
    .await;

    let (status, body) = send(&app, "GET", "/api/businesses/b1/limits/sms", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 3002);

    let (status, _) = send(
        &app,
        "POST",
        "/api/businesses/b1/usage/push",
        Some(json!({ "amount": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/api/businesses/b1/usage/push", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["amount"], 1);

    let (status, body) = send(&app, "GET", "/api/businesses/b1/usage", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["usage"]["push"], 1);
    assert_eq!(body["data"]["plan_id"], "basic");

    let (status, _) = send(&app, "GET", "/api/businesses/b1/usage?period=2025-3", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "GET", "/api/businesses/ghost/usage", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 1001);
}

#[tokio::test]
async fn plans_are_listed_and_resolved_by_code() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/api/plans", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(4));

    let (status, _) = send(
        &app,
        "PUT",
        "/api/plans",
        Some(json!({ "id": "basic-2026", "code": "starter", "monthly_fee": 19 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/api/plans/starter", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "basic-2026");
    assert_eq!(body["data"]["commission_lokma_courier"].as_f64(), Some(7.0));

    let (status, _) = send(&app, "GET", "/api/plans/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn commission_quote_records_nothing() {
    let app = app().await;
    send(
        &app,
        "PUT",
        "/api/businesses/b1",
        Some(json!({ "subscription_plan": "free", "has_own_courier": true })),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/businesses/b1/commission/quote",
        Some(json!({ "order_total": 80, "courier_type": "own_courier", "payment_method": "card" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["plan_id"], "free");
    assert_eq!(body["data"]["total_commission"].as_f64(), Some(3.2));
    assert_eq!(body["data"]["net_commission"].as_f64(), Some(2.69));
    assert_eq!(body["data"]["collection_status"], "auto_collected");

    // unknown business: fallback rate, cash by default
    let (status, body) = send(
        &app,
        "POST",
        "/api/businesses/ghost/commission/quote",
        Some(json!({ "order_total": 100, "courier_type": "lokma_courier" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["plan_id"].is_null());
    assert_eq!(body["data"]["total_commission"].as_f64(), Some(5.0));
    assert_eq!(body["data"]["collection_status"], "pending");

    let (status, body) = send(
        &app,
        "POST",
        "/api/businesses/b1/commission/quote",
        Some(json!({ "order_total": -1, "courier_type": "click_collect" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 2);

    let (_, body) = send(&app, "GET", "/api/businesses/b1/usage", None).await;
    assert_eq!(body["data"]["usage"]["orders"], 0);
}
