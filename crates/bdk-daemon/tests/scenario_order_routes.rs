//! In-process scenario tests for the order creation endpoints.
//!
//! These tests spin up the Axum router **without** binding a TCP socket:
//! each test composes `routes::build_router` over the in-memory testkit
//! store and drives it via `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use bdk_daemon::{routes, state};
use bdk_testkit::MemStore;
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fresh store with the default status catalog and two products.
fn seeded_store() -> Arc<MemStore> {
    let store = MemStore::with_default_statuses();
    store.insert_product(1, "mole poblano jar", 5000, 10, true);
    store.insert_product(2, "tortilla press", 30000, 3, true);
    Arc::new(store)
}

fn make_router(store: Arc<MemStore>) -> axum::Router {
    routes::build_router(state::AppState::new(store))
}

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

// ---------------------------------------------------------------------------
// GET /v1/health  GET /v1/status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let (status, body) = call(make_router(seeded_store()), get("/v1/health")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "bdk-daemon");
}

#[tokio::test]
async fn status_reports_store_reachable() {
    let (status, body) = call(make_router(seeded_store()), get("/v1/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["store_ok"], true);
}

// ---------------------------------------------------------------------------
// POST /v1/orders — happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_order_returns_201_with_receipt() {
    let store = seeded_store();

    let req = post_json(
        "/v1/orders",
        json!({
            "status_code": 1,
            "items": [
                {"product_id": 1, "qty": 2, "price_cents": 5000},
                {"product_id": 2, "qty": 1, "price_cents": 30000}
            ],
            "delivery_cents": 800,
            "observation": "phoned in"
        }),
    );
    let (status, body) = call(make_router(Arc::clone(&store)), req).await;
    assert_eq!(status, StatusCode::CREATED);

    let json = parse_json(body);
    assert_eq!(json["order_id"], 1);
    assert_eq!(json["detail_count"], 2);
    assert_eq!(json["activity_id"], 1);

    // Projection reflects recomputed totals and the initial activity row.
    let (status, body) = call(make_router(store), get("/v1/orders/1")).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["order"]["qty_total"], 3);
    assert_eq!(json["order"]["subtotal_cents"], 40000);
    assert_eq!(json["order"]["total_cents"], 40800);
    assert_eq!(json["lines"].as_array().unwrap().len(), 2);
    assert_eq!(json["activity"].as_array().unwrap().len(), 1);
    assert_eq!(json["activity"][0]["status_code"], 1);
}

#[tokio::test]
async fn create_order_ignores_client_supplied_totals() {
    let store = seeded_store();

    // The wire format has no "total" field at all; whatever subtotal the
    // client believed in, the server recomputes from qty × price.
    let req = post_json(
        "/v1/orders",
        json!({
            "status_code": 1,
            "items": [{"product_id": 1, "qty": 4, "price_cents": 5000}],
            "tax_cents": 3200
        }),
    );
    let (status, _) = call(make_router(Arc::clone(&store)), req).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = call(make_router(store), get("/v1/orders/1")).await;
    let json = parse_json(body);
    assert_eq!(json["order"]["subtotal_cents"], 20000);
    assert_eq!(json["order"]["total_cents"], 23200);
}

// ---------------------------------------------------------------------------
// POST /v1/orders — validation failures (400, no side effects)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_order_with_empty_items_is_400() {
    let store = seeded_store();
    let req = post_json("/v1/orders", json!({"status_code": 1, "items": []}));
    let (status, body) = call(make_router(Arc::clone(&store)), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let json = parse_json(body);
    assert!(json["message"].as_str().unwrap().contains("at least one item"));
    assert!(json["req_id"].is_string(), "error envelope carries req_id");

    assert_eq!(store.stock_of(1), Some(10), "no side effects");
}

#[tokio::test]
async fn create_order_with_zero_qty_is_400() {
    let req = post_json(
        "/v1/orders",
        json!({
            "status_code": 1,
            "items": [{"product_id": 1, "qty": 0, "price_cents": 5000}]
        }),
    );
    let (status, _) = call(make_router(seeded_store()), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_order_with_unknown_status_is_400() {
    let req = post_json(
        "/v1/orders",
        json!({
            "status_code": 99,
            "items": [{"product_id": 1, "qty": 1, "price_cents": 5000}]
        }),
    );
    let (status, body) = call(make_router(seeded_store()), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(parse_json(body)["message"]
        .as_str()
        .unwrap()
        .contains("unknown status code 99"));
}

#[tokio::test]
async fn create_order_with_unknown_product_is_400() {
    let req = post_json(
        "/v1/orders",
        json!({
            "status_code": 1,
            "items": [{"product_id": 777, "qty": 1, "price_cents": 5000}]
        }),
    );
    let (status, _) = call(make_router(seeded_store()), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// POST /v1/orders — insufficient stock (409, full rollback)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn oversubscribed_create_is_409_and_leaves_no_trace() {
    let store = seeded_store();

    let req = post_json(
        "/v1/orders",
        json!({
            "status_code": 1,
            "items": [{"product_id": 2, "qty": 5, "price_cents": 30000}]
        }),
    );
    let (status, body) = call(make_router(Arc::clone(&store)), req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(parse_json(body)["message"]
        .as_str()
        .unwrap()
        .contains("insufficient stock for product 2"));

    // Full rollback: the order id was never allocated and stock is intact.
    let (status, _) = call(make_router(Arc::clone(&store)), get("/v1/orders/1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(store.stock_of(2), Some(3));
}

#[tokio::test]
async fn duplicate_product_lines_are_collapsed_for_the_ledger() {
    let store = seeded_store();

    let req = post_json(
        "/v1/orders",
        json!({
            "status_code": 1,
            "items": [
                {"product_id": 1, "qty": 2, "price_cents": 5000},
                {"product_id": 1, "qty": 3, "price_cents": 5000}
            ]
        }),
    );
    let (status, _) = call(make_router(Arc::clone(&store)), req).await;
    assert_eq!(status, StatusCode::CREATED);

    assert_eq!(store.stock_of(1), Some(5), "single decrement of 5");

    let (_, body) = call(make_router(store), get("/v1/orders/1")).await;
    let json = parse_json(body);
    assert_eq!(
        json["lines"].as_array().unwrap().len(),
        2,
        "detail rows stay uncollapsed"
    );
    assert_eq!(json["order"]["qty_total"], 5);
}

// ---------------------------------------------------------------------------
// GET /v1/orders/:order_id — unknown ids and routes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_unknown_order_is_404_with_envelope() {
    let (status, body) = call(make_router(seeded_store()), get("/v1/orders/41")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let json = parse_json(body);
    assert!(json["message"].as_str().unwrap().contains("order 41 not found"));
    assert!(json["req_id"].is_string());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let (status, _) = call(make_router(seeded_store()), get("/v1/does_not_exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
