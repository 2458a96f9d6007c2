//! In-process tests for the HTTP endpoints.
//!
//! The router is driven through `tower::ServiceExt::oneshot` against the
//! in-memory brokerage; no socket is bound.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use clearinghouse::adjustment::SafetyLimits;
use clearinghouse::api::{build_router, AppState};
use clearinghouse::LocalBrokerage;
use common::sample_brokerage;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn state_for(brokerage: Arc<LocalBrokerage>, read_only: bool) -> Arc<AppState> {
    Arc::new(AppState::new(
        brokerage,
        SafetyLimits::default(),
        read_only,
        Duration::from_secs(60),
    ))
}

fn make_router() -> axum::Router {
    build_router(state_for(Arc::new(sample_brokerage()), false))
}

async fn call(router: axum::Router, req: Request<Body>) -> (StatusCode, Bytes) {
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

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn parse_json(b: Bytes) -> Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn decimal(value: &Value) -> rust_decimal::Decimal {
    match value {
        Value::String(s) => s.parse().expect("not a decimal string"),
        other => other.to_string().parse().expect("not a decimal number"),
    }
}

// ---------------------------------------------------------------------------
// GET /
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_reports_healthy() {
    let (status, body) = call(make_router(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body), json!({"status": "healthy"}));
}

// ---------------------------------------------------------------------------
// Positions and quotes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_positions_are_wrapped_and_filtered() {
    let (status, body) = call(make_router(), get("/v1/positions?symbols=aapl,MSFT")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["meta"]["type"], "PositionsList");
    let symbols: Vec<_> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["symbol"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(symbols, vec!["AAPL", "MSFT"]);
}

#[tokio::test]
async fn test_single_quote_and_missing_quote() {
    let (status, body) = call(make_router(), get("/v1/quotes/tsla")).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["meta"]["type"], "Quote");
    assert_eq!(json["data"]["symbol"], "TSLA");

    let (status, body) = call(make_router(), get("/v1/quotes/NOPE")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(parse_json(body)["detail"].as_str().unwrap().contains("NOPE"));
}

#[tokio::test]
async fn test_quote_list_omits_unknown_symbols() {
    let (status, body) = call(
        make_router(),
        post_json("/v1/quotes", json!(["AAPL", "NOPE", "msft"])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["meta"]["type"], "QuotesList");
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_account_status_is_served() {
    let (status, body) = call(make_router(), get("/v1/account/status")).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["meta"]["type"], "AccountStatus");
    assert_eq!(json["data"]["brokerage"], "Local");
    assert_eq!(json["data"]["read_only"], false);
}

// ---------------------------------------------------------------------------
// POST /v1/adjustments
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_clean_batch_returns_201() {
    let brokerage = Arc::new(sample_brokerage());
    let router = build_router(state_for(brokerage.clone(), false));

    let (status, body) = call(
        router,
        post_json(
            "/v1/adjustments",
            json!([{"symbol": "MSFT", "adjustment": -1}, {"symbol": "AAPL", "adjustment": 0.5}]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let json = parse_json(body);
    assert_eq!(json["meta"]["type"], "AdjustmentOrder");
    let results = json["data"]["results"].as_array().unwrap();
    assert_eq!(results[0]["symbol"], "MSFT");
    assert_eq!(results[0]["instruction"], "SELL");
    assert_eq!(decimal(&results[0]["quantity"]), rust_decimal::Decimal::from(50));
    assert_eq!(results[0]["status"], "SUCCEEDED");
    assert_eq!(results[1]["instruction"], "BUY");
    assert_eq!(json["data"]["counts"]["SUCCEEDED"], 2);

    assert_eq!(brokerage.submitted_orders().await.len(), 2);
}

#[tokio::test]
async fn test_mixed_batch_returns_207() {
    let (status, body) = call(
        make_router(),
        post_json(
            "/v1/adjustments",
            json!([
                {"symbol": "AAPL", "adjustment": 0},
                {"symbol": "TSLA", "adjustment": 0.5},
                {"symbol": "NVDA", "adjustment": 0.25}
            ]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::MULTI_STATUS);

    let json = parse_json(body);
    let results = json["data"]["results"].as_array().unwrap();
    assert_eq!(results[0]["status"], "IGNORED");
    assert_eq!(results[1]["status"], "FAILED");
    assert_eq!(results[1]["info"], "No existing position");
    assert_eq!(results[2]["status"], "SUCCEEDED");
    assert_eq!(json["data"]["counts"]["IGNORED"], 1);
    assert_eq!(json["data"]["counts"]["FAILED"], 1);
    assert_eq!(json["data"]["counts"]["PREVIEW"], 0);
}

#[tokio::test]
async fn test_preview_does_not_submit() {
    let brokerage = Arc::new(sample_brokerage());
    let router = build_router(state_for(brokerage.clone(), false));

    let (status, body) = call(
        router,
        post_json(
            "/v1/adjustments?preview=true&round_down=true",
            json!([{"symbol": "NVDA", "adjustment": 0.33}]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let json = parse_json(body);
    assert_eq!(json["data"]["results"][0]["status"], "PREVIEW");
    assert_eq!(
        decimal(&json["data"]["results"][0]["quantity"]),
        rust_decimal::Decimal::from(13)
    );
    assert!(brokerage.submitted_orders().await.is_empty());
}

#[tokio::test]
async fn test_read_only_refuses_submission_but_allows_preview() {
    let brokerage = Arc::new(sample_brokerage());
    let state = state_for(brokerage.clone(), true);
    let body = json!([{"symbol": "AAPL", "adjustment": 0.5}]);

    let (status, resp) = call(
        build_router(state.clone()),
        post_json("/v1/adjustments", body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        parse_json(resp)["detail"],
        "Clearinghouse is in read-only mode."
    );

    let (status, _) = call(
        build_router(state),
        post_json("/v1/adjustments?preview=true", body),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(brokerage.submitted_orders().await.is_empty());
}

#[tokio::test]
async fn test_invalid_adjustments_return_400() {
    let cases = [
        json!([{"symbol": "AAPL", "adjustment": 0.5, "price": 100}]),
        json!([{"symbol": "AAPL", "adjustment": 0.5, "order_type": "LIMIT"}]),
        json!([{"symbol": "AAPL", "adjustment": -1.5}]),
        json!([]),
        json!({"symbol": "AAPL"}),
    ];
    for case in cases {
        let (status, body) = call(make_router(), post_json("/v1/adjustments", case.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "case {}", case);
        assert!(parse_json(body)["detail"].is_string());
    }
}

#[tokio::test]
async fn test_market_price_error_message() {
    let (_, body) = call(
        make_router(),
        post_json(
            "/v1/adjustments",
            json!([{"symbol": "AAPL", "adjustment": 0.5, "price": 100}]),
        ),
    )
    .await;
    assert_eq!(
        parse_json(body)["detail"],
        "Price cannot be set for market orders."
    );
}

// ---------------------------------------------------------------------------
// POST /v1/allocations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_allocation_respects_cap() {
    let (status, body) = call(
        make_router(),
        post_json(
            "/v1/allocations",
            json!({
                "entries": [
                    {"symbol": "A", "target": 100, "candidates": [80, 130]},
                    {"symbol": "B", "target": 100, "candidates": [100]},
                    {"symbol": "C", "target": 80, "candidates": [35, 100]}
                ],
                "capital_cap": 270
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["meta"]["type"], "Allocation");
    let indices: Vec<_> = json["data"]["choices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["index"].as_u64().unwrap())
        .collect();
    assert_eq!(indices, vec![0, 0, 0]);
}

// ---------------------------------------------------------------------------
// POST /v1/orders/sequence
// ---------------------------------------------------------------------------

fn order(symbol: &str, instruction: &str) -> Value {
    json!({"symbol": symbol, "instruction": instruction, "quantity": 1})
}

#[tokio::test]
async fn test_sequence_defaults_to_sells_first() {
    let (status, body) = call(
        make_router(),
        post_json(
            "/v1/orders/sequence",
            json!({"orders": [order("A", "BUY"), order("B", "SELL"), order("C", "BUY_TO_COVER")]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["meta"]["type"], "SequencedOrdersList");
    let symbols: Vec<_> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["symbol"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(symbols, vec!["B", "C", "A"]);
}

#[tokio::test]
async fn test_sequence_rejects_values_outside_priority() {
    let (status, body) = call(
        make_router(),
        post_json(
            "/v1/orders/sequence",
            json!({
                "orders": [order("A", "BUY"), order("B", "SELL")],
                "attribute": "instruction",
                "priority": ["sell"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(parse_json(body)["detail"].as_str().unwrap().contains("BUY"));
}

#[tokio::test]
async fn test_sequence_rejects_unknown_attribute() {
    let (status, _) = call(
        make_router(),
        post_json(
            "/v1/orders/sequence",
            json!({"orders": [order("A", "BUY")], "attribute": "color", "priority": ["RED"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
