// Handler tests for the pricing API
// Routes are exercised end to end against an in-memory catalog

use super::*;
use axum::http::StatusCode;
use axum_test::TestServer;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::time::Duration;

use crate::pricing::memory::InMemoryCatalog;

// ============================================================================
// Test Helpers
// ============================================================================

const SNAPSHOT: &str = r#"{
    "prices": [{"offer_id": 1, "price": 1000}, {"offer_id": 2, "price": 100}],
    "products": [{"offer_id": 1, "brand_id": 7}],
    "customers": [{"id": 5, "bonus_balance": 500}],
    "discounts": [
        {"id": 1, "type": "brand", "value": 10, "value_type": "percent", "brands": [{"id": 7}]}
    ],
    "promo_codes": [
        {"id": 1, "code": "FREESHIP", "type": "delivery"},
        {"id": 2, "code": "USEDUP", "type": "delivery", "counter": 1}
    ],
    "promo_code_usage": [{"customer_id": 5, "promo_code_id": 2, "count": 1}]
}"#;

/// Helper function to create a test app backed by the snapshot
fn create_test_app() -> TestServer {
    let catalog = InMemoryCatalog::from_json(SNAPSHOT).expect("Failed to load test snapshot");
    let engine = PricingEngine::from_catalog(Arc::new(catalog), Duration::from_secs(60));

    TestServer::new(create_router(AppState::new(engine))).unwrap()
}

fn decimal(value: &serde_json::Value) -> Decimal {
    serde_json::from_value(value.clone()).expect("Expected a decimal")
}

// ============================================================================
// Health and fallback
// ============================================================================

#[tokio::test]
async fn test_health() {
    let server = create_test_app();

    let response = server.get("/health").await;

    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route_returns_envelope() {
    let server = create_test_app();

    let response = server.get("/api/coffees").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "NOT_FOUND");
    assert!(body["timestamp"].is_string());
}

// ============================================================================
// POST /api/pricing/calculate
// ============================================================================

#[tokio::test]
async fn test_calculate_applies_brand_discount() {
    let server = create_test_app();

    let response = server
        .post("/api/pricing/calculate")
        .json(&json!({
            "customer_id": 5,
            "offers": [{"offer_id": 1, "qty": 1}, {"offer_id": 2, "qty": 2}]
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();

    assert_eq!(decimal(&body["total_cost"]), dec!(1200));
    assert_eq!(decimal(&body["total_price"]), dec!(1100));
    assert_eq!(decimal(&body["total_discount"]), dec!(100));
    assert_eq!(body["applied_discounts"].as_array().unwrap().len(), 1);
    assert_eq!(body["offers"][0]["discounts"][0]["discount_id"], 1);
    assert!(body["applied_promo_code"].is_null());
}

#[tokio::test]
async fn test_calculate_free_delivery_promo_code() {
    let server = create_test_app();

    let response = server
        .post("/api/pricing/calculate")
        .json(&json!({
            "customer_id": 5,
            "offers": [{"offer_id": 2, "qty": 1}],
            "deliveries": [{"method": 1, "price": 300}],
            "selected_delivery": 0,
            "promo_code": " freeship "
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();

    assert_eq!(body["applied_promo_code"]["id"], 1);
    assert_eq!(decimal(&body["applied_promo_code"]["change"]), dec!(300));
    assert_eq!(decimal(&body["deliveries"][0]["price"]), Decimal::ZERO);
}

#[tokio::test]
async fn test_calculate_ignores_exhausted_promo_code() {
    let server = create_test_app();

    let response = server
        .post("/api/pricing/calculate")
        .json(&json!({
            "customer_id": 5,
            "offers": [{"offer_id": 2, "qty": 1}],
            "promo_code": "USEDUP"
        }))
        .await;

    response.assert_status_ok();
    assert!(response.json::<serde_json::Value>()["applied_promo_code"].is_null());
}

#[tokio::test]
async fn test_calculate_rejects_zero_quantity() {
    let server = create_test_app();

    let response = server
        .post("/api/pricing/calculate")
        .json(&json!({"offers": [{"offer_id": 1, "qty": 0}]}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
    assert!(body["details"]["offers"].is_object());
}

#[tokio::test]
async fn test_calculate_rejects_negative_bonus_spend() {
    let server = create_test_app();

    let response = server
        .post("/api/pricing/calculate")
        .json(&json!({"offers": [{"offer_id": 1, "qty": 1}], "bonus_to_spend": -10}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_calculate_empty_basket() {
    let server = create_test_app();

    let response = server.post("/api/pricing/calculate").json(&json!({})).await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(decimal(&body["total_price"]), Decimal::ZERO);
    assert!(body["offers"].as_array().unwrap().is_empty());
}

// ============================================================================
// POST /api/pricing/catalog and GET /api/pricing/metrics
// ============================================================================

#[tokio::test]
async fn test_catalog_prices() {
    let server = create_test_app();

    let response = server
        .post("/api/pricing/catalog")
        .json(&json!({"offer_ids": [1, 2]}))
        .await;

    response.assert_status_ok();
    let prices: Vec<serde_json::Value> = response.json();
    assert_eq!(prices.len(), 2);
    assert_eq!(decimal(&prices[0]["price"]), dec!(900));
    assert_eq!(decimal(&prices[1]["price"]), dec!(100));
}

#[tokio::test]
async fn test_catalog_requires_offers() {
    let server = create_test_app();

    let response = server
        .post("/api/pricing/catalog")
        .json(&json!({"offer_ids": []}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_count_calculations() {
    let server = create_test_app();

    server
        .post("/api/pricing/calculate")
        .json(&json!({"offers": [{"offer_id": 2, "qty": 1}]}))
        .await
        .assert_status_ok();

    let response = server.get("/api/pricing/metrics").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["basket_calculations"]["count"], 1);
}
