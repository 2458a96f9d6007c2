//! Integration tests for the Schwab REST adapter
//!
//! A wiremock server stands in for the trader, market data and token APIs.

mod common;

use std::time::Duration;

use clearinghouse::common::errors::GatewayError;
use clearinghouse::common::traits::{Brokerage, OrderGateway, PositionProvider, QuoteProvider};
use clearinghouse::common::types::{Instruction, NumericalOrder};
use clearinghouse::config::types::{ApiCredentials, BrokerageConfig};
use clearinghouse::schwab::messages::OrderRequest;
use clearinghouse::schwab::{SchwabClient, SchwabRestClient};
use common::schwab_payloads;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-access-token";

fn json(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "application/json")
}

fn rest_client(server: &MockServer) -> SchwabRestClient {
    SchwabRestClient::new(&server.uri(), &server.uri(), &format!("{}/oauth/token", server.uri()))
        .expect("Failed to create REST client")
        .with_access_token(TOKEN)
}

fn brokerage_config(server: &MockServer) -> BrokerageConfig {
    BrokerageConfig {
        trader_url: server.uri(),
        market_data_url: server.uri(),
        token_url: format!("{}/oauth/token", server.uri()),
        access_token: Some(TOKEN.to_string()),
        ..Default::default()
    }
}

async fn mount_account_numbers(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/accounts/accountNumbers"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(json(schwab_payloads::ACCOUNT_NUMBERS))
        .mount(server)
        .await;
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn test_get_account_numbers() {
    let server = MockServer::start().await;
    mount_account_numbers(&server).await;

    let accounts = rest_client(&server).get_account_numbers().await.unwrap();

    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[1].account_number, "87654321");
    assert_eq!(accounts[1].hash_value, "F6C1D3B2");
}

#[tokio::test]
async fn test_connect_resolves_configured_account() {
    let server = MockServer::start().await;
    mount_account_numbers(&server).await;

    let config = BrokerageConfig {
        use_default_trading_account: false,
        account_number: Some("87654321".to_string()),
        ..brokerage_config(&server)
    };
    let client = SchwabClient::connect(&config, Duration::from_secs(5)).await.unwrap();

    assert_eq!(client.default_account().as_str(), "F6C1D3B2");
    assert_eq!(client.brokerage_name(), "Schwab");
}

#[tokio::test]
async fn test_positions_are_signed_and_weighted() {
    let server = MockServer::start().await;
    mount_account_numbers(&server).await;
    Mock::given(method("GET"))
        .and(path("/accounts/E5B0C2A1"))
        .and(query_param("fields", "positions"))
        .respond_with(json(schwab_payloads::ACCOUNT_WITH_POSITIONS))
        .mount(&server)
        .await;

    let client = SchwabClient::connect(&brokerage_config(&server), Duration::from_secs(5))
        .await
        .unwrap();
    let positions = client
        .fetch_positions(client.default_account(), None)
        .await
        .unwrap();

    assert_eq!(positions.len(), 2);
    assert_eq!(positions[0].symbol, "AAPL");
    assert_eq!(positions[0].quantity, dec!(100));
    assert_eq!(positions[0].entry_value, dec!(15000));
    assert_eq!(positions[0].account_fraction, dec!(19000) / dec!(29000));
    assert_eq!(positions[1].symbol, "SQQQ");
    assert_eq!(positions[1].quantity, dec!(-30));

    let filter = vec!["sqqq".to_string()];
    let filtered = client
        .fetch_positions(client.default_account(), Some(&filter))
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
}

#[tokio::test]
async fn test_unknown_account_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/NOPE"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = rest_client(&server).get_account("NOPE", false).await;
    assert!(matches!(result, Err(GatewayError::AccountNotFound(_))));
}

// ============================================================================
// Quotes
// ============================================================================

#[tokio::test]
async fn test_quotes_skip_unknown_symbols() {
    let server = MockServer::start().await;
    mount_account_numbers(&server).await;
    Mock::given(method("GET"))
        .and(path("/quotes"))
        .and(query_param("symbols", "AAPL,MSFT"))
        .and(query_param("fields", "quote"))
        .respond_with(json(schwab_payloads::QUOTES))
        .mount(&server)
        .await;

    let client = SchwabClient::connect(&brokerage_config(&server), Duration::from_secs(5))
        .await
        .unwrap();
    let quotes = client
        .fetch_quotes(
            client.default_account(),
            &["AAPL".to_string(), "MSFT".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].symbol, "AAPL");
    assert_eq!(quotes[0].price, dec!(190.5));
    assert_eq!(quotes[0].total_volume, 52_000_000);
    assert_eq!(quotes[0].quote_time.timestamp(), 1_704_067_200);
}

// ============================================================================
// Orders
// ============================================================================

#[tokio::test]
async fn test_place_order_reads_id_from_location() {
    let server = MockServer::start().await;
    mount_account_numbers(&server).await;
    let location = format!("{}/accounts/E5B0C2A1/orders/1001", server.uri());
    Mock::given(method("POST"))
        .and(path("/accounts/E5B0C2A1/orders"))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", location.as_str()))
        .expect(1)
        .mount(&server)
        .await;

    let client = SchwabClient::connect(&brokerage_config(&server), Duration::from_secs(5))
        .await
        .unwrap();
    let order = NumericalOrder::limit("AAPL", Instruction::Buy, dec!(5), dec!(189.5));
    let receipt = client
        .submit_order(client.default_account(), &order)
        .await
        .unwrap();

    assert!(receipt.accepted);
    assert_eq!(receipt.broker_order_id.as_deref(), Some("1001"));

    let requests = server.received_requests().await.unwrap();
    let sent = requests
        .iter()
        .find(|r| r.url.path().ends_with("/orders"))
        .expect("order was not sent");
    let body: serde_json::Value = serde_json::from_slice(&sent.body).unwrap();
    assert_eq!(body["orderType"], "LIMIT");
    assert_eq!(body["price"], 189.5);
    assert_eq!(body["orderLegCollection"][0]["instruction"], "BUY");
    assert_eq!(body["orderLegCollection"][0]["quantity"], 5.0);
    assert_eq!(body["orderLegCollection"][0]["instrument"]["symbol"], "AAPL");
}

#[tokio::test]
async fn test_client_error_becomes_rejected_receipt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/HASH/orders"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_raw(r#"{"message": "Insufficient buying power"}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let order = NumericalOrder::market("AAPL", Instruction::Buy, dec!(5));
    let receipt = rest_client(&server)
        .place_order("HASH", &OrderRequest::from(&order))
        .await
        .unwrap();

    assert!(!receipt.accepted);
    assert_eq!(receipt.error_detail.as_deref(), Some("Insufficient buying power"));
}

#[tokio::test]
async fn test_unauthorized_order_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/HASH/orders"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let order = NumericalOrder::market("AAPL", Instruction::Sell, dec!(5));
    let result = rest_client(&server).place_order("HASH", &OrderRequest::from(&order)).await;
    assert!(matches!(result, Err(GatewayError::Authentication(_))));
}

#[tokio::test]
async fn test_server_error_is_an_order_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/accounts/HASH/orders"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let order = NumericalOrder::market("AAPL", Instruction::Sell, dec!(5));
    let result = rest_client(&server).place_order("HASH", &OrderRequest::from(&order)).await;
    match result {
        Err(GatewayError::OrderRejected { status, detail }) => {
            assert_eq!(status, 503);
            assert_eq!(detail, "maintenance");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_refresh_token_is_exchanged_and_used() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("authorization", "Basic a2V5OnNlY3JldA=="))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=my-refresh"))
        .respond_with(json(schwab_payloads::TOKEN))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/accounts/accountNumbers"))
        .and(header("authorization", "Bearer fresh-access-token"))
        .respond_with(json(schwab_payloads::ACCOUNT_NUMBERS))
        .expect(1)
        .mount(&server)
        .await;

    let config = BrokerageConfig {
        app_key: "key".to_string(),
        app_secret: "secret".to_string(),
        access_token: None,
        refresh_token: Some("my-refresh".to_string()),
        ..brokerage_config(&server)
    };
    let client = SchwabClient::connect(&config, Duration::from_secs(5)).await.unwrap();
    assert_eq!(client.default_account().as_str(), "E5B0C2A1");
}

#[tokio::test]
async fn test_refresh_without_credentials_fails() {
    let server = MockServer::start().await;
    let client = SchwabRestClient::new(&server.uri(), &server.uri(), &server.uri()).unwrap();
    let result = client.refresh_access_token("my-refresh").await;
    assert!(matches!(result, Err(GatewayError::Authentication(_))));

    let with_creds = client.with_credentials(ApiCredentials::new(
        "key".to_string(),
        "secret".to_string(),
    ));
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad refresh token"))
        .mount(&server)
        .await;
    let result = with_creds.refresh_access_token("my-refresh").await;
    assert!(matches!(result, Err(GatewayError::Authentication(_))));
}
