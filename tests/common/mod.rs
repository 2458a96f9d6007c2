//! Common test utilities and fixtures
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use clearinghouse::common::errors::Result;
use clearinghouse::common::traits::OrderGateway;
use clearinghouse::common::types::{AccountId, NumericalOrder, SubmissionReceipt};
use clearinghouse::schwab::local::{sample_position, sample_quote};
use clearinghouse::LocalBrokerage;
use mockall::mock;
use rust_decimal_macros::dec;

mock! {
    pub Gateway {}

    #[async_trait]
    impl OrderGateway for Gateway {
        async fn submit_order(
            &self,
            account: &AccountId,
            order: &NumericalOrder,
        ) -> Result<SubmissionReceipt>;
    }
}

/// Brokerage holding AAPL 100, MSFT 50, NVDA 40 and a SQQQ short of 30,
/// with quotes for all of them plus an unheld TSLA
pub fn sample_brokerage() -> LocalBrokerage {
    LocalBrokerage::new(AccountId::new("TEST"))
        .with_position(sample_position("AAPL", dec!(100), dec!(190)))
        .with_position(sample_position("MSFT", dec!(50), dec!(410)))
        .with_position(sample_position("NVDA", dec!(40), dec!(120)))
        .with_position(sample_position("SQQQ", dec!(-30), dec!(10)))
        .with_quote(sample_quote("AAPL", dec!(190), 50_000_000))
        .with_quote(sample_quote("MSFT", dec!(410), 20_000_000))
        .with_quote(sample_quote("NVDA", dec!(120), 300_000_000))
        .with_quote(sample_quote("SQQQ", dec!(10), 90_000_000))
        .with_quote(sample_quote("TSLA", dec!(240), 95_000_000))
}

pub fn shared_brokerage() -> Arc<LocalBrokerage> {
    Arc::new(sample_brokerage())
}

/// Sample Schwab API payloads for testing parsing
pub mod schwab_payloads {
    pub const ACCOUNT_NUMBERS: &str = r#"[
        {"accountNumber": "12345678", "hashValue": "E5B0C2A1"},
        {"accountNumber": "87654321", "hashValue": "F6C1D3B2"}
    ]"#;

    pub const ACCOUNT_WITH_POSITIONS: &str = r#"{
        "securitiesAccount": {
            "type": "MARGIN",
            "accountNumber": "12345678",
            "currentBalances": {"liquidationValue": 29000.0, "cashBalance": 1000.0},
            "initialBalances": {"liquidationValue": 28500.0},
            "positions": [
                {
                    "longQuantity": 100.0,
                    "shortQuantity": 0.0,
                    "averagePrice": 150.0,
                    "marketValue": 19000.0,
                    "instrument": {"symbol": "AAPL", "assetType": "EQUITY", "cusip": "037833100", "netChange": 1.25}
                },
                {
                    "longQuantity": 0.0,
                    "shortQuantity": 30.0,
                    "averagePrice": 12.0,
                    "marketValue": -300.0,
                    "instrument": {"symbol": "SQQQ", "assetType": "EQUITY"}
                }
            ]
        },
        "aggregatedBalance": {"liquidationValue": 29000.0}
    }"#;

    pub const QUOTES: &str = r#"{
        "AAPL": {
            "assetMainType": "EQUITY",
            "symbol": "AAPL",
            "quote": {
                "lastPrice": 190.5,
                "mark": 190.4,
                "closePrice": 188.0,
                "openPrice": 189.0,
                "bidPrice": 190.45,
                "askPrice": 190.55,
                "netPercentChange": 1.33,
                "quoteTime": 1704067200000,
                "totalVolume": 52000000
            }
        }
    }"#;

    pub const TOKEN: &str = r#"{
        "access_token": "fresh-access-token",
        "refresh_token": "refresh-token",
        "token_type": "Bearer",
        "expires_in": 1800,
        "scope": "api"
    }"#;
}
