//! Schwab-specific message types

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::types::{AssetType, Instruction, OrderDuration, OrderType, Session, StrategyType};

/// Plain account number paired with the hash used in API paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountNumberHash {
    pub account_number: String,
    pub hash_value: String,
}

/// `GET /accounts/{hash}` response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub securities_account: SecuritiesAccount,
    #[serde(default)]
    pub aggregated_balance: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritiesAccount {
    #[serde(rename = "type", default)]
    pub account_type: String,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub current_balances: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub initial_balances: BTreeMap<String, serde_json::Value>,
    /// Only present when requested with `fields=positions`
    #[serde(default)]
    pub positions: Vec<SchwabPosition>,
}

/// One holding as the brokerage reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchwabPosition {
    #[serde(default)]
    pub long_quantity: Decimal,
    #[serde(default)]
    pub short_quantity: Decimal,
    #[serde(default)]
    pub average_price: Decimal,
    #[serde(default)]
    pub market_value: Decimal,
    #[serde(default)]
    pub current_day_profit_loss: Option<Decimal>,
    pub instrument: SchwabInstrument,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchwabInstrument {
    pub symbol: String,
    #[serde(default)]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub cusip: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub net_change: Option<Decimal>,
}

/// Entry of the `GET /quotes` map, keyed by symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetQuote {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub asset_main_type: Option<String>,
    #[serde(default)]
    pub quote: Option<QuoteFields>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteFields {
    #[serde(default)]
    pub last_price: Option<Decimal>,
    #[serde(default)]
    pub mark: Option<Decimal>,
    #[serde(default)]
    pub close_price: Option<Decimal>,
    #[serde(default)]
    pub open_price: Option<Decimal>,
    #[serde(default)]
    pub bid_price: Option<Decimal>,
    #[serde(default)]
    pub ask_price: Option<Decimal>,
    #[serde(default)]
    pub net_percent_change: Option<Decimal>,
    /// Epoch milliseconds
    #[serde(default)]
    pub quote_time: Option<i64>,
    #[serde(default)]
    pub total_volume: Option<u64>,
}

/// Order placement payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub order_type: OrderType,
    pub session: Session,
    pub duration: OrderDuration,
    pub order_strategy_type: StrategyType,
    /// Only for non-market orders
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub price: Option<Decimal>,
    pub order_leg_collection: Vec<OrderLeg>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLeg {
    pub instruction: Instruction,
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    pub instrument: OrderInstrument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInstrument {
    pub symbol: String,
    pub asset_type: AssetType,
}

/// OAuth token endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Error body the API returns on refusals
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}
