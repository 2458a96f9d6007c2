//! In-memory brokerage serving sample data
//!
//! Used in local mode and by tests. Orders are recorded instead of sent;
//! accepted orders do not change the held positions.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::common::errors::{GatewayError, Result};
use crate::common::traits::{
    AccountStatusProvider, Brokerage, OrderGateway, PositionProvider, QuoteProvider,
};
use crate::common::types::{
    AccountDetails, AccountId, AssetType, NumericalOrder, Position, Quote, SubmissionReceipt,
};

/// Brokerage backed by in-memory positions and quotes
pub struct LocalBrokerage {
    account: AccountId,
    positions: RwLock<Vec<Position>>,
    quotes: RwLock<HashMap<String, Quote>>,
    submitted: Mutex<Vec<NumericalOrder>>,
    /// When set, every submission is refused with this detail
    reject_with: RwLock<Option<String>>,
    read_only: bool,
    next_order_id: Mutex<u64>,
}

/// Position of `quantity` shares valued at `price`
pub fn sample_position(symbol: &str, quantity: Decimal, price: Decimal) -> Position {
    Position {
        symbol: symbol.to_string(),
        asset_type: AssetType::Equity,
        quantity,
        market_value: quantity * price,
        entry_value: quantity.abs() * price,
        net_change: Decimal::ZERO,
        account_fraction: Decimal::ZERO,
    }
}

/// Quote at `price` with the given daily volume
pub fn sample_quote(symbol: &str, price: Decimal, total_volume: u64) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        price,
        quote_time: Utc::now(),
        total_volume,
        net_percent_change: Decimal::ZERO,
        bid_price: price - dec!(0.01),
        ask_price: price + dec!(0.01),
    }
}

impl LocalBrokerage {
    /// Empty brokerage for `account`
    pub fn new(account: AccountId) -> Self {
        Self {
            account,
            positions: RwLock::new(Vec::new()),
            quotes: RwLock::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            reject_with: RwLock::new(None),
            read_only: false,
            next_order_id: Mutex::new(1),
        }
    }

    /// Brokerage preloaded with a small sample portfolio
    pub fn with_sample_data() -> Self {
        Self::new(AccountId::new("LOCAL"))
            .with_position(sample_position("AAPL", dec!(100), dec!(190)))
            .with_position(sample_position("MSFT", dec!(50), dec!(410)))
            .with_position(sample_position("SPY", dec!(25), dec!(520)))
            .with_position(sample_position("SQQQ", dec!(-30), dec!(10)))
            .with_quote(sample_quote("AAPL", dec!(190), 52_000_000))
            .with_quote(sample_quote("MSFT", dec!(410), 21_000_000))
            .with_quote(sample_quote("SPY", dec!(520), 70_000_000))
            .with_quote(sample_quote("SQQQ", dec!(10), 90_000_000))
            .with_quote(sample_quote("TSLA", dec!(240), 95_000_000))
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.positions.get_mut().push(position);
        self
    }

    pub fn with_quote(mut self, quote: Quote) -> Self {
        self.quotes.get_mut().insert(quote.symbol.clone(), quote);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Refuse every following submission with `detail`
    pub async fn reject_orders(&self, detail: impl Into<String>) {
        *self.reject_with.write().await = Some(detail.into());
    }

    pub async fn accept_orders(&self) {
        *self.reject_with.write().await = None;
    }

    /// Orders accepted so far, in submission order
    pub async fn submitted_orders(&self) -> Vec<NumericalOrder> {
        self.submitted.lock().await.clone()
    }

    async fn account_value(&self) -> Decimal {
        self.positions
            .read()
            .await
            .iter()
            .map(|p| p.market_value)
            .sum()
    }
}

#[async_trait]
impl PositionProvider for LocalBrokerage {
    async fn fetch_positions(
        &self,
        _account: &AccountId,
        symbols: Option<&[String]>,
    ) -> Result<Vec<Position>> {
        let total = self.account_value().await;
        let positions = self.positions.read().await;
        Ok(positions
            .iter()
            .filter(|p| match symbols {
                Some(filter) => filter.iter().any(|s| s.eq_ignore_ascii_case(&p.symbol)),
                None => true,
            })
            .map(|p| Position {
                account_fraction: if total.is_zero() {
                    Decimal::ZERO
                } else {
                    p.market_value / total
                },
                ..p.clone()
            })
            .collect())
    }
}

#[async_trait]
impl QuoteProvider for LocalBrokerage {
    async fn fetch_quotes(&self, _account: &AccountId, symbols: &[String]) -> Result<Vec<Quote>> {
        let quotes = self.quotes.read().await;
        Ok(symbols
            .iter()
            .filter_map(|s| quotes.get(&s.to_ascii_uppercase()).cloned())
            .collect())
    }
}

#[async_trait]
impl OrderGateway for LocalBrokerage {
    async fn submit_order(
        &self,
        _account: &AccountId,
        order: &NumericalOrder,
    ) -> Result<SubmissionReceipt> {
        if self.read_only {
            return Err(GatewayError::ReadOnly);
        }
        if let Some(detail) = self.reject_with.read().await.clone() {
            debug!(symbol = %order.symbol, %detail, "Local order rejected");
            return Ok(SubmissionReceipt::rejected(detail));
        }

        let mut next_id = self.next_order_id.lock().await;
        let order_id = *next_id;
        *next_id += 1;
        self.submitted.lock().await.push(order.clone());

        info!(
            symbol = %order.symbol,
            instruction = %order.instruction,
            quantity = %order.quantity,
            order_id,
            "Local order accepted"
        );
        Ok(SubmissionReceipt::accepted(Some(order_id.to_string())))
    }
}

#[async_trait]
impl AccountStatusProvider for LocalBrokerage {
    async fn fetch_account_status(&self, _account: &AccountId) -> Result<AccountDetails> {
        let total = self.account_value().await;
        let mut balances = BTreeMap::new();
        balances.insert(
            "liquidationValue".to_string(),
            serde_json::Value::String(total.to_string()),
        );
        Ok(AccountDetails {
            account_type: "MARGIN".to_string(),
            current_balances: balances.clone(),
            initial_balances: balances,
        })
    }
}

impl Brokerage for LocalBrokerage {
    fn default_account(&self) -> &AccountId {
        &self.account
    }

    fn brokerage_name(&self) -> &'static str {
        "Local"
    }
}
