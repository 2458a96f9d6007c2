//! Unified types shared by the brokerage adapters and the order logic

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Brokerage account identifier (the hashed account number used in API paths)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Instruction {
    #[serde(alias = "buy")]
    Buy,
    #[serde(alias = "sell")]
    Sell,
    #[serde(alias = "sell_short")]
    SellShort,
    #[serde(alias = "buy_to_cover")]
    BuyToCover,
}

impl Instruction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Instruction::Buy => "BUY",
            Instruction::Sell => "SELL",
            Instruction::SellShort => "SELL_SHORT",
            Instruction::BuyToCover => "BUY_TO_COVER",
        }
    }

    /// Instruction that moves a holding of `current` shares by `delta`.
    ///
    /// Short holdings grow with SELL_SHORT and shrink with BUY_TO_COVER.
    pub fn for_delta(current: Decimal, delta: Decimal) -> Self {
        match (current < Decimal::ZERO, delta > Decimal::ZERO) {
            (false, true) => Instruction::Buy,
            (false, false) => Instruction::Sell,
            (true, true) => Instruction::BuyToCover,
            (true, false) => Instruction::SellShort,
        }
    }

    /// True for instructions that take shares out of the account
    pub fn is_sell(&self) -> bool {
        matches!(self, Instruction::Sell | Instruction::SellShort)
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    #[default]
    #[serde(alias = "market")]
    Market,
    #[serde(alias = "limit")]
    Limit,
    #[serde(alias = "stop")]
    Stop,
    #[serde(alias = "stop_limit")]
    StopLimit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "MARKET",
            OrderType::Limit => "LIMIT",
            OrderType::Stop => "STOP",
            OrderType::StopLimit => "STOP_LIMIT",
        }
    }

    /// Whether an order of this type must carry a price
    pub fn requires_price(&self) -> bool {
        !matches!(self, OrderType::Market)
    }
}

/// How long an order stays open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderDuration {
    #[default]
    #[serde(alias = "day")]
    Day,
    #[serde(alias = "gtc")]
    GoodTillCancel,
    #[serde(alias = "fok")]
    FillOrKill,
}

impl OrderDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDuration::Day => "DAY",
            OrderDuration::GoodTillCancel => "GOOD_TILL_CANCEL",
            OrderDuration::FillOrKill => "FILL_OR_KILL",
        }
    }
}

/// Asset class of an instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    #[default]
    Equity,
    Option,
    MutualFund,
    FixedIncome,
    CashEquivalent,
}

/// Trading session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Session {
    #[default]
    Normal,
    Am,
    Pm,
    Seamless,
}

impl Session {
    pub fn as_str(&self) -> &'static str {
        match self {
            Session::Normal => "NORMAL",
            Session::Am => "AM",
            Session::Pm => "PM",
            Session::Seamless => "SEAMLESS",
        }
    }
}

/// Order strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyType {
    #[default]
    Single,
    Oco,
    Trigger,
}

/// Current holding of one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub asset_type: AssetType,
    /// Signed share count, negative for short holdings
    pub quantity: Decimal,
    pub market_value: Decimal,
    pub entry_value: Decimal,
    pub net_change: Decimal,
    /// Share of total account value, zero when unknown
    pub account_fraction: Decimal,
}

impl Position {
    /// A position with no shares is treated as absent
    pub fn is_held(&self) -> bool {
        !self.quantity.is_zero()
    }
}

/// Current price snapshot for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    pub quote_time: DateTime<Utc>,
    pub total_volume: u64,
    pub net_percent_change: Decimal,
    pub bid_price: Decimal,
    pub ask_price: Decimal,
}

impl Quote {
    /// Midpoint between bid and ask, if both sides are quoted
    pub fn midpoint(&self) -> Option<Decimal> {
        if self.bid_price.is_zero() || self.ask_price.is_zero() {
            return None;
        }
        Some((self.bid_price + self.ask_price) / Decimal::from(2))
    }
}

/// Normalized single-leg order handed to the order gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericalOrder {
    pub symbol: String,
    pub instruction: Instruction,
    pub quantity: Decimal,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub order_type: OrderType,
    #[serde(default)]
    pub duration: OrderDuration,
    #[serde(default)]
    pub session: Session,
    #[serde(default)]
    pub asset_type: AssetType,
    #[serde(default)]
    pub strategy_type: StrategyType,
}

impl NumericalOrder {
    /// Market order for `quantity` shares of an equity
    pub fn market(symbol: impl Into<String>, instruction: Instruction, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            instruction,
            quantity,
            price: None,
            order_type: OrderType::Market,
            duration: OrderDuration::Day,
            session: Session::Normal,
            asset_type: AssetType::Equity,
            strategy_type: StrategyType::Single,
        }
    }

    /// Limit order at `price`
    pub fn limit(
        symbol: impl Into<String>,
        instruction: Instruction,
        quantity: Decimal,
        price: Decimal,
    ) -> Self {
        Self {
            price: Some(price),
            order_type: OrderType::Limit,
            ..Self::market(symbol, instruction, quantity)
        }
    }

    /// Dollar value of the order at `reference_price` (the order price wins if set).
    /// `None` without a price or when the product does not fit in a `Decimal`.
    pub fn notional(&self, reference_price: Option<Decimal>) -> Option<Decimal> {
        self.price
            .or(reference_price)
            .and_then(|p| p.checked_mul(self.quantity))
    }
}

/// Brokerage answer to an order submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub accepted: bool,
    #[serde(default)]
    pub broker_order_id: Option<String>,
    #[serde(default)]
    pub error_detail: Option<String>,
}

impl SubmissionReceipt {
    pub fn accepted(broker_order_id: Option<String>) -> Self {
        Self {
            accepted: true,
            broker_order_id,
            error_detail: None,
        }
    }

    pub fn rejected(detail: impl Into<String>) -> Self {
        Self {
            accepted: false,
            broker_order_id: None,
            error_detail: Some(detail.into()),
        }
    }
}

/// Coarse account-level balances
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AccountDetails {
    pub account_type: String,
    pub current_balances: BTreeMap<String, serde_json::Value>,
    pub initial_balances: BTreeMap<String, serde_json::Value>,
}
