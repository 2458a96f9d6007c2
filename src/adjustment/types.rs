use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::safety::SafetyViolation;
use crate::common::errors::{GatewayError, Result};
use crate::common::types::{
    AssetType, Instruction, NumericalOrder, OrderDuration, OrderType, Session, StrategyType,
};

/// A requested proportional change to an existing holding
///
/// `adjustment` is a signed fraction: `0.5` grows the holding by half,
/// `-1` liquidates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AdjustmentRequest {
    pub symbol: String,
    pub adjustment: Decimal,
    #[serde(default, alias = "orderType")]
    pub order_type: OrderType,
    #[serde(default)]
    pub duration: OrderDuration,
    /// Required for non-market orders, forbidden for market orders
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default, alias = "assetType")]
    pub asset_type: AssetType,
    #[serde(default)]
    pub session: Session,
    #[serde(default, alias = "strategyType")]
    pub strategy_type: StrategyType,
}

impl AdjustmentRequest {
    /// Market-order adjustment of `symbol` by `adjustment`
    pub fn new(symbol: impl Into<String>, adjustment: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            adjustment,
            order_type: OrderType::Market,
            duration: OrderDuration::Day,
            price: None,
            asset_type: AssetType::Equity,
            session: Session::Normal,
            strategy_type: StrategyType::Single,
        }
    }

    /// Switch to a limit order at `price`
    pub fn with_limit_price(mut self, price: Decimal) -> Self {
        self.order_type = OrderType::Limit;
        self.price = Some(price);
        self
    }

    /// Input validation done at the request boundary.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("symbol must not be empty".to_string()));
        }
        if self.adjustment < Decimal::NEGATIVE_ONE {
            return Err(GatewayError::InvalidRequest(format!(
                "adjustment for {} is {}, cannot sell more than the whole position (minimum -1)",
                self.symbol, self.adjustment
            )));
        }
        match (self.order_type.requires_price(), self.price) {
            (false, Some(_)) => Err(GatewayError::InvalidRequest(
                "Price cannot be set for market orders.".to_string(),
            )),
            (true, None) => Err(GatewayError::InvalidRequest(format!(
                "Price is required for {} orders.",
                self.order_type.as_str()
            ))),
            (true, Some(price)) if price <= Decimal::ZERO => Err(GatewayError::InvalidRequest(
                "Price must be positive.".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Per-call switches for the adjustment engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustOptions {
    /// Truncate target quantities to whole shares
    #[serde(default)]
    pub round_down: bool,
    /// Compute orders without submitting them
    #[serde(default)]
    pub preview: bool,
}

impl AdjustOptions {
    pub fn preview() -> Self {
        Self {
            round_down: false,
            preview: true,
        }
    }

    pub fn submit() -> Self {
        Self::default()
    }

    pub fn with_round_down(mut self, round_down: bool) -> Self {
        self.round_down = round_down;
        self
    }
}

/// Terminal status of one adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdjustmentStatus {
    Ignored,
    Failed,
    Succeeded,
    Preview,
}

impl AdjustmentStatus {
    pub const ALL: [AdjustmentStatus; 4] = [
        AdjustmentStatus::Ignored,
        AdjustmentStatus::Failed,
        AdjustmentStatus::Succeeded,
        AdjustmentStatus::Preview,
    ];
}

impl std::fmt::Display for AdjustmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdjustmentStatus::Ignored => write!(f, "IGNORED"),
            AdjustmentStatus::Failed => write!(f, "FAILED"),
            AdjustmentStatus::Succeeded => write!(f, "SUCCEEDED"),
            AdjustmentStatus::Preview => write!(f, "PREVIEW"),
        }
    }
}

/// Why an adjustment ended in FAILED
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// The account holds nothing in the symbol
    NoPosition,
    /// The position snapshot could not be fetched
    PositionUnavailable,
    /// The target quantity does not fit in a `Decimal`
    OutOfRange,
    /// No usable quote for the symbol
    QuoteUnavailable,
    /// The order breaks a safety limit
    Safety(SafetyViolation),
    /// The brokerage rejected the order or could not be reached
    Submission,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::NoPosition => write!(f, "No existing position"),
            FailureReason::PositionUnavailable => write!(f, "Position lookup failed"),
            FailureReason::OutOfRange => write!(f, "Adjustment out of range"),
            FailureReason::QuoteUnavailable => write!(f, "Quote unavailable"),
            FailureReason::Safety(violation) => write!(f, "{}", violation),
            FailureReason::Submission => write!(f, "Misc. failure"),
        }
    }
}

/// How one adjustment ended
#[derive(Debug, Clone, PartialEq)]
pub enum AdjustmentOutcome {
    /// Already at target, nothing to do
    Ignored,
    Failed(FailureReason),
    Succeeded { broker_order_id: Option<String> },
    /// Computed but not submitted
    Preview,
}

impl AdjustmentOutcome {
    pub fn status(&self) -> AdjustmentStatus {
        match self {
            AdjustmentOutcome::Ignored => AdjustmentStatus::Ignored,
            AdjustmentOutcome::Failed(_) => AdjustmentStatus::Failed,
            AdjustmentOutcome::Succeeded { .. } => AdjustmentStatus::Succeeded,
            AdjustmentOutcome::Preview => AdjustmentStatus::Preview,
        }
    }
}

/// Result of adjusting one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentOrderResult {
    pub symbol: String,
    pub instruction: Instruction,
    /// Non-negative order size
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    /// Largest absolute holding across the trade
    pub total_position_size: Decimal,
    pub outcome: AdjustmentOutcome,
}

impl AdjustmentOrderResult {
    pub fn status(&self) -> AdjustmentStatus {
        self.outcome.status()
    }

    /// Free-text diagnostic, empty when there is nothing to say
    pub fn info(&self) -> String {
        match &self.outcome {
            AdjustmentOutcome::Failed(reason) => reason.to_string(),
            AdjustmentOutcome::Succeeded {
                broker_order_id: Some(id),
            } => format!("Broker order {}", id),
            _ => String::new(),
        }
    }

    /// Same sizing with a different outcome
    pub fn with_outcome(self, outcome: AdjustmentOutcome) -> Self {
        Self { outcome, ..self }
    }

    /// Brokerage-neutral order for this result, shaped by the originating request.
    ///
    /// The price is only carried for order types that take one; for market
    /// orders the reported price is informational.
    pub fn to_order(&self, request: &AdjustmentRequest) -> NumericalOrder {
        NumericalOrder {
            symbol: self.symbol.clone(),
            instruction: self.instruction,
            quantity: self.quantity,
            price: if request.order_type.requires_price() {
                request.price.or(self.price)
            } else {
                None
            },
            order_type: request.order_type,
            duration: request.duration,
            session: request.session,
            asset_type: request.asset_type,
            strategy_type: request.strategy_type,
        }
    }
}

impl Serialize for AdjustmentOrderResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AdjustmentOrderResult", 7)?;
        state.serialize_field("symbol", &self.symbol)?;
        state.serialize_field("instruction", &self.instruction)?;
        state.serialize_field("quantity", &self.quantity)?;
        state.serialize_field("price", &self.price)?;
        state.serialize_field("total_position_size", &self.total_position_size)?;
        state.serialize_field("status", &self.status())?;
        state.serialize_field("info", &self.info())?;
        state.end()
    }
}

/// Aggregated outcome of a batch, results in input order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub results: Vec<AdjustmentOrderResult>,
    pub counts: BTreeMap<AdjustmentStatus, usize>,
}

impl BatchOutcome {
    pub fn from_results(results: Vec<AdjustmentOrderResult>) -> Self {
        let mut counts: BTreeMap<AdjustmentStatus, usize> =
            AdjustmentStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for result in &results {
            *counts.entry(result.status()).or_insert(0) += 1;
        }
        Self { results, counts }
    }

    pub fn count(&self, status: AdjustmentStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// True when no symbol ended FAILED or IGNORED
    pub fn is_complete_success(&self) -> bool {
        self.count(AdjustmentStatus::Failed) == 0 && self.count(AdjustmentStatus::Ignored) == 0
    }

    /// 201 for a clean batch, 207 when outcomes are mixed
    pub fn http_status(&self) -> u16 {
        if self.is_complete_success() {
            201
        } else {
            207
        }
    }
}
