//! Per-order safety limits
//!
//! Checked after sizing and before any submission, in preview too, so a
//! preview never shows an order the gateway would refuse.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::types::{Instruction, NumericalOrder, Quote};

/// Configured limits every order must respect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyLimits {
    /// Largest dollar value of any single order
    #[serde(default)]
    pub max_dollar_trade_size: Option<Decimal>,
    /// Largest dollar value of a sell
    #[serde(default)]
    pub max_dollar_sell_size: Option<Decimal>,
    /// Largest dollar value of a buy
    #[serde(default)]
    pub max_dollar_buy_size: Option<Decimal>,
    #[serde(default = "default_allow_short_sales")]
    pub allow_short_sales: bool,
    /// Minimum daily volume a symbol must show, zero disables the check
    #[serde(default)]
    pub minimum_trading_volume: u64,
    /// Symbols that may never be traded
    #[serde(default)]
    pub restricted_securities: Vec<String>,
}

fn default_allow_short_sales() -> bool {
    true
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            max_dollar_trade_size: None,
            max_dollar_sell_size: None,
            max_dollar_buy_size: None,
            allow_short_sales: true,
            minimum_trading_volume: 0,
            restricted_securities: Vec::new(),
        }
    }
}

/// A broken safety limit
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SafetyViolation {
    #[error("{0} is a restricted security")]
    RestrictedSecurity(String),

    #[error("Short sales are not allowed")]
    ShortSaleNotAllowed,

    #[error("Trading volume {volume} is below the minimum of {minimum}")]
    InsufficientVolume { volume: u64, minimum: u64 },

    #[error("Order value {notional} exceeds the maximum trade size of {limit}")]
    TradeSizeExceeded { notional: Decimal, limit: Decimal },

    #[error("Order value {notional} exceeds the maximum sell size of {limit}")]
    SellSizeExceeded { notional: Decimal, limit: Decimal },

    #[error("Order value {notional} exceeds the maximum buy size of {limit}")]
    BuySizeExceeded { notional: Decimal, limit: Decimal },

    #[error("Order value cannot be determined without a price")]
    MissingPrice,

    #[error("Order value of {quantity} at {price} is out of range")]
    ValueOutOfRange { quantity: Decimal, price: Decimal },
}

impl SafetyLimits {
    fn has_dollar_limits(&self) -> bool {
        self.max_dollar_trade_size.is_some()
            || self.max_dollar_sell_size.is_some()
            || self.max_dollar_buy_size.is_some()
    }

    /// Check one order against every limit, first violation wins.
    pub fn check(&self, order: &NumericalOrder, quote: Option<&Quote>) -> Result<(), SafetyViolation> {
        if self
            .restricted_securities
            .iter()
            .any(|s| s.eq_ignore_ascii_case(&order.symbol))
        {
            return Err(SafetyViolation::RestrictedSecurity(order.symbol.clone()));
        }

        if !self.allow_short_sales && order.instruction == Instruction::SellShort {
            return Err(SafetyViolation::ShortSaleNotAllowed);
        }

        if self.minimum_trading_volume > 0 {
            let volume = quote.map(|q| q.total_volume).unwrap_or(0);
            if volume < self.minimum_trading_volume {
                return Err(SafetyViolation::InsufficientVolume {
                    volume,
                    minimum: self.minimum_trading_volume,
                });
            }
        }

        if !self.has_dollar_limits() {
            return Ok(());
        }

        let price = order
            .price
            .or(quote.map(|q| q.price))
            .ok_or(SafetyViolation::MissingPrice)?;
        let notional = order
            .notional(Some(price))
            .ok_or(SafetyViolation::ValueOutOfRange {
                quantity: order.quantity,
                price,
            })?;

        if let Some(limit) = self.max_dollar_trade_size {
            if notional > limit {
                return Err(SafetyViolation::TradeSizeExceeded { notional, limit });
            }
        }

        if order.instruction.is_sell() {
            if let Some(limit) = self.max_dollar_sell_size {
                if notional > limit {
                    return Err(SafetyViolation::SellSizeExceeded { notional, limit });
                }
            }
        } else if let Some(limit) = self.max_dollar_buy_size {
            if notional > limit {
                return Err(SafetyViolation::BuySizeExceeded { notional, limit });
            }
        }

        Ok(())
    }
}
