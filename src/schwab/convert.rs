//! Normalization between Schwab payloads and the shared order model

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use super::messages::{OrderInstrument, OrderLeg, OrderRequest, QuoteFields, SchwabPosition, SecuritiesAccount};
use crate::common::errors::{GatewayError, Result};
use crate::common::types::{AccountDetails, AssetType, NumericalOrder, Position, Quote};

impl From<&NumericalOrder> for OrderRequest {
    fn from(order: &NumericalOrder) -> Self {
        OrderRequest {
            order_type: order.order_type,
            session: order.session,
            duration: order.duration,
            order_strategy_type: order.strategy_type,
            price: if order.order_type.requires_price() {
                order.price
            } else {
                None
            },
            order_leg_collection: vec![OrderLeg {
                instruction: order.instruction,
                quantity: order.quantity,
                instrument: OrderInstrument {
                    symbol: order.symbol.clone(),
                    asset_type: order.asset_type,
                },
            }],
        }
    }
}

impl TryFrom<&OrderRequest> for NumericalOrder {
    type Error = GatewayError;

    /// Only single-leg orders map back
    fn try_from(request: &OrderRequest) -> Result<Self> {
        let [leg] = request.order_leg_collection.as_slice() else {
            return Err(GatewayError::InvalidRequest(format!(
                "expected exactly one order leg, got {}",
                request.order_leg_collection.len()
            )));
        };

        Ok(NumericalOrder {
            symbol: leg.instrument.symbol.clone(),
            instruction: leg.instruction,
            quantity: leg.quantity,
            price: request.price,
            order_type: request.order_type,
            duration: request.duration,
            session: request.session,
            asset_type: leg.instrument.asset_type,
            strategy_type: request.order_strategy_type,
        })
    }
}

fn parse_asset_type(raw: Option<&str>) -> AssetType {
    match raw {
        Some("OPTION") => AssetType::Option,
        Some("MUTUAL_FUND") => AssetType::MutualFund,
        Some("FIXED_INCOME") => AssetType::FixedIncome,
        Some("CASH_EQUIVALENT") => AssetType::CashEquivalent,
        _ => AssetType::Equity,
    }
}

fn balance(balances: &std::collections::BTreeMap<String, serde_json::Value>, key: &str) -> Option<Decimal> {
    match balances.get(key)? {
        serde_json::Value::Number(n) => n.to_string().parse().ok(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Total account value used to compute position weights
pub fn liquidation_value(account: &SecuritiesAccount) -> Option<Decimal> {
    balance(&account.current_balances, "liquidationValue").filter(|v| !v.is_zero())
}

/// Signed position: long minus short quantity
///
/// Wire values too large for a `Decimal` saturate rather than panic.
pub fn position_from_wire(position: &SchwabPosition, account_value: Option<Decimal>) -> Position {
    let quantity = position.long_quantity.saturating_sub(position.short_quantity);
    let account_fraction = account_value
        .and_then(|total| position.market_value.checked_div(total))
        .unwrap_or(Decimal::ZERO);

    Position {
        symbol: position.instrument.symbol.clone(),
        asset_type: parse_asset_type(position.instrument.asset_type.as_deref()),
        quantity,
        market_value: position.market_value,
        entry_value: position.average_price.saturating_mul(quantity.abs()),
        net_change: position.instrument.net_change.unwrap_or(Decimal::ZERO),
        account_fraction,
    }
}

/// Positions of an account, optionally restricted to `symbols`
pub fn positions_from_account(account: &SecuritiesAccount, symbols: Option<&[String]>) -> Vec<Position> {
    let account_value = liquidation_value(account);
    account
        .positions
        .iter()
        .filter(|p| match symbols {
            Some(filter) => filter.iter().any(|s| s.eq_ignore_ascii_case(&p.instrument.symbol)),
            None => true,
        })
        .map(|p| position_from_wire(p, account_value))
        .collect()
}

fn quote_time(millis: Option<i64>) -> DateTime<Utc> {
    millis
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or_else(Utc::now)
}

/// Quote from the wire fields; `None` when no price is quoted at all.
///
/// Price falls back from last trade to mark to previous close.
pub fn quote_from_wire(symbol: &str, fields: &QuoteFields) -> Option<Quote> {
    let price = fields.last_price.or(fields.mark).or(fields.close_price)?;
    Some(Quote {
        symbol: symbol.to_string(),
        price,
        quote_time: quote_time(fields.quote_time),
        total_volume: fields.total_volume.unwrap_or(0),
        net_percent_change: fields.net_percent_change.unwrap_or(Decimal::ZERO),
        bid_price: fields.bid_price.unwrap_or(Decimal::ZERO),
        ask_price: fields.ask_price.unwrap_or(Decimal::ZERO),
    })
}

pub fn account_details_from_wire(account: SecuritiesAccount) -> AccountDetails {
    AccountDetails {
        account_type: account.account_type,
        current_balances: account.current_balances,
        initial_balances: account.initial_balances,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{Instruction, OrderType};
    use crate::schwab::messages::SchwabInstrument;
    use rust_decimal_macros::dec;

    fn wire_position(long: Decimal, short: Decimal) -> SchwabPosition {
        SchwabPosition {
            long_quantity: long,
            short_quantity: short,
            average_price: dec!(100),
            market_value: dec!(2500),
            current_day_profit_loss: None,
            instrument: SchwabInstrument {
                symbol: "AAPL".to_string(),
                asset_type: Some("EQUITY".to_string()),
                cusip: None,
                description: None,
                net_change: Some(dec!(1.5)),
            },
        }
    }

    #[test]
    fn test_short_position_is_negative() {
        let position = position_from_wire(&wire_position(dec!(0), dec!(20)), None);
        assert_eq!(position.quantity, dec!(-20));
        assert_eq!(position.entry_value, dec!(2000));
        assert_eq!(position.account_fraction, dec!(0));
    }

    #[test]
    fn test_account_fraction_from_liquidation_value() {
        let position = position_from_wire(&wire_position(dec!(25), dec!(0)), Some(dec!(10000)));
        assert_eq!(position.account_fraction, dec!(0.25));
        assert_eq!(position.net_change, dec!(1.5));
    }

    #[test]
    fn test_oversized_wire_values_saturate() {
        let mut wire = wire_position(Decimal::MAX, dec!(0));
        wire.average_price = dec!(2);
        wire.market_value = Decimal::MAX;
        let position = position_from_wire(&wire, Some(dec!(0.5)));
        assert_eq!(position.quantity, Decimal::MAX);
        assert_eq!(position.entry_value, Decimal::MAX);
        assert_eq!(position.account_fraction, Decimal::ZERO);
    }

    #[test]
    fn test_quote_price_fallbacks() {
        let fields = QuoteFields {
            mark: Some(dec!(10.5)),
            close_price: Some(dec!(10)),
            quote_time: Some(1_704_067_200_000),
            ..Default::default()
        };
        let quote = quote_from_wire("AAPL", &fields).unwrap();
        assert_eq!(quote.price, dec!(10.5));
        assert_eq!(quote.quote_time.timestamp(), 1_704_067_200);

        assert!(quote_from_wire("AAPL", &QuoteFields::default()).is_none());
    }

    #[test]
    fn test_order_round_trip() {
        let order = NumericalOrder::limit("MSFT", Instruction::SellShort, dec!(3.5), dec!(410));
        let wire = OrderRequest::from(&order);
        let back = NumericalOrder::try_from(&wire).unwrap();
        assert_eq!(back, order);
    }

    #[test]
    fn test_market_order_drops_price_on_the_wire() {
        let mut order = NumericalOrder::market("MSFT", Instruction::Buy, dec!(1));
        order.price = Some(dec!(400));
        let wire = OrderRequest::from(&order);
        assert_eq!(wire.price, None);
        assert_eq!(wire.order_type, OrderType::Market);
    }

    #[test]
    fn test_multi_leg_orders_do_not_convert() {
        let order = NumericalOrder::market("MSFT", Instruction::Buy, dec!(1));
        let mut wire = OrderRequest::from(&order);
        wire.order_leg_collection.push(wire.order_leg_collection[0].clone());
        assert!(NumericalOrder::try_from(&wire).is_err());
    }
}
