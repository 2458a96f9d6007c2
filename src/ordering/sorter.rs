use std::str::FromStr;

use crate::common::errors::{GatewayError, Result};
use crate::common::types::{Instruction, NumericalOrder};

/// Execution order that releases cash before spending it
pub const DEFAULT_INSTRUCTION_ORDER: [Instruction; 4] = [
    Instruction::Sell,
    Instruction::SellShort,
    Instruction::BuyToCover,
    Instruction::Buy,
];

/// Position of `instruction` in [`DEFAULT_INSTRUCTION_ORDER`]
pub fn execution_rank(instruction: Instruction) -> usize {
    match instruction {
        Instruction::Sell => 0,
        Instruction::SellShort => 1,
        Instruction::BuyToCover => 2,
        Instruction::Buy => 3,
    }
}

/// Stable sort of `orders` by where `key(order)` sits in `priority`.
///
/// Orders whose key is not listed fail the whole sort with
/// [`GatewayError::UnknownAttribute`].
pub fn sort_for_execution<T, K, F>(orders: Vec<T>, key: F, priority: &[K]) -> Result<Vec<T>>
where
    F: Fn(&T) -> K,
    K: PartialEq + std::fmt::Display,
{
    let mut ranked = Vec::with_capacity(orders.len());
    for order in orders {
        let value = key(&order);
        let rank = priority
            .iter()
            .position(|p| *p == value)
            .ok_or_else(|| GatewayError::UnknownAttribute {
                value: value.to_string(),
            })?;
        ranked.push((rank, order));
    }

    ranked.sort_by_key(|(rank, _)| *rank);
    Ok(ranked.into_iter().map(|(_, order)| order).collect())
}

/// Sells first, then short sales, covers, and buys; ties keep input order
pub fn sort_by_instruction<T, F>(mut orders: Vec<T>, instruction: F) -> Vec<T>
where
    F: Fn(&T) -> Instruction,
{
    orders.sort_by_key(|order| execution_rank(instruction(order)));
    orders
}

/// Order field that can drive a sort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAttribute {
    Instruction,
    OrderType,
    Duration,
    Session,
}

impl OrderAttribute {
    /// Wire name of this attribute's value on `order`
    pub fn value_of(&self, order: &NumericalOrder) -> &'static str {
        match self {
            OrderAttribute::Instruction => order.instruction.as_str(),
            OrderAttribute::OrderType => order.order_type.as_str(),
            OrderAttribute::Duration => order.duration.as_str(),
            OrderAttribute::Session => order.session.as_str(),
        }
    }

    /// Default priority for this attribute, if it has one
    pub fn default_priority(&self) -> Option<Vec<String>> {
        match self {
            OrderAttribute::Instruction => Some(
                DEFAULT_INSTRUCTION_ORDER
                    .iter()
                    .map(|i| i.as_str().to_string())
                    .collect(),
            ),
            _ => None,
        }
    }
}

impl FromStr for OrderAttribute {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instruction" => Ok(OrderAttribute::Instruction),
            "order_type" | "ordertype" => Ok(OrderAttribute::OrderType),
            "duration" => Ok(OrderAttribute::Duration),
            "session" => Ok(OrderAttribute::Session),
            other => Err(GatewayError::UnknownAttribute {
                value: other.to_string(),
            }),
        }
    }
}

/// Sort orders by a named attribute against a caller-given priority.
///
/// Priority values match case-insensitively.
pub fn sort_orders(
    orders: Vec<NumericalOrder>,
    attribute: OrderAttribute,
    priority: &[String],
) -> Result<Vec<NumericalOrder>> {
    let priority: Vec<String> = priority.iter().map(|p| p.to_ascii_uppercase()).collect();
    sort_for_execution(orders, |o| attribute.value_of(o).to_string(), &priority)
}
