//! Execution ordering for batches of orders
//!
//! Sells settle cash that later buys spend, so a batch is submitted in
//! [`DEFAULT_INSTRUCTION_ORDER`] unless the caller asks for something else.
//! All sorts are stable.

mod sorter;

pub use sorter::{
    execution_rank,
    sort_by_instruction,
    sort_for_execution,
    sort_orders,
    OrderAttribute,
    DEFAULT_INSTRUCTION_ORDER,
};
