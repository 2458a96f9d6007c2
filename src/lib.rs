//! Clearinghouse Library
//!
//! An order gateway in front of a brokerage account: adjusts holdings by
//! fraction, previews and sequences orders, and picks discrete allocations
//! that track target weights under a capital cap.

pub mod adjustment;
pub mod allocation;
pub mod api;
pub mod common;
pub mod config;
pub mod ordering;
pub mod schwab;
pub mod status;

// Re-export commonly used types
pub use adjustment::{
    AdjustOptions, AdjustmentEngine, AdjustmentOrderResult, AdjustmentRequest, AdjustmentStatus,
    BatchOutcome, SafetyLimits,
};
pub use allocation::{find_minimum_error, AllocationProblem, AllocationSolution};
pub use common::errors::{GatewayError, Result};
pub use common::math::{apply_rounding, rmse};
pub use common::traits::{
    AccountStatusProvider, Brokerage, OrderGateway, PositionProvider, QuoteProvider,
};
pub use common::types::{
    AccountId, Instruction, NumericalOrder, OrderType, Position, Quote, SubmissionReceipt,
};
pub use config::types::AppConfig;
pub use ordering::{sort_orders, OrderAttribute};
pub use schwab::{LocalBrokerage, SchwabClient, SchwabRestClient};
pub use status::{AccountStatusService, TtlCache};
