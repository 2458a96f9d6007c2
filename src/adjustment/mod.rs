//! Fractional position adjustments
//!
//! A request says "change my AAPL holding by +50%"; the engine turns that
//! into a concrete share order against the current position.
//!
//! # Flow
//!
//! ```text
//! AdjustmentRequest
//!       │
//!       ▼
//! PositionProvider ──► no holding? ─────────────► FAILED  "No existing position"
//!       │
//!       ▼
//! size_adjustment()  target = current × (1 + adjustment)
//!       │
//!       ├── delta == 0 ─────────────────────────► IGNORED
//!       ▼
//! QuoteProvider ──► no quote? ──────────────────► FAILED  "Quote unavailable"
//!       │
//!       ▼
//! SafetyLimits::check() ──► violation? ─────────► FAILED  <violation>
//!       │
//!       ├── preview ────────────────────────────► PREVIEW
//!       ▼
//! OrderGateway (sells first in a batch) ────────► SUCCEEDED | FAILED "Misc. failure"
//! ```
//!
//! # Components
//!
//! - [`AdjustmentEngine`]: runs single and batch adjustments
//! - [`AdjustmentRequest`]: validated input for one symbol
//! - [`AdjustmentOrderResult`]: what happened to one symbol
//! - [`BatchOutcome`]: results plus per-status counts
//! - [`SafetyLimits`]: per-order guard rails

mod engine;
mod safety;
mod types;

pub use engine::{size_adjustment, AdjustmentEngine, Sizing};

pub use safety::{SafetyLimits, SafetyViolation};

pub use types::{
    AdjustOptions,
    AdjustmentOrderResult,
    AdjustmentOutcome,
    AdjustmentRequest,
    AdjustmentStatus,
    BatchOutcome,
    FailureReason,
};
