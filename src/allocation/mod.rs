//! Discrete allocation under a capital cap
//!
//! Each symbol can only be ordered in a few achievable sizes (lot sizes,
//! fractional-share limits). [`find_minimum_error`] picks one size per
//! symbol so the combination tracks the targets as closely as possible
//! without spending more than the cap.

mod optimizer;

pub use optimizer::{
    find_minimum_error,
    AllocationChoice,
    AllocationEntry,
    AllocationProblem,
    AllocationSolution,
};
