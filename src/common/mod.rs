//! Types, traits and helpers shared across the crate

pub mod errors;
pub mod math;
pub mod traits;
pub mod types;
