//! Schwab module - brokerage adapter for the Schwab trader and market data APIs

pub mod auth;
pub mod client;
pub mod convert;
pub mod local;
pub mod messages;
pub mod rest;

pub use client::SchwabClient;
pub use local::LocalBrokerage;
pub use rest::SchwabRestClient;
