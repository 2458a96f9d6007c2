//! HTTP surface
//!
//! A thin axum layer over the brokerage, the adjustment engine, the
//! allocation optimizer and the order sorter. Every success body is wrapped
//! in an [`Envelope`]; every error is `{ "detail": ... }`.

pub mod api_types;
pub mod routes;
pub mod state;

pub use api_types::Envelope;
pub use routes::{build_router, ApiError};
pub use state::AppState;
