//! Request and response bodies for the HTTP endpoints.
//!
//! No business logic lives here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::types::{AccountDetails, NumericalOrder};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
}

/// Every successful body: `{ "meta": { "type", "timestamp" }, "data" }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub meta: Meta,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(kind: &str, data: T) -> Self {
        Self {
            meta: Meta {
                kind: kind.to_string(),
                timestamp: Utc::now(),
            },
            data,
        }
    }
}

/// Body of every error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

// ---------------------------------------------------------------------------
// Query strings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionsQuery {
    /// Comma-separated symbol filter
    #[serde(default)]
    pub symbols: Option<String>,
}

impl PositionsQuery {
    /// Requested symbols, or `None` for every holding
    pub fn symbol_list(&self) -> Option<Vec<String>> {
        let symbols: Vec<String> = self
            .symbols
            .as_deref()?
            .split(',')
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            None
        } else {
            Some(symbols)
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AdjustmentQuery {
    #[serde(default)]
    pub preview: bool,
    #[serde(default)]
    pub round_down: bool,
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// `POST /v1/orders/sequence`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceRequest {
    pub orders: Vec<NumericalOrder>,
    /// Attribute to sort on, `instruction` when absent
    #[serde(default)]
    pub attribute: Option<String>,
    /// Priority of attribute values, the attribute's default when absent
    #[serde(default)]
    pub priority: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStatusResponse {
    pub brokerage: String,
    pub read_only: bool,
    #[serde(flatten)]
    pub details: AccountDetails,
}
