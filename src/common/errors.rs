//! Error types for the application

use thiserror::Error;

/// Result type alias using our GatewayError
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Invalid API response
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// The brokerage refused an order
    #[error("Order rejected with status {status}: {detail}")]
    OrderRejected { status: u16, detail: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No linked account matches the request
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Write attempted while the gateway runs read-only
    #[error("Clearinghouse is in read-only mode.")]
    ReadOnly,

    /// Caller input failed validation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// An order carries an attribute value missing from the priority list
    #[error("Unknown attribute value: {value}")]
    UnknownAttribute { value: String },

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<tokio::time::error::Elapsed> for GatewayError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        GatewayError::Timeout(err.to_string())
    }
}

impl GatewayError {
    /// True when the brokerage could not be reached at all (as opposed to
    /// having answered with a refusal).
    pub fn is_transport(&self) -> bool {
        match self {
            GatewayError::HttpRequest(err) => err.is_connect() || err.is_timeout(),
            GatewayError::Timeout(_) => true,
            _ => false,
        }
    }
}
