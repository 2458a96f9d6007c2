//! Configuration types

use serde::{Deserialize, Serialize};

use crate::adjustment::SafetyLimits;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Brokerage connection configuration
    #[serde(default)]
    pub brokerage: BrokerageConfig,
    /// Per-order safety limits
    #[serde(default)]
    pub safety: SafetyLimits,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// Schwab brokerage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerageConfig {
    /// Application key from the developer portal
    #[serde(default)]
    pub app_key: String,
    /// Application secret from the developer portal
    #[serde(default)]
    pub app_secret: String,
    /// Long-lived refresh token (expires after seven days)
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Short-lived access token, if one is already at hand
    #[serde(default)]
    pub access_token: Option<String>,
    /// Base URL for the trader (accounts/orders) API
    #[serde(default = "default_trader_url")]
    pub trader_url: String,
    /// Base URL for the market data API
    #[serde(default = "default_market_data_url")]
    pub market_data_url: String,
    /// OAuth token endpoint
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Trade the first linked account instead of `account_number`
    #[serde(default = "default_true")]
    pub use_default_trading_account: bool,
    /// Account number to trade when not using the default account
    #[serde(default)]
    pub account_number: Option<String>,
    /// Serve sample data from an in-memory brokerage
    #[serde(default)]
    pub local_mode: bool,
    /// Refuse every order submission
    #[serde(default)]
    pub read_only_mode: bool,
    /// Minimum spacing between two order submissions in milliseconds
    #[serde(default)]
    pub submit_interval_ms: u64,
}

impl Default for BrokerageConfig {
    fn default() -> Self {
        Self {
            app_key: String::new(),
            app_secret: String::new(),
            refresh_token: None,
            access_token: None,
            trader_url: default_trader_url(),
            market_data_url: default_market_data_url(),
            token_url: default_token_url(),
            use_default_trading_account: true,
            account_number: None,
            local_mode: false,
            read_only_mode: false,
            submit_interval_ms: 0,
        }
    }
}

fn default_trader_url() -> String {
    "https://api.schwabapi.com/trader/v1".to_string()
}

fn default_market_data_url() -> String {
    "https://api.schwabapi.com/marketdata/v1".to_string()
}

fn default_token_url() -> String {
    "https://api.schwabapi.com/v1/oauth/token".to_string()
}

fn default_true() -> bool {
    true
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// How long account status lookups are served from cache
    #[serde(default = "default_account_status_ttl")]
    pub account_status_ttl_seconds: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            request_timeout_seconds: default_request_timeout(),
            account_status_ttl_seconds: default_account_status_ttl(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_account_status_ttl() -> u64 {
    60
}

/// OAuth application credentials
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub app_key: String,
    pub app_secret: String,
}

impl ApiCredentials {
    pub fn new(app_key: String, app_secret: String) -> Self {
        Self { app_key, app_secret }
    }

    /// Credentials from config, if both halves are present
    pub fn from_config(config: &BrokerageConfig) -> Option<Self> {
        if config.app_key.is_empty() || config.app_secret.is_empty() {
            return None;
        }
        Some(Self::new(config.app_key.clone(), config.app_secret.clone()))
    }
}
