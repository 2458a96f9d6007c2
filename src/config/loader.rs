//! Configuration loader

use config::{Config, Environment, File};
use std::path::Path;

use super::types::{AppConfig, BrokerageConfig};
use crate::common::errors::{GatewayError, Result};

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with APP_, nested with `__`)
/// 2. Configuration file (TOML format)
/// 3. Default values
///
/// `SCHWAB_*` variables are then layered onto the brokerage section.
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("APP")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("safety.restricted_securities")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| GatewayError::Configuration(e.to_string()))?;

    let mut app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| GatewayError::Configuration(e.to_string()))?;

    apply_schwab_env(&mut app_config.brokerage, |key| std::env::var(key).ok())?;
    Ok(app_config)
}

/// Load configuration from environment variables only
pub fn load_from_env() -> Result<AppConfig> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::default();
    apply_schwab_env(&mut config.brokerage, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Overlay `SCHWAB_*` variables onto the brokerage section
///
/// Empty values are ignored so a blank entry in `.env` never wipes a value
/// from the config file.
fn apply_schwab_env<F>(brokerage: &mut BrokerageConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("SCHWAB_APP_KEY") {
        brokerage.app_key = v;
    }
    if let Some(v) = get("SCHWAB_APP_SECRET") {
        brokerage.app_secret = v;
    }
    if let Some(v) = get("SCHWAB_REFRESH_TOKEN") {
        brokerage.refresh_token = Some(v);
    }
    if let Some(v) = get("SCHWAB_ACCESS_TOKEN") {
        brokerage.access_token = Some(v);
    }
    if let Some(v) = get("SCHWAB_ACCOUNT_NUMBER") {
        brokerage.account_number = Some(v);
    }
    if let Some(v) = get("SCHWAB_USE_DEFAULT_TRADING_ACCOUNT") {
        brokerage.use_default_trading_account = parse_flag("SCHWAB_USE_DEFAULT_TRADING_ACCOUNT", &v)?;
    }
    if let Some(v) = get("SCHWAB_LOCAL_MODE") {
        brokerage.local_mode = parse_flag("SCHWAB_LOCAL_MODE", &v)?;
    }
    if let Some(v) = get("SCHWAB_READ_ONLY_MODE") {
        brokerage.read_only_mode = parse_flag("SCHWAB_READ_ONLY_MODE", &v)?;
    }

    Ok(())
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(GatewayError::Configuration(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}
