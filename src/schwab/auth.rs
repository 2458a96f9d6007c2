//! OAuth helpers for the Schwab API

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::common::errors::{GatewayError, Result};
use crate::config::types::ApiCredentials;

/// `Authorization` header value for the token endpoint
///
/// The token endpoint authenticates the application itself with HTTP Basic
/// auth over `app_key:app_secret`.
pub fn basic_auth_header(credentials: &ApiCredentials) -> String {
    let raw = format!("{}:{}", credentials.app_key, credentials.app_secret);
    format!("Basic {}", BASE64.encode(raw.as_bytes()))
}

/// Form body that trades a refresh token for a new access token
pub fn refresh_form(refresh_token: &str) -> Result<[(&'static str, String); 2]> {
    if refresh_token.trim().is_empty() {
        return Err(GatewayError::Authentication(
            "refresh token is empty".to_string(),
        ));
    }
    Ok([
        ("grant_type", "refresh_token".to_string()),
        ("refresh_token", refresh_token.to_string()),
    ])
}
