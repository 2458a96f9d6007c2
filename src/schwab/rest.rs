//! REST API client for the Schwab trader and market data APIs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use super::auth::{basic_auth_header, refresh_form};
use super::messages::*;
use crate::common::errors::{GatewayError, Result};
use crate::common::types::SubmissionReceipt;
use crate::config::types::ApiCredentials;

/// REST API client for Schwab
#[derive(Debug, Clone)]
pub struct SchwabRestClient {
    /// HTTP client
    client: Client,
    /// Base URL for accounts and orders
    trader_url: String,
    /// Base URL for quotes
    market_data_url: String,
    /// OAuth token endpoint
    token_url: String,
    /// Application credentials for token refresh
    credentials: Option<ApiCredentials>,
    /// Current bearer token, shared between clones
    access_token: Arc<RwLock<Option<String>>>,
}

impl SchwabRestClient {
    /// Create a new REST client
    pub fn new(trader_url: &str, market_data_url: &str, token_url: &str) -> Result<Self> {
        Self::with_timeout(trader_url, market_data_url, token_url, Duration::from_secs(30))
    }

    /// Create a new REST client with custom timeout
    pub fn with_timeout(
        trader_url: &str,
        market_data_url: &str,
        token_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            trader_url: trader_url.trim_end_matches('/').to_string(),
            market_data_url: market_data_url.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
            credentials: None,
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    /// Set application credentials used for token refresh
    pub fn with_credentials(mut self, credentials: ApiCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Seed the bearer token
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Arc::new(RwLock::new(Some(token.into())));
        self
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        match self.access_token.read().await.as_deref() {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(GatewayError::Authentication(
                "no access token available".to_string(),
            )),
        }
    }

    async fn error_for_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Authentication(format!(
                "Server returned status {}: {}",
                status, body
            )));
        }
        Err(GatewayError::InvalidResponse(format!(
            "Server returned status {}: {}",
            status, body
        )))
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Trade a refresh token for a fresh access token and keep it
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            GatewayError::Authentication("app key and secret are required to refresh tokens".to_string())
        })?;

        let response = self
            .client
            .post(&self.token_url)
            .header(reqwest::header::AUTHORIZATION, basic_auth_header(credentials))
            .form(&refresh_form(refresh_token)?)
            .send()
            .await?;
        let response = Self::error_for_status(response).await?;

        let token: TokenResponse = response.json().await?;
        *self.access_token.write().await = Some(token.access_token.clone());
        info!(expires_in = token.expires_in, "Access token refreshed");
        Ok(token)
    }

    // ========================================================================
    // Trader API
    // ========================================================================

    /// Linked accounts with their path hashes
    #[instrument(skip(self))]
    pub async fn get_account_numbers(&self) -> Result<Vec<AccountNumberHash>> {
        let url = format!("{}/accounts/accountNumbers", self.trader_url);
        debug!("Fetching account numbers from: {}", url);

        let response = self.authorized(self.client.get(&url)).await?.send().await?;
        let response = Self::error_for_status(response).await?;
        Ok(response.json().await?)
    }

    /// Account balances and, when `with_positions` is set, holdings
    #[instrument(skip(self))]
    pub async fn get_account(&self, account_hash: &str, with_positions: bool) -> Result<AccountResponse> {
        let url = format!("{}/accounts/{}", self.trader_url, account_hash);
        debug!("Fetching account from: {}", url);

        let mut request = self.client.get(&url);
        if with_positions {
            request = request.query(&[("fields", "positions")]);
        }

        let response = self.authorized(request).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::AccountNotFound(account_hash.to_string()));
        }
        let response = Self::error_for_status(response).await?;
        Ok(response.json().await?)
    }

    /// Positions of an account
    pub async fn get_positions(&self, account_hash: &str) -> Result<Vec<SchwabPosition>> {
        Ok(self.get_account(account_hash, true).await?.securities_account.positions)
    }

    /// Balances of an account, without positions
    pub async fn get_account_details(&self, account_hash: &str) -> Result<SecuritiesAccount> {
        Ok(self.get_account(account_hash, false).await?.securities_account)
    }

    /// Place an order.
    ///
    /// A refusal the API explains (4xx other than 401) comes back as a
    /// rejected receipt. The broker order id is the last segment of the
    /// `Location` header.
    #[instrument(skip(self, order))]
    pub async fn place_order(&self, account_hash: &str, order: &OrderRequest) -> Result<SubmissionReceipt> {
        let url = format!("{}/accounts/{}/orders", self.trader_url, account_hash);
        debug!("Placing order at: {}", url);

        let response = self
            .authorized(self.client.post(&url).json(order))
            .await?
            .send()
            .await?;
        let status = response.status();

        if status.is_success() {
            let order_id = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(order_id_from_location);
            return Ok(SubmissionReceipt::accepted(order_id));
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Authentication(body));
        }
        if status.is_client_error() {
            let detail = serde_json::from_str::<ApiErrorBody>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or(body);
            warn!(status = status.as_u16(), %detail, "Order refused by brokerage");
            return Ok(SubmissionReceipt::rejected(detail));
        }

        Err(GatewayError::OrderRejected {
            status: status.as_u16(),
            detail: body,
        })
    }

    // ========================================================================
    // Market Data API
    // ========================================================================

    /// Quotes keyed by symbol; unknown symbols are simply absent
    #[instrument(skip(self))]
    pub async fn get_quotes(&self, symbols: &[String]) -> Result<HashMap<String, AssetQuote>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }
        let url = format!("{}/quotes", self.market_data_url);
        debug!("Fetching quotes from: {}", url);

        let request = self
            .client
            .get(&url)
            .query(&[("symbols", symbols.join(",")), ("fields", "quote".to_string())]);
        let response = self.authorized(request).await?.send().await?;
        let response = Self::error_for_status(response).await?;
        Ok(response.json().await?)
    }
}

/// Broker order id from an order `Location` header, absolute or relative
pub fn order_id_from_location(location: &str) -> Option<String> {
    let id = match url::Url::parse(location) {
        Ok(url) => url.path_segments()?.filter(|s| !s.is_empty()).last()?.to_string(),
        Err(_) => location.trim_end_matches('/').rsplit('/').next()?.to_string(),
    };
    (!id.is_empty()).then_some(id)
}
