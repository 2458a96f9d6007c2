//! Schwab brokerage connection bound to one trading account

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::{info, instrument, warn};

use super::convert::{account_details_from_wire, positions_from_account, quote_from_wire};
use super::messages::{AccountNumberHash, OrderRequest};
use super::rest::SchwabRestClient;
use crate::common::errors::{GatewayError, Result};
use crate::common::traits::{
    AccountStatusProvider, Brokerage, OrderGateway, PositionProvider, QuoteProvider,
};
use crate::common::types::{AccountDetails, AccountId, NumericalOrder, Position, Quote, SubmissionReceipt};
use crate::config::types::{ApiCredentials, BrokerageConfig};

/// Live Schwab connection
///
/// Order submissions for the account go out one at a time, spaced by at
/// least `submit_interval`.
pub struct SchwabClient {
    /// REST API client
    rest_client: SchwabRestClient,
    /// Hashed account number used in API paths
    account: AccountId,
    /// Refuse every submission
    read_only: bool,
    /// Minimum spacing between submissions
    submit_interval: Duration,
    /// When the last submission went out
    last_submit: Mutex<Option<Instant>>,
}

/// Pick the account to trade from the linked accounts
pub fn select_account(
    accounts: &[AccountNumberHash],
    use_default: bool,
    account_number: Option<&str>,
) -> Result<AccountId> {
    let selected = if use_default {
        accounts.first()
    } else {
        let wanted = account_number.ok_or_else(|| {
            GatewayError::Configuration(
                "an account number is required when not using the default trading account"
                    .to_string(),
            )
        })?;
        accounts.iter().find(|a| a.account_number == wanted)
    };

    selected
        .map(|a| AccountId::new(a.hash_value.clone()))
        .ok_or_else(|| {
            GatewayError::AccountNotFound(account_number.unwrap_or("default").to_string())
        })
}

impl SchwabClient {
    /// Client for an already-known account hash
    pub fn new(rest_client: SchwabRestClient, account: AccountId, config: &BrokerageConfig) -> Self {
        Self {
            rest_client,
            account,
            read_only: config.read_only_mode,
            submit_interval: Duration::from_millis(config.submit_interval_ms),
            last_submit: Mutex::new(None),
        }
    }

    /// Build the REST client, obtain a token and resolve the trading account
    #[instrument(skip(config))]
    pub async fn connect(config: &BrokerageConfig, timeout: Duration) -> Result<Self> {
        let mut rest_client = SchwabRestClient::with_timeout(
            &config.trader_url,
            &config.market_data_url,
            &config.token_url,
            timeout,
        )?;

        if let Some(credentials) = ApiCredentials::from_config(config) {
            rest_client = rest_client.with_credentials(credentials);
        }
        if let Some(token) = &config.access_token {
            rest_client = rest_client.with_access_token(token.clone());
        } else if let Some(refresh_token) = &config.refresh_token {
            rest_client.refresh_access_token(refresh_token).await?;
        } else {
            return Err(GatewayError::Configuration(
                "either an access token or a refresh token is required".to_string(),
            ));
        }

        let accounts = rest_client.get_account_numbers().await?;
        let account = select_account(
            &accounts,
            config.use_default_trading_account,
            config.account_number.as_deref(),
        )?;
        info!(
            linked_accounts = accounts.len(),
            read_only = config.read_only_mode,
            "Connected to Schwab"
        );

        Ok(Self::new(rest_client, account, config))
    }

    /// Get a reference to the REST client
    pub fn rest(&self) -> &SchwabRestClient {
        &self.rest_client
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

#[async_trait]
impl PositionProvider for SchwabClient {
    #[instrument(skip(self))]
    async fn fetch_positions(
        &self,
        account: &AccountId,
        symbols: Option<&[String]>,
    ) -> Result<Vec<Position>> {
        let response = self.rest_client.get_account(account.as_str(), true).await?;
        Ok(positions_from_account(&response.securities_account, symbols))
    }
}

#[async_trait]
impl QuoteProvider for SchwabClient {
    #[instrument(skip(self, _account))]
    async fn fetch_quotes(&self, _account: &AccountId, symbols: &[String]) -> Result<Vec<Quote>> {
        let quotes = self.rest_client.get_quotes(symbols).await?;
        Ok(symbols
            .iter()
            .filter_map(|symbol| {
                let fields = quotes.get(symbol)?.quote.as_ref()?;
                quote_from_wire(symbol, fields)
            })
            .collect())
    }
}

#[async_trait]
impl OrderGateway for SchwabClient {
    #[instrument(skip(self, order), fields(symbol = %order.symbol, instruction = %order.instruction))]
    async fn submit_order(
        &self,
        account: &AccountId,
        order: &NumericalOrder,
    ) -> Result<SubmissionReceipt> {
        if self.read_only {
            warn!("Order refused in read-only mode");
            return Err(GatewayError::ReadOnly);
        }

        let mut last_submit = self.last_submit.lock().await;
        if let Some(previous) = *last_submit {
            sleep_until(previous + self.submit_interval).await;
        }

        let request = OrderRequest::from(order);
        let receipt = self.rest_client.place_order(account.as_str(), &request).await;
        *last_submit = Some(Instant::now());
        receipt
    }
}

#[async_trait]
impl AccountStatusProvider for SchwabClient {
    async fn fetch_account_status(&self, account: &AccountId) -> Result<AccountDetails> {
        let account = self.rest_client.get_account_details(account.as_str()).await?;
        Ok(account_details_from_wire(account))
    }
}

impl Brokerage for SchwabClient {
    fn default_account(&self) -> &AccountId {
        &self.account
    }

    fn brokerage_name(&self) -> &'static str {
        "Schwab"
    }
}
