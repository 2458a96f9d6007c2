//! Trait definitions for the brokerage collaborators
//!
//! The order logic only ever talks to the brokerage through these narrow
//! interfaces, so the live client, the local in-memory brokerage and test
//! doubles are interchangeable.

use async_trait::async_trait;

use super::errors::Result;
use super::types::{AccountDetails, AccountId, NumericalOrder, Position, Quote, SubmissionReceipt};

/// Source of current holdings
#[async_trait]
pub trait PositionProvider: Send + Sync {
    /// Fetch current positions for an account
    ///
    /// # Arguments
    /// * `account` - Account to read
    /// * `symbols` - Optional filter; `None` returns every holding
    async fn fetch_positions(
        &self,
        account: &AccountId,
        symbols: Option<&[String]>,
    ) -> Result<Vec<Position>>;
}

/// Source of current prices
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetch quotes for the given symbols; unknown symbols are omitted
    async fn fetch_quotes(&self, account: &AccountId, symbols: &[String]) -> Result<Vec<Quote>>;
}

/// Order submission boundary
///
/// Implementations serialize or rate-limit submissions for a single account.
/// An `Err` means the brokerage could not be reached or answered with
/// something unusable; a refusal it did communicate comes back as a
/// receipt with `accepted == false`.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn submit_order(
        &self,
        account: &AccountId,
        order: &NumericalOrder,
    ) -> Result<SubmissionReceipt>;
}

/// Source of coarse account-level balances
#[async_trait]
pub trait AccountStatusProvider: Send + Sync {
    async fn fetch_account_status(&self, account: &AccountId) -> Result<AccountDetails>;
}

/// Everything a full brokerage connection offers
pub trait Brokerage:
    PositionProvider + QuoteProvider + OrderGateway + AccountStatusProvider
{
    /// The account this connection trades by default
    fn default_account(&self) -> &AccountId;

    /// Human-readable brokerage name
    fn brokerage_name(&self) -> &'static str;
}
