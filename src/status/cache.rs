//! Time-bounded cache and the cached account status lookup

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::common::errors::Result;
use crate::common::traits::AccountStatusProvider;
use crate::common::types::{AccountDetails, AccountId};

/// Default lifetime of a cached account status
pub const DEFAULT_STATUS_TTL: Duration = Duration::from_secs(60);

struct Entry<V> {
    value: V,
    fetched_at: Instant,
}

/// Map whose entries expire `ttl` after they were fetched
///
/// Expired entries are replaced on the next lookup. Concurrent misses for
/// the same key may fetch more than once; the last write wins.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh cached value for `key`, if any
    pub async fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    pub async fn insert(&self, key: K, value: V) {
        self.entries.write().await.insert(
            key,
            Entry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    pub async fn invalidate(&self, key: &K) {
        self.entries.write().await.remove(key);
    }

    /// Cached value for `key`, or the result of `fetch` stored under it.
    /// Failed fetches are not cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &K, fetch: F) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }
        let value = fetch().await?;
        self.insert(key.clone(), value.clone()).await;
        Ok(value)
    }
}

/// Account status lookups served through a [`TtlCache`]
pub struct AccountStatusService {
    provider: Arc<dyn AccountStatusProvider>,
    cache: TtlCache<AccountId, AccountDetails>,
}

impl AccountStatusService {
    pub fn new(provider: Arc<dyn AccountStatusProvider>) -> Self {
        Self::with_ttl(provider, DEFAULT_STATUS_TTL)
    }

    pub fn with_ttl(provider: Arc<dyn AccountStatusProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            cache: TtlCache::new(ttl),
        }
    }

    /// Account status, at most one TTL old
    pub async fn status(&self, account: &AccountId) -> Result<AccountDetails> {
        self.cache
            .get_or_fetch(account, || async {
                debug!(account = %account, "Account status cache miss");
                self.provider.fetch_account_status(account).await
            })
            .await
    }

    /// Drop the cached status so the next lookup refetches
    pub async fn invalidate(&self, account: &AccountId) {
        self.cache.invalidate(account).await;
    }
}
