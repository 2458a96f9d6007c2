//! Account status lookups with a time-bounded cache
//!
//! Account balances change slowly compared to how often clients poll them,
//! so lookups are answered from memory for a configurable TTL. Nothing on
//! the order path reads through this cache.

mod cache;

pub use cache::{AccountStatusService, TtlCache, DEFAULT_STATUS_TTL};
