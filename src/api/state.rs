//! Shared state handed to every HTTP handler.

use std::sync::Arc;
use std::time::Duration;

use crate::adjustment::{AdjustmentEngine, SafetyLimits};
use crate::common::traits::{AccountStatusProvider, Brokerage};
use crate::status::AccountStatusService;

pub struct AppState {
    pub brokerage: Arc<dyn Brokerage>,
    pub engine: AdjustmentEngine,
    pub limits: SafetyLimits,
    /// Refuse non-preview adjustments before they reach the engine
    pub read_only: bool,
    pub status: AccountStatusService,
}

impl AppState {
    pub fn new<B: Brokerage + 'static>(
        brokerage: Arc<B>,
        limits: SafetyLimits,
        read_only: bool,
        status_ttl: Duration,
    ) -> Self {
        let status_provider: Arc<dyn AccountStatusProvider> = brokerage.clone();
        Self {
            engine: AdjustmentEngine::from_brokerage(brokerage.clone()),
            status: AccountStatusService::with_ttl(status_provider, status_ttl),
            brokerage,
            limits,
            read_only,
        }
    }
}
