//! Consumer surface: the latest snapshot plus on-demand refresh and advisory.

pub mod analysis;
pub mod market;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::cache::AdvisoryCache;
use crate::market_api::{Advisor, MarketDataSource, MarketSnapshot, SnapshotAssembler};

pub const DEFAULT_ADVISORY_TIMEOUT: Duration = Duration::from_secs(60);

/// Holds the most recent [`MarketSnapshot`] and serves advisories for it.
///
/// The snapshot is replaced wholesale on every successful refresh, so readers
/// always see one coherent snapshot. A failed refresh keeps the previous one.
pub struct MarketHub<S, A> {
    assembler: SnapshotAssembler<S>,
    advisor: A,
    cache: Arc<AdvisoryCache>,
    latest: RwLock<Option<Arc<MarketSnapshot>>>,
    advisory_timeout: Duration,
}

impl<S: MarketDataSource, A: Advisor> MarketHub<S, A> {
    pub fn new(assembler: SnapshotAssembler<S>, advisor: A, cache: Arc<AdvisoryCache>) -> Self {
        Self {
            assembler,
            advisor,
            cache,
            latest: RwLock::new(None),
            advisory_timeout: DEFAULT_ADVISORY_TIMEOUT,
        }
    }

    pub fn with_advisory_timeout(mut self, timeout: Duration) -> Self {
        self.advisory_timeout = timeout;
        self
    }

    pub fn advisor(&self) -> &A {
        &self.advisor
    }

    pub fn cache(&self) -> &Arc<AdvisoryCache> {
        &self.cache
    }
}
