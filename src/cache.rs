use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AdvisoryError;
use crate::market_api::{Advice, Language, Timeframe};

pub const DEFAULT_ADVISORY_TTL: Duration = Duration::from_secs(4 * 60 * 60);
const MAX_ENTRIES: u64 = 1_024;
/// Upper bound for moka's own expiry, which only reclaims memory.
const MAX_BACKSTOP_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdvisoryKey {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub language: Language,
}

impl AdvisoryKey {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, language: Language) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            language,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryResult {
    #[serde(flatten)]
    pub advice: Advice,
    pub created_at: DateTime<Utc>,
}

/// Advisory results memoized per `(symbol, timeframe, language)` for a fixed TTL.
///
/// An entry is fresh while `now - created_at < ttl`, with `now` taken from the
/// injected [`Clock`]. Concurrent misses on one key may both compute; the last
/// insert wins. Failed computations are never stored and leave any previous
/// entry in place.
#[derive(Clone)]
pub struct AdvisoryCache {
    entries: Cache<AdvisoryKey, AdvisoryResult>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl AdvisoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        // moka's own TTL only reclaims memory; freshness is judged against `clock`.
        let entries = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .time_to_live(ttl.clamp(Duration::from_secs(1), MAX_BACKSTOP_TTL))
            .build();

        Self { entries, ttl, clock }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &AdvisoryResult, now: DateTime<Utc>) -> bool {
        match (now - entry.created_at).to_std() {
            Ok(age) => age < self.ttl,
            // created_at in the future (clock stepped back): treat as fresh
            Err(_) => true,
        }
    }

    /// Fresh entry for `key`, if any.
    pub async fn get(&self, key: &AdvisoryKey) -> Option<AdvisoryResult> {
        let entry = self.entries.get(key).await?;
        self.is_fresh(&entry, self.clock.now()).then_some(entry)
    }

    pub async fn get_or_compute<F, Fut>(
        &self,
        key: AdvisoryKey,
        compute: F,
    ) -> Result<AdvisoryResult, AdvisoryError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Advice, AdvisoryError>>,
    {
        if let Some(entry) = self.get(&key).await {
            info!(
                symbol = %key.symbol,
                timeframe = %key.timeframe,
                language = %key.language,
                "advisory cache hit"
            );
            return Ok(entry);
        }

        debug!(
            symbol = %key.symbol,
            timeframe = %key.timeframe,
            language = %key.language,
            "advisory cache miss"
        );
        let advice = compute().await?;

        let result = AdvisoryResult {
            advice,
            created_at: self.clock.now(),
        };
        self.entries.insert(key, result.clone()).await;
        Ok(result)
    }

    pub async fn invalidate(&self, key: &AdvisoryKey) {
        self.entries.invalidate(key).await;
    }

    /// Number of stored entries, fresh or not.
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for AdvisoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_ADVISORY_TTL)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use chrono::TimeZone;

    use super::*;

    /// Clock that only moves when told to.
    pub struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        pub fn new() -> Self {
            Self(Mutex::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()))
        }

        pub fn advance(&self, by: chrono::Duration) {
            let mut now = self.0.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }
}
