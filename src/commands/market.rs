use std::sync::Arc;

use tracing::warn;

use crate::error::HubError;
use crate::market_api::{Advisor, MarketDataSource, MarketSnapshot, Timeframe};

use super::MarketHub;

impl<S: MarketDataSource, A: Advisor> MarketHub<S, A> {
    pub async fn latest_snapshot(&self) -> Option<Arc<MarketSnapshot>> {
        self.latest.read().await.clone()
    }

    /// Assembles a fresh snapshot and publishes it. On failure the previously
    /// published snapshot stays in place.
    pub async fn refresh_now(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Arc<MarketSnapshot>, HubError> {
        match self.assembler.assemble(symbol, timeframe).await {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                *self.latest.write().await = Some(Arc::clone(&snapshot));
                Ok(snapshot)
            }
            Err(e) => {
                warn!(%symbol, %timeframe, error = %e, "refresh failed, keeping previous snapshot");
                Err(e.into())
            }
        }
    }
}
