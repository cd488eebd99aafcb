use tracing::info;

use crate::cache::{AdvisoryKey, AdvisoryResult};
use crate::error::{AdvisoryError, HubError};
use crate::market_api::{Advisor, AdvisoryRequest, Language, MarketDataSource};

use super::MarketHub;

impl<S: MarketDataSource, A: Advisor> MarketHub<S, A> {
    /// Advisory for the latest snapshot, served from the cache while fresh.
    pub async fn analyze_now(&self, language: Language) -> Result<AdvisoryResult, HubError> {
        let snapshot = self.latest_snapshot().await.ok_or(HubError::NoSnapshot)?;
        let key = AdvisoryKey::new(snapshot.symbol.clone(), snapshot.timeframe, language);
        let timeout = self.advisory_timeout;

        let result = self
            .cache
            .get_or_compute(key, || async {
                let request = AdvisoryRequest::from_snapshot(&snapshot, language);
                tokio::time::timeout(timeout, self.advisor.advise(&request))
                    .await
                    .map_err(|_| AdvisoryError::Timeout(timeout))?
            })
            .await?;

        info!(
            symbol = %snapshot.symbol,
            timeframe = %snapshot.timeframe,
            %language,
            decision = ?result.advice.decision,
            confidence = result.advice.confidence,
            "advisory ready"
        );
        Ok(result)
    }
}
