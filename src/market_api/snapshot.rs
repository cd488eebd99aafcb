use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::MarketDataError;

use super::data::MarketDataSource;
use super::indicator_engine::{annotate, compute, IndicatorConfig};
use super::levels::{liquidity_levels, pivot_points, DEFAULT_LIQUIDITY_LOOKBACK};
use super::types::{MarketSnapshot, Series, Timeframe};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// Candles fetched for indicator computation.
    pub candle_limit: usize,
    /// Daily candles fetched for liquidity levels when the timeframe is intraday.
    pub daily_limit: usize,
    /// Annotated candles kept in the snapshot.
    pub display_window: usize,
    pub liquidity_lookback: usize,
    pub request_timeout: Duration,
    pub indicators: IndicatorConfig,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            candle_limit: 200,
            daily_limit: 30,
            display_window: 50,
            liquidity_lookback: DEFAULT_LIQUIDITY_LOOKBACK,
            request_timeout: Duration::from_secs(10),
            indicators: IndicatorConfig::default(),
        }
    }
}

/// Fetch → indicators → derived levels → [`MarketSnapshot`].
pub struct SnapshotAssembler<S> {
    source: S,
    config: AssemblerConfig,
}

impl<S: MarketDataSource> SnapshotAssembler<S> {
    pub fn new(source: S, config: AssemblerConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub async fn assemble(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<MarketSnapshot, MarketDataError> {
        let timeout = self.config.request_timeout;

        let ticker = with_timeout("ticker", timeout, self.source.ticker(symbol));
        let candles = with_timeout(
            "candles",
            timeout,
            self.source.candles(symbol, timeframe, self.config.candle_limit),
        );
        let daily = async {
            if timeframe.is_daily() {
                Ok(None)
            } else {
                with_timeout(
                    "daily candles",
                    timeout,
                    self.source.candles(symbol, Timeframe::D1, self.config.daily_limit),
                )
                .await
                .map(Some)
            }
        };

        let (ticker, series, daily) = tokio::try_join!(ticker, candles, daily)?;
        let daily: &Series = daily.as_ref().unwrap_or(&series);

        let indicator_set = compute(&series, &self.config.indicators);
        let mut candles = annotate(&series, &indicator_set);
        // Indicators saw the full history above; only the presentation window is trimmed.
        let keep_from = candles.len().saturating_sub(self.config.display_window);
        candles.drain(..keep_from);

        let liquidity_levels = liquidity_levels(daily, self.config.liquidity_lookback)
            .map_err(|e| warn!(%symbol, %timeframe, error = %e, "liquidity levels unavailable"))
            .ok();
        let pivot_points = pivot_points(&series)
            .map_err(|e| warn!(%symbol, %timeframe, error = %e, "pivot points unavailable"))
            .ok();

        info!(
            %symbol,
            %timeframe,
            price = ticker.last_price,
            candles = series.len(),
            "market snapshot assembled"
        );

        Ok(MarketSnapshot {
            symbol: symbol.to_string(),
            timeframe,
            price: ticker.last_price,
            change_24h: ticker.price_change_percent,
            candles,
            latest_indicators: indicator_set.latest(),
            liquidity_levels,
            pivot_points,
            assembled_at: Utc::now(),
        })
    }
}

async fn with_timeout<T>(
    what: &'static str,
    timeout: Duration,
    fut: impl Future<Output = Result<T, MarketDataError>>,
) -> Result<T, MarketDataError> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| MarketDataError::Timeout { what, timeout })?
}
