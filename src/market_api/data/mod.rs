pub mod kline;
pub mod quote;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::MarketDataError;

use super::http_client::build_http_client;
use super::types::{Series, Ticker, Timeframe};

pub const DEFAULT_BINANCE_API_BASE: &str = "https://api.binance.com/api/v3";

/// Source of tickers and candles. Implementations must not retry on their own.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn ticker(&self, symbol: &str) -> Result<Ticker, MarketDataError>;

    async fn candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Series, MarketDataError>;
}

/// Binance spot REST API (`/ticker/24hr`, `/klines`).
#[derive(Debug, Clone)]
pub struct BinanceClient {
    client: reqwest::Client,
    base_url: String,
}

impl BinanceClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MarketDataError> {
        let client = build_http_client(timeout).map_err(MarketDataError::Network)?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, MarketDataError> {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!(%url, ?query, "market data request");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| MarketDataError::Malformed(format!("{}: {}", path, e)))
    }
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    async fn ticker(&self, symbol: &str) -> Result<Ticker, MarketDataError> {
        let json = self
            .get_json("ticker/24hr", &[("symbol", symbol.to_string())])
            .await?;
        quote::parse_ticker(&json)
    }

    async fn candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Series, MarketDataError> {
        let json = self
            .get_json(
                "klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", timeframe.binance_interval().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        kline::parse_klines(&json)
    }
}
