use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Candle vector violates the strictly-ascending time ordering of a `Series`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("candle {index} at {current} does not follow {previous}")]
    OutOfOrder {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseEnumError {
    #[error("unsupported timeframe: {0}")]
    Timeframe(String),

    #[error("unsupported language: {0}")]
    Language(String),
}

/// The market-data collaborator failed or returned data that cannot be used.
///
/// Any of these aborts snapshot assembly; retrying is left to whoever
/// schedules refreshes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarketDataError {
    #[error("market data unavailable: network error: {0}")]
    Network(String),

    #[error("market data unavailable: {endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("market data unavailable: malformed response: {0}")]
    Malformed(String),

    #[error("market data unavailable: {what} timed out after {timeout:?}")]
    Timeout { what: &'static str, timeout: Duration },

    #[error("market data unavailable: invalid candle series: {0}")]
    InvalidSeries(#[from] SeriesError),
}

/// Soft failure of a derived-level calculator; the snapshot carries the field as absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DerivedLevelUnavailable {
    #[error("liquidity levels need {required} daily candles, only {available} available")]
    InsufficientDailyCandles { required: usize, available: usize },

    #[error("pivot points need a completed candle before the current one, series has {available}")]
    NoCompletedCandle { available: usize },
}

/// The advisory collaborator failed or answered outside the expected schema.
///
/// Never cached.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdvisoryError {
    #[error("advisory request failed: not configured: {0}")]
    Configuration(String),

    #[error("advisory request failed: network error: {0}")]
    Network(String),

    #[error("advisory request failed: status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("advisory request failed: response contained no text")]
    EmptyResponse,

    #[error("advisory request failed: could not parse response: {0}")]
    Parse(String),

    #[error("advisory request failed: schema violation: {0}")]
    Schema(String),

    #[error("advisory request failed: timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HubError {
    #[error(transparent)]
    MarketData(#[from] MarketDataError),

    #[error(transparent)]
    Advisory(#[from] AdvisoryError),

    #[error("no market snapshot has been assembled yet")]
    NoSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid {name}: {source}")]
    InvalidValue {
        name: &'static str,
        #[source]
        source: ParseEnumError,
    },

    #[error("invalid indicator parameter {name}: {reason}")]
    InvalidIndicator {
        name: &'static str,
        reason: &'static str,
    },
}
