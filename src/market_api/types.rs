use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ParseEnumError, SeriesError};

use super::indicator_engine::CandleIndicators;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Candles ordered by strictly ascending `time`.
///
/// The ordering is checked once in [`Series::new`], so every consumer can index
/// positionally without re-validating.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Series(Vec<Candle>);

impl Series {
    pub fn new(candles: Vec<Candle>) -> Result<Self, SeriesError> {
        for (index, pair) in candles.windows(2).enumerate() {
            if pair[1].time <= pair[0].time {
                return Err(SeriesError::OutOfOrder {
                    index: index + 1,
                    previous: pair[0].time,
                    current: pair[1].time,
                });
            }
        }
        Ok(Self(candles))
    }

    pub fn candles(&self) -> &[Candle] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.0.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.0.iter().map(|c| c.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.0.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.0.iter().map(|c| c.low).collect()
    }

    /// The trailing `n` candles (or all of them when fewer exist).
    pub fn tail(&self, n: usize) -> &[Candle] {
        &self.0[self.0.len().saturating_sub(n)..]
    }
}

impl<'de> Deserialize<'de> for Series {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let candles = Vec::<Candle>::deserialize(deserializer)?;
        Series::new(candles).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Ticker {
    pub last_price: f64,
    pub price_change_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "2h")]
    H2,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "12h")]
    H12,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 8] = [
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H2,
        Timeframe::H4,
        Timeframe::H12,
        Timeframe::D1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H2 => "2h",
            Timeframe::H4 => "4h",
            Timeframe::H12 => "12h",
            Timeframe::D1 => "1d",
        }
    }

    /// Exchange kline interval; the vocabulary happens to match Binance 1:1.
    pub fn binance_interval(&self) -> &'static str {
        self.as_str()
    }

    pub fn is_daily(&self) -> bool {
        matches!(self, Timeframe::D1)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseEnumError::Timeframe(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ua,
    Ru,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ua => "ua",
            Language::Ru => "ru",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Ua => "Ukrainian",
            Language::Ru => "Russian",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "ua" | "uk" => Ok(Language::Ua),
            "ru" => Ok(Language::Ru),
            _ => Err(ParseEnumError::Language(s.to_string())),
        }
    }
}

/// Buy-side / sell-side liquidity band over the trailing daily window.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct LiquidityLevels {
    pub bsl: f64,
    pub ssl: f64,
    pub impulse: f64,
    pub level25: f64,
    pub level50: f64,
    pub level75: f64,
}

/// Classic floor-trader pivots.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PivotPoints {
    pub p: f64,
    pub r1: f64,
    pub s1: f64,
    pub r2: f64,
    pub s2: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AnnotatedCandle {
    #[serde(flatten)]
    pub candle: Candle,
    pub indicators: CandleIndicators,
}

/// One fully assembled, read-only view of a market at a point in time.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub price: f64,
    pub change_24h: f64,
    pub candles: Vec<AnnotatedCandle>,
    pub latest_indicators: CandleIndicators,
    pub liquidity_levels: Option<LiquidityLevels>,
    pub pivot_points: Option<PivotPoints>,
    pub assembled_at: DateTime<Utc>,
}

/// Expands a bare asset ticker (`BTC`) to its USDT pair; quoted pairs pass through.
pub fn normalize_symbol(asset: &str) -> String {
    let upper = asset.trim().to_uppercase();
    const QUOTES: [&str; 4] = ["USDT", "USDC", "BUSD", "FDUSD"];
    if QUOTES.iter().any(|q| upper.len() > q.len() && upper.ends_with(q)) {
        upper
    } else {
        format!("{}USDT", upper)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    pub fn candle(index: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            time: Utc.timestamp_millis_opt(1_700_000_000_000 + index * 60_000).unwrap(),
            open,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    /// A gently oscillating series of `n` candles.
    pub fn wave_series(n: usize) -> Series {
        let candles = (0..n)
            .map(|i| {
                let x = i as f64;
                let close = 100.0 + (x * 0.3).sin() * 5.0 + x * 0.05;
                candle(i as i64, close - 0.5, close + 1.0, close - 1.5, close)
            })
            .collect();
        Series::new(candles).unwrap()
    }
}
