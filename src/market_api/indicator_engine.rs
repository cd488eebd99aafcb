//! Indicator engine: runs every indicator kind over a [`Series`] and maps the
//! (shorter) outputs back onto candle positions.
//!
//! Alignment rule: for a series of length `N` and an output of length `M`,
//! output `j` belongs to candle `N - M + j`. The last output therefore always
//! sits on the last candle, whatever the warmup.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

use super::technical_indicators::{
    calculate_bollinger, calculate_cci, calculate_ema, calculate_macd, calculate_momentum,
    calculate_rsi, calculate_stochastic, calculate_williams_r,
};
use super::types::{AnnotatedCandle, Series};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub bollinger_period: usize,
    pub bollinger_std_dev: f64,
    pub stochastic_k: usize,
    pub stochastic_d: usize,
    pub cci_period: usize,
    pub williams_period: usize,
    pub momentum_lag: usize,
}

impl IndicatorConfig {
    /// Rejects parameters under which some indicator could never be computed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("ema_fast", self.ema_fast),
            ("ema_slow", self.ema_slow),
            ("bollinger_period", self.bollinger_period),
            ("stochastic_k", self.stochastic_k),
            ("stochastic_d", self.stochastic_d),
            ("cci_period", self.cci_period),
            ("williams_period", self.williams_period),
            ("momentum_lag", self.momentum_lag),
        ];
        if let Some(&(name, _)) = periods.iter().find(|(_, period)| *period == 0) {
            return Err(ConfigError::InvalidIndicator {
                name,
                reason: "must be greater than zero",
            });
        }
        if self.macd_fast >= self.macd_slow {
            return Err(ConfigError::InvalidIndicator {
                name: "macd_fast",
                reason: "must be shorter than macd_slow",
            });
        }
        if !self.bollinger_std_dev.is_finite() || self.bollinger_std_dev < 0.0 {
            return Err(ConfigError::InvalidIndicator {
                name: "bollinger_std_dev",
                reason: "must be a finite non-negative number",
            });
        }
        Ok(())
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            ema_fast: 20,
            ema_slow: 50,
            bollinger_period: 20,
            bollinger_std_dev: 2.0,
            stochastic_k: 14,
            stochastic_d: 3,
            cci_period: 20,
            williams_period: 14,
            momentum_lag: 10,
        }
    }
}

/// Warmup of an indicator whose parameters can never yield a value.
pub const NEVER_WARM: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Rsi,
    Macd,
    EmaFast,
    EmaSlow,
    Bollinger,
    Stochastic,
    Cci,
    WilliamsR,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 8] = [
        IndicatorKind::Rsi,
        IndicatorKind::Macd,
        IndicatorKind::EmaFast,
        IndicatorKind::EmaSlow,
        IndicatorKind::Bollinger,
        IndicatorKind::Stochastic,
        IndicatorKind::Cci,
        IndicatorKind::WilliamsR,
    ];

    /// Leading candles consumed before the first output.
    ///
    /// | kind | warmup |
    /// |---|---|
    /// | `Rsi` | `rsi_period` |
    /// | `Macd` | `macd_slow + macd_signal - 2` |
    /// | `EmaFast` / `EmaSlow` | `period - 1` |
    /// | `Bollinger` | `bollinger_period - 1` |
    /// | `Stochastic` | `stochastic_k + stochastic_d - 2` |
    /// | `Cci` | `cci_period - 1` |
    /// | `WilliamsR` | `williams_period - 1` |
    ///
    /// Parameters that can never produce output (a zero period, `macd_fast >
    /// macd_slow`) give [`NEVER_WARM`].
    pub fn warmup(&self, config: &IndicatorConfig) -> usize {
        if !self.is_computable(config) {
            return NEVER_WARM;
        }
        match self {
            IndicatorKind::Rsi => config.rsi_period,
            IndicatorKind::Macd => config.macd_slow.saturating_add(config.macd_signal) - 2,
            IndicatorKind::EmaFast => config.ema_fast - 1,
            IndicatorKind::EmaSlow => config.ema_slow - 1,
            IndicatorKind::Bollinger => config.bollinger_period - 1,
            IndicatorKind::Stochastic => {
                config.stochastic_k.saturating_add(config.stochastic_d) - 2
            }
            IndicatorKind::Cci => config.cci_period - 1,
            IndicatorKind::WilliamsR => config.williams_period - 1,
        }
    }

    fn is_computable(&self, config: &IndicatorConfig) -> bool {
        match self {
            IndicatorKind::Rsi => config.rsi_period > 0,
            IndicatorKind::Macd => {
                config.macd_fast > 0
                    && config.macd_signal > 0
                    && config.macd_fast <= config.macd_slow
            }
            IndicatorKind::EmaFast => config.ema_fast > 0,
            IndicatorKind::EmaSlow => config.ema_slow > 0,
            IndicatorKind::Bollinger => config.bollinger_period > 0,
            IndicatorKind::Stochastic => config.stochastic_k > 0 && config.stochastic_d > 0,
            IndicatorKind::Cci => config.cci_period > 0,
            IndicatorKind::WilliamsR => config.williams_period > 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValue {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandsValue {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticValue {
    pub k: f64,
    pub d: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum IndicatorValue {
    Scalar(f64),
    Macd(MacdValue),
    Bands(BandsValue),
    Stochastic(StochasticValue),
}

impl IndicatorValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            IndicatorValue::Scalar(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_macd(&self) -> Option<MacdValue> {
        match self {
            IndicatorValue::Macd(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bands(&self) -> Option<BandsValue> {
        match self {
            IndicatorValue::Bands(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_stochastic(&self) -> Option<StochasticValue> {
        match self {
            IndicatorValue::Stochastic(value) => Some(*value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSeries {
    pub kind: IndicatorKind,
    pub warmup: usize,
    pub values: Vec<IndicatorValue>,
}

impl IndicatorSeries {
    /// `false` when the input was shorter than the warmup ("no signal yet").
    pub fn is_available(&self) -> bool {
        !self.values.is_empty()
    }

    /// Value aligned to `candle_index` of a source series of `series_len` candles.
    pub fn value_at(&self, candle_index: usize, series_len: usize) -> Option<&IndicatorValue> {
        let offset = series_len.checked_sub(self.values.len())?;
        let index = candle_index.checked_sub(offset)?;
        self.values.get(index)
    }

    pub fn last(&self) -> Option<&IndicatorValue> {
        self.values.last()
    }
}

/// Output of [`compute`]: every kind is present, possibly empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub series_len: usize,
    pub momentum: Vec<Option<f64>>,
    pub indicators: BTreeMap<IndicatorKind, IndicatorSeries>,
}

impl IndicatorSet {
    pub fn get(&self, kind: IndicatorKind) -> Option<&IndicatorSeries> {
        self.indicators.get(&kind)
    }

    fn value(&self, kind: IndicatorKind, candle_index: usize) -> Option<&IndicatorValue> {
        self.indicators
            .get(&kind)
            .and_then(|series| series.value_at(candle_index, self.series_len))
    }

    /// Per-field view of every indicator at `candle_index`.
    pub fn at(&self, candle_index: usize) -> CandleIndicators {
        CandleIndicators {
            rsi: self.value(IndicatorKind::Rsi, candle_index).and_then(IndicatorValue::as_scalar),
            macd: self.value(IndicatorKind::Macd, candle_index).and_then(IndicatorValue::as_macd),
            ema_fast: self
                .value(IndicatorKind::EmaFast, candle_index)
                .and_then(IndicatorValue::as_scalar),
            ema_slow: self
                .value(IndicatorKind::EmaSlow, candle_index)
                .and_then(IndicatorValue::as_scalar),
            bollinger: self
                .value(IndicatorKind::Bollinger, candle_index)
                .and_then(IndicatorValue::as_bands),
            stochastic: self
                .value(IndicatorKind::Stochastic, candle_index)
                .and_then(IndicatorValue::as_stochastic),
            cci: self.value(IndicatorKind::Cci, candle_index).and_then(IndicatorValue::as_scalar),
            williams_r: self
                .value(IndicatorKind::WilliamsR, candle_index)
                .and_then(IndicatorValue::as_scalar),
            momentum: self.momentum.get(candle_index).copied().flatten(),
        }
    }

    /// The view of the newest candle, or all-absent for an empty series.
    pub fn latest(&self) -> CandleIndicators {
        match self.series_len.checked_sub(1) {
            Some(last) => self.at(last),
            None => CandleIndicators::default(),
        }
    }
}

/// Indicator values attached to a single candle. `None` means "not available
/// yet", never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CandleIndicators {
    pub rsi: Option<f64>,
    pub macd: Option<MacdValue>,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub bollinger: Option<BandsValue>,
    pub stochastic: Option<StochasticValue>,
    pub cci: Option<f64>,
    pub williams_r: Option<f64>,
    pub momentum: Option<f64>,
}

pub fn compute(series: &Series, config: &IndicatorConfig) -> IndicatorSet {
    let closes = series.closes();
    let highs = series.highs();
    let lows = series.lows();

    let mut indicators = BTreeMap::new();
    for kind in IndicatorKind::ALL {
        let warmup = kind.warmup(config);
        let values = if warmup == NEVER_WARM {
            Vec::new()
        } else {
            compute_kind(kind, &closes, &highs, &lows, config)
        };
        if values.is_empty() {
            debug!(?kind, warmup, candles = series.len(), "indicator has insufficient data");
        }
        indicators.insert(kind, IndicatorSeries { kind, warmup, values });
    }

    IndicatorSet {
        series_len: series.len(),
        momentum: calculate_momentum(&closes, config.momentum_lag),
        indicators,
    }
}

fn compute_kind(
    kind: IndicatorKind,
    closes: &[f64],
    highs: &[f64],
    lows: &[f64],
    config: &IndicatorConfig,
) -> Vec<IndicatorValue> {
    match kind {
        IndicatorKind::Rsi => scalars(calculate_rsi(closes, config.rsi_period)),
        IndicatorKind::EmaFast => scalars(calculate_ema(closes, config.ema_fast)),
        IndicatorKind::EmaSlow => scalars(calculate_ema(closes, config.ema_slow)),
        IndicatorKind::Cci => scalars(calculate_cci(highs, lows, closes, config.cci_period)),
        IndicatorKind::WilliamsR => {
            scalars(calculate_williams_r(highs, lows, closes, config.williams_period))
        }
        IndicatorKind::Macd => {
            let result =
                calculate_macd(closes, config.macd_fast, config.macd_slow, config.macd_signal);
            result
                .macd
                .iter()
                .zip(result.signal.iter())
                .zip(result.histogram.iter())
                .map(|((&line, &signal), &histogram)| {
                    IndicatorValue::Macd(MacdValue { line, signal, histogram })
                })
                .collect()
        }
        IndicatorKind::Bollinger => {
            let result =
                calculate_bollinger(closes, config.bollinger_period, config.bollinger_std_dev);
            result
                .upper
                .iter()
                .zip(result.middle.iter())
                .zip(result.lower.iter())
                .map(|((&upper, &middle), &lower)| {
                    IndicatorValue::Bands(BandsValue { upper, middle, lower })
                })
                .collect()
        }
        IndicatorKind::Stochastic => {
            let result =
                calculate_stochastic(highs, lows, closes, config.stochastic_k, config.stochastic_d);
            result
                .k
                .iter()
                .zip(result.d.iter())
                .map(|(&k, &d)| IndicatorValue::Stochastic(StochasticValue { k, d }))
                .collect()
        }
    }
}

fn scalars(values: Vec<f64>) -> Vec<IndicatorValue> {
    values.into_iter().map(IndicatorValue::Scalar).collect()
}

/// Attaches the aligned indicator values to every candle of `series`.
pub fn annotate(series: &Series, set: &IndicatorSet) -> Vec<AnnotatedCandle> {
    series
        .candles()
        .iter()
        .enumerate()
        .map(|(index, candle)| AnnotatedCandle {
            candle: *candle,
            indicators: set.at(index),
        })
        .collect()
}
