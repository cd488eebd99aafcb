use crate::error::DerivedLevelUnavailable;

use super::types::{LiquidityLevels, PivotPoints, Series};

pub const DEFAULT_LIQUIDITY_LOOKBACK: usize = 7;

/// Buy-side (max high) and sell-side (min low) liquidity over the last
/// `lookback` daily candles, with 25/50/75% retracements of the impulse.
pub fn liquidity_levels(
    daily: &Series,
    lookback: usize,
) -> Result<LiquidityLevels, DerivedLevelUnavailable> {
    if lookback == 0 || daily.len() < lookback {
        return Err(DerivedLevelUnavailable::InsufficientDailyCandles {
            required: lookback.max(1),
            available: daily.len(),
        });
    }

    let recent = daily.tail(lookback);
    let bsl = recent.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let ssl = recent.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let impulse = bsl - ssl;

    Ok(LiquidityLevels {
        bsl,
        ssl,
        impulse,
        level25: ssl + impulse * 0.25,
        level50: ssl + impulse * 0.50,
        level75: ssl + impulse * 0.75,
    })
}

/// Classic pivots from the last completed candle (`len - 2`); the final candle
/// is treated as still forming.
pub fn pivot_points(series: &Series) -> Result<PivotPoints, DerivedLevelUnavailable> {
    let candles = series.candles();
    if candles.len() < 2 {
        return Err(DerivedLevelUnavailable::NoCompletedCandle {
            available: candles.len(),
        });
    }

    let completed = &candles[candles.len() - 2];
    Ok(classic_pivots(completed.high, completed.low, completed.close))
}

pub fn classic_pivots(high: f64, low: f64, close: f64) -> PivotPoints {
    let p = (high + low + close) / 3.0;
    let range = high - low;

    PivotPoints {
        p,
        r1: 2.0 * p - low,
        s1: 2.0 * p - high,
        r2: p + range,
        s2: p - range,
    }
}
