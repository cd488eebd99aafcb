use chrono::{DateTime, Utc};

use crate::error::MarketDataError;
use crate::market_api::types::{Candle, Series};

/// Parses a Binance `/klines` payload.
///
/// Each row is an array whose first six fields are
/// `[open_time_ms, open, high, low, close, volume]`, prices as decimal strings.
pub fn parse_klines(json: &serde_json::Value) -> Result<Series, MarketDataError> {
    let rows = json
        .as_array()
        .ok_or_else(|| MarketDataError::Malformed("klines: expected an array".to_string()))?;

    let mut candles = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let fields = row
            .as_array()
            .filter(|fields| fields.len() >= 6)
            .ok_or_else(|| malformed(index, "expected at least 6 fields"))?;

        let open_time = fields[0]
            .as_i64()
            .ok_or_else(|| malformed(index, "open time is not an integer"))?;
        let time = DateTime::<Utc>::from_timestamp_millis(open_time)
            .ok_or_else(|| malformed(index, "open time out of range"))?;

        candles.push(Candle {
            time,
            open: number_field(&fields[1], index, "open")?,
            high: number_field(&fields[2], index, "high")?,
            low: number_field(&fields[3], index, "low")?,
            close: number_field(&fields[4], index, "close")?,
            volume: number_field(&fields[5], index, "volume")?,
        });
    }

    Ok(Series::new(candles)?)
}

fn malformed(index: usize, what: &str) -> MarketDataError {
    MarketDataError::Malformed(format!("kline {}: {}", index, what))
}

/// Accepts both `"123.45"` and `123.45`; rejects anything non-finite.
pub(crate) fn number_field(
    value: &serde_json::Value,
    index: usize,
    name: &str,
) -> Result<f64, MarketDataError> {
    let parsed = match value {
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    };

    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| malformed(index, &format!("invalid {} {}", name, value)))
}
