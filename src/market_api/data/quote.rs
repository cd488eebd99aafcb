use crate::error::MarketDataError;
use crate::market_api::types::Ticker;

/// Parses a Binance `/ticker/24hr` payload (`lastPrice`, `priceChangePercent`).
pub fn parse_ticker(json: &serde_json::Value) -> Result<Ticker, MarketDataError> {
    Ok(Ticker {
        last_price: decimal_string(json, "lastPrice")?,
        price_change_percent: decimal_string(json, "priceChangePercent")?,
    })
}

fn decimal_string(json: &serde_json::Value, name: &str) -> Result<f64, MarketDataError> {
    let value = &json[name];
    let parsed = match value {
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    };

    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| MarketDataError::Malformed(format!("ticker: missing or invalid {}", name)))
}
