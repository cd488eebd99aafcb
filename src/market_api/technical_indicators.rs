//! Windowed indicator math.
//!
//! Every function here returns only the values it can actually compute: the
//! output is shorter than the input by the indicator's warmup and its last
//! element belongs to the last input sample. Too little input gives an empty
//! vector. Re-aligning onto the candle index is done by the indicator engine.

pub struct MacdResult {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub struct BollingerResult {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub struct StochasticResult {
    pub k: Vec<f64>,
    pub d: Vec<f64>,
}

pub fn calculate_sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    let mut sum: f64 = data[..period].iter().sum();
    result.push(sum / period as f64);

    for i in period..data.len() {
        sum += data[i] - data[i - period];
        result.push(sum / period as f64);
    }

    result
}

/// EMA seeded with the SMA of the first `period` samples, multiplier `2 / (period + 1)`.
pub fn calculate_ema(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = data[..period].iter().sum::<f64>() / period as f64;

    let mut result = Vec::with_capacity(data.len() - period + 1);
    result.push(ema);

    for &price in &data[period..] {
        ema = (price - ema) * multiplier + ema;
        result.push(ema);
    }

    result
}

/// RSI with Wilder smoothing. First value needs `period + 1` closes.
pub fn calculate_rsi(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() <= period {
        return Vec::new();
    }

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);

    for i in 1..data.len() {
        let change = data[i] - data[i - 1];
        gains.push(if change > 0.0 { change } else { 0.0 });
        losses.push(if change < 0.0 { -change } else { 0.0 });
    }

    let period_f = period as f64;
    let mut avg_gain = gains[..period].iter().sum::<f64>() / period_f;
    let mut avg_loss = losses[..period].iter().sum::<f64>() / period_f;

    let mut result = Vec::with_capacity(data.len() - period);
    result.push(rsi_from_averages(avg_gain, avg_loss));

    for i in period..gains.len() {
        avg_gain = (avg_gain * (period_f - 1.0) + gains[i]) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + losses[i]) / period_f;
        result.push(rsi_from_averages(avg_gain, avg_loss));
    }

    result
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }
}

/// MACD trimmed so that line, signal and histogram share one index.
///
/// The line starts where the slow EMA starts; the signal EMA then consumes
/// `signal - 1` more line values, so all three vectors have
/// `len - (slow + signal - 2)` elements.
pub fn calculate_macd(data: &[f64], fast: usize, slow: usize, signal: usize) -> MacdResult {
    let empty = MacdResult {
        macd: Vec::new(),
        signal: Vec::new(),
        histogram: Vec::new(),
    };
    if fast == 0 || signal == 0 || fast > slow {
        return empty;
    }

    let ema_fast = calculate_ema(data, fast);
    let ema_slow = calculate_ema(data, slow);
    if ema_slow.is_empty() {
        return empty;
    }

    let offset = slow - fast;
    let macd_line: Vec<f64> = ema_slow
        .iter()
        .enumerate()
        .map(|(i, s)| ema_fast[i + offset] - s)
        .collect();

    let signal_line = calculate_ema(&macd_line, signal);
    if signal_line.is_empty() {
        return empty;
    }

    let macd: Vec<f64> = macd_line[signal - 1..].to_vec();
    let histogram: Vec<f64> = macd
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| m - s)
        .collect();

    MacdResult {
        macd,
        signal: signal_line,
        histogram,
    }
}

/// SMA middle band with population standard deviation envelopes.
pub fn calculate_bollinger(data: &[f64], period: usize, std_dev: f64) -> BollingerResult {
    let mut upper = Vec::new();
    let mut middle = Vec::new();
    let mut lower = Vec::new();

    if period > 0 && data.len() >= period {
        for window in data.windows(period) {
            let mean = window.iter().sum::<f64>() / period as f64;
            let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period as f64;
            let deviation = variance.sqrt();
            middle.push(mean);
            upper.push(mean + std_dev * deviation);
            lower.push(mean - std_dev * deviation);
        }
    }

    BollingerResult { upper, middle, lower }
}

/// Slow stochastic: `%K` over `k_period`, `%D` as the SMA of `%K` over `d_period`.
///
/// Both vectors are trimmed to the span where `%D` exists.
pub fn calculate_stochastic(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    k_period: usize,
    d_period: usize,
) -> StochasticResult {
    let k_values = percent_range(highs, lows, closes, k_period)
        .into_iter()
        .map(|(high, low, close)| {
            if high > low {
                (close - low) / (high - low) * 100.0
            } else {
                50.0
            }
        })
        .collect::<Vec<f64>>();

    let d = calculate_sma(&k_values, d_period);
    if d.is_empty() {
        return StochasticResult { k: Vec::new(), d };
    }

    StochasticResult {
        k: k_values[d_period - 1..].to_vec(),
        d,
    }
}

/// Williams %R in `[-100, 0]`.
pub fn calculate_williams_r(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    period: usize,
) -> Vec<f64> {
    percent_range(highs, lows, closes, period)
        .into_iter()
        .map(|(high, low, close)| {
            if high > low {
                (high - close) / (high - low) * -100.0
            } else {
                -50.0
            }
        })
        .collect()
}

/// Commodity Channel Index over the typical price with the 0.015 Lambert constant.
pub fn calculate_cci(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    let n = highs.len().min(lows.len()).min(closes.len());
    if period == 0 || n < period {
        return Vec::new();
    }

    let typical: Vec<f64> = (0..n).map(|i| (highs[i] + lows[i] + closes[i]) / 3.0).collect();

    typical
        .windows(period)
        .map(|window| {
            let mean = window.iter().sum::<f64>() / period as f64;
            let mean_deviation =
                window.iter().map(|tp| (tp - mean).abs()).sum::<f64>() / period as f64;
            let current = window[period - 1];
            if mean_deviation == 0.0 {
                0.0
            } else {
                (current - mean) / (0.015 * mean_deviation)
            }
        })
        .collect()
}

/// `close[i] - close[i - lag]` for every `i`, `None` while `i < lag`.
pub fn calculate_momentum(closes: &[f64], lag: usize) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| (i >= lag).then(|| closes[i] - closes[i - lag]))
        .collect()
}

/// Highest high, lowest low and current close for each full trailing window.
fn percent_range(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    period: usize,
) -> Vec<(f64, f64, f64)> {
    let n = highs.len().min(lows.len()).min(closes.len());
    if period == 0 || n < period {
        return Vec::new();
    }

    ((period - 1)..n)
        .map(|i| {
            let start = i + 1 - period;
            let high = highs[start..=i].iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let low = lows[start..=i].iter().copied().fold(f64::INFINITY, f64::min);
            (high, low, closes[i])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    #[test]
    fn test_sma_and_ema_lengths() {
        let data: Vec<f64> = (1..=10).map(|x| x as f64).collect();

        let sma = calculate_sma(&data, 3);
        assert_eq!(sma.len(), 8);
        assert_close(sma[0], 2.0);
        assert_close(*sma.last().unwrap(), 9.0);

        let ema = calculate_ema(&data, 3);
        assert_eq!(ema.len(), 8);
        assert_close(ema[0], 2.0);
        // 2 + (4 - 2) * 0.5
        assert_close(ema[1], 3.0);

        assert!(calculate_ema(&data[..2], 3).is_empty());
        assert!(calculate_sma(&data, 0).is_empty());
    }

    #[test]
    fn test_rsi_extremes() {
        let rising: Vec<f64> = (0..20).map(|x| x as f64).collect();
        let rsi = calculate_rsi(&rising, 14);
        assert_eq!(rsi.len(), 6);
        assert!(rsi.iter().all(|v| *v == 100.0));

        let falling: Vec<f64> = rising.iter().rev().copied().collect();
        assert!(calculate_rsi(&falling, 14).iter().all(|v| *v == 0.0));

        let flat = vec![5.0; 20];
        assert!(calculate_rsi(&flat, 14).iter().all(|v| *v == 50.0));

        assert!(calculate_rsi(&rising[..14], 14).is_empty());
    }

    #[test]
    fn test_macd_components_share_an_index() {
        let data: Vec<f64> = (0..60).map(|x| 100.0 + (x as f64 * 0.2).sin() * 3.0).collect();
        let macd = calculate_macd(&data, 12, 26, 9);

        assert_eq!(macd.macd.len(), 60 - (26 + 9 - 2));
        assert_eq!(macd.signal.len(), macd.macd.len());
        assert_eq!(macd.histogram.len(), macd.macd.len());
        for i in 0..macd.macd.len() {
            assert_close(macd.histogram[i], macd.macd[i] - macd.signal[i]);
        }

        // The last line value must be fast EMA minus slow EMA of the full input.
        let fast = calculate_ema(&data, 12);
        let slow = calculate_ema(&data, 26);
        assert_close(*macd.macd.last().unwrap(), fast.last().unwrap() - slow.last().unwrap());

        assert!(calculate_macd(&data[..33], 12, 26, 9).macd.is_empty());
        assert_eq!(calculate_macd(&data[..34], 12, 26, 9).macd.len(), 1);
    }

    #[test]
    fn test_bollinger_constant_input_collapses_bands() {
        let data = vec![10.0; 25];
        let bands = calculate_bollinger(&data, 20, 2.0);
        assert_eq!(bands.middle.len(), 6);
        assert!(bands.upper.iter().zip(bands.lower.iter()).all(|(u, l)| u == l));
    }

    #[test]
    fn test_stochastic_and_williams_bounds() {
        let closes: Vec<f64> = (0..30).map(|x| 50.0 + (x as f64 * 0.7).cos() * 10.0).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 2.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 2.0).collect();

        let stoch = calculate_stochastic(&highs, &lows, &closes, 14, 3);
        assert_eq!(stoch.k.len(), 30 - 15);
        assert_eq!(stoch.d.len(), stoch.k.len());
        assert!(stoch.k.iter().chain(stoch.d.iter()).all(|v| (0.0..=100.0).contains(v)));

        let wr = calculate_williams_r(&highs, &lows, &closes, 14);
        assert_eq!(wr.len(), 30 - 13);
        assert!(wr.iter().all(|v| (-100.0..=0.0).contains(v)));
    }

    #[test]
    fn test_flat_ranges_give_neutral_values() {
        let flat = vec![7.0; 20];
        let stoch = calculate_stochastic(&flat, &flat, &flat, 14, 3);
        assert!(stoch.k.iter().all(|v| *v == 50.0));
        assert!(calculate_williams_r(&flat, &flat, &flat, 14).iter().all(|v| *v == -50.0));
        assert!(calculate_cci(&flat, &flat, &flat, 14).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_cci_sign_follows_typical_price() {
        let closes: Vec<f64> = (0..25).map(|x| x as f64).collect();
        let highs: Vec<f64> = closes.iter().map(|c| c + 1.0).collect();
        let lows: Vec<f64> = closes.iter().map(|c| c - 1.0).collect();
        let cci = calculate_cci(&highs, &lows, &closes, 20);
        assert_eq!(cci.len(), 6);
        assert!(cci.iter().all(|v| *v > 0.0));
    }

    #[test]
    fn test_momentum_is_absent_before_lag() {
        let closes: Vec<f64> = (0..12).map(|x| (x * 2) as f64).collect();
        let momentum = calculate_momentum(&closes, 10);
        assert_eq!(momentum.len(), 12);
        assert!(momentum[..10].iter().all(Option::is_none));
        assert_eq!(momentum[10], Some(20.0));
        assert_eq!(momentum[11], Some(20.0));
    }
}
