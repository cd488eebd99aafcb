use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use market_advisor::market_api::{
    Advice, AdvisoryRequest, Advisor, AssemblerConfig, Candle, Decision, Language,
    MarketDataSource, Series, SnapshotAssembler, Ticker, Timeframe,
};
use market_advisor::{AdvisoryCache, AdvisoryError, HubError, MarketDataError, MarketHub};

fn candle(minute: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        time: Utc.timestamp_millis_opt(1_700_000_000_000 + minute * 60_000).unwrap(),
        open,
        high,
        low,
        close,
        volume: 10.0,
    }
}

struct StaticMarket {
    primary: Series,
    daily: Series,
}

impl StaticMarket {
    fn new() -> Self {
        let mut primary: Vec<Candle> = (0..200)
            .map(|i| {
                let close = 100.0 + (i % 7) as f64;
                candle(i, close - 0.5, close + 2.0, close - 2.0, close)
            })
            .collect();
        // Last completed candle feeds the pivots.
        primary[198] = candle(198, 104.0, 110.0, 100.0, 105.0);

        let daily = (0..30)
            .map(|i| {
                let x = i as f64;
                candle(i * 1440, 95.0 + x, 100.0 + x, 90.0 + x, 96.0 + x)
            })
            .collect();

        Self {
            primary: Series::new(primary).unwrap(),
            daily: Series::new(daily).unwrap(),
        }
    }
}

#[async_trait]
impl MarketDataSource for StaticMarket {
    async fn ticker(&self, symbol: &str) -> Result<Ticker, MarketDataError> {
        if symbol != "ETHUSDT" {
            return Err(MarketDataError::Status {
                endpoint: "ticker/24hr".to_string(),
                status: 400,
            });
        }
        Ok(Ticker { last_price: 103.0, price_change_percent: -1.25 })
    }

    async fn candles(
        &self,
        _symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Series, MarketDataError> {
        let source = if timeframe.is_daily() { &self.daily } else { &self.primary };
        Ok(Series::new(source.tail(limit).to_vec())?)
    }
}

#[derive(Default)]
struct RecordingAdvisor {
    calls: AtomicUsize,
    requests: Mutex<Vec<AdvisoryRequest>>,
}

#[async_trait]
impl Advisor for RecordingAdvisor {
    async fn advise(&self, request: &AdvisoryRequest) -> Result<Advice, AdvisoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        Ok(Advice {
            narrative: "Chartist and Quant agree on a range".to_string(),
            decision: Decision::Wait,
            confidence: 55.0,
            entry_zone: "101-102".to_string(),
            stop_loss: "99".to_string(),
            take_profit: "108".to_string(),
            leverage: "2x".to_string(),
        })
    }
}

fn hub() -> MarketHub<StaticMarket, RecordingAdvisor> {
    let assembler = SnapshotAssembler::new(StaticMarket::new(), AssemblerConfig::default());
    MarketHub::new(assembler, RecordingAdvisor::default(), Arc::new(AdvisoryCache::default()))
}

#[tokio::test]
async fn test_refresh_builds_a_complete_snapshot() {
    let hub = hub();
    let snapshot = hub.refresh_now("ETHUSDT", Timeframe::H1).await.unwrap();

    assert_eq!(snapshot.symbol, "ETHUSDT");
    assert_eq!(snapshot.price, 103.0);
    assert_eq!(snapshot.change_24h, -1.25);
    assert_eq!(snapshot.candles.len(), 50);
    let newest = StaticMarket::new().primary.last().unwrap().time;
    assert_eq!(snapshot.candles.last().unwrap().candle.time, newest);

    // 200 candles of history cover every warmup, so the displayed window is fully annotated.
    for annotated in &snapshot.candles {
        let ind = &annotated.indicators;
        assert!(ind.rsi.is_some());
        assert!(ind.macd.is_some());
        assert!(ind.ema_fast.is_some());
        assert!(ind.ema_slow.is_some());
        assert!(ind.bollinger.is_some());
        assert!(ind.stochastic.is_some());
        assert!(ind.cci.is_some());
        assert!(ind.williams_r.is_some());
        assert!(ind.momentum.is_some());
    }
    assert_eq!(snapshot.latest_indicators, snapshot.candles.last().unwrap().indicators);

    let rsi = snapshot.latest_indicators.rsi.unwrap();
    assert!((0.0..=100.0).contains(&rsi));

    let liquidity = snapshot.liquidity_levels.unwrap();
    assert_eq!(liquidity.bsl, 129.0);
    assert_eq!(liquidity.ssl, 113.0);
    assert_eq!(liquidity.impulse, 16.0);
    assert_eq!(liquidity.level50, 121.0);
    assert!(liquidity.ssl <= liquidity.level25 && liquidity.level75 <= liquidity.bsl);

    let pivots = snapshot.pivot_points.unwrap();
    assert_eq!(
        (pivots.p, pivots.r1, pivots.s1, pivots.r2, pivots.s2),
        (105.0, 110.0, 100.0, 115.0, 95.0)
    );
}

#[tokio::test]
async fn test_advisory_is_cached_for_the_snapshot() {
    let hub = hub();
    hub.refresh_now("ETHUSDT", Timeframe::H1).await.unwrap();

    let first = hub.analyze_now(Language::Ru).await.unwrap();
    let second = hub.analyze_now(Language::Ru).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.advice.decision, Decision::Wait);
    assert_eq!(hub.advisor().calls.load(Ordering::SeqCst), 1);

    let requests = hub.advisor().requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].language, Language::Ru);
    assert_eq!(requests[0].recent_candles.len(), 10);
    assert!(requests[0].prompt().contains("Target Language: Russian"));
}

#[tokio::test]
async fn test_failed_refresh_leaves_hub_usable() {
    let hub = hub();
    assert_eq!(hub.analyze_now(Language::En).await, Err(HubError::NoSnapshot));

    let failed = hub.refresh_now("NOPEUSDT", Timeframe::H1).await;
    assert!(matches!(
        failed,
        Err(HubError::MarketData(MarketDataError::Status { status: 400, .. }))
    ));
    assert!(hub.latest_snapshot().await.is_none());

    hub.refresh_now("ETHUSDT", Timeframe::H1).await.unwrap();
    hub.refresh_now("NOPEUSDT", Timeframe::H1).await.unwrap_err();
    assert_eq!(hub.latest_snapshot().await.unwrap().symbol, "ETHUSDT");
}
