use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use market_advisor::market_api::{BinanceClient, GeminiAdvisor, SnapshotAssembler};
use market_advisor::{AdvisoryCache, AppConfig, MarketHub};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = AppConfig::from_env().context("invalid configuration")?;
    let timeout = cfg.assembler.request_timeout;

    let source = BinanceClient::new(cfg.binance_api_base.clone(), timeout)
        .context("failed to build market data client")?;
    let advisor = GeminiAdvisor::new(cfg.gemini.clone(), timeout)
        .context("failed to build advisory client")?;
    let cache = Arc::new(AdvisoryCache::new(cfg.advisory_ttl));
    let hub = MarketHub::new(SnapshotAssembler::new(source, cfg.assembler), advisor, cache);

    info!(
        symbol = %cfg.symbol,
        timeframe = %cfg.timeframe,
        language = %cfg.language,
        refresh_secs = cfg.refresh_interval.as_secs(),
        advisory = cfg.advisory_enabled(),
        "market advisor starting"
    );

    let mut ticker = tokio::time::interval(cfg.refresh_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => tick(&hub, &cfg).await,
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}

async fn tick<S, A>(hub: &MarketHub<S, A>, cfg: &AppConfig)
where
    S: market_advisor::market_api::MarketDataSource,
    A: market_advisor::market_api::Advisor,
{
    let snapshot = match hub.refresh_now(&cfg.symbol, cfg.timeframe).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!(error = %e, "snapshot refresh failed");
            return;
        }
    };

    let latest = &snapshot.latest_indicators;
    info!(
        symbol = %snapshot.symbol,
        price = snapshot.price,
        change_24h = snapshot.change_24h,
        rsi = ?latest.rsi,
        liquidity = ?snapshot.liquidity_levels,
        pivots = ?snapshot.pivot_points,
        "snapshot"
    );

    if !cfg.advisory_enabled() {
        return;
    }

    match hub.analyze_now(cfg.language).await {
        Ok(result) => info!(
            decision = ?result.advice.decision,
            confidence = result.advice.confidence,
            entry = %result.advice.entry_zone,
            stop_loss = %result.advice.stop_loss,
            take_profit = %result.advice.take_profit,
            leverage = %result.advice.leverage,
            created_at = %result.created_at,
            "{}",
            result.advice.narrative
        ),
        Err(e) => error!(error = %e, "advisory failed"),
    }
}
