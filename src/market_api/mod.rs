pub mod types;
pub mod http_client;
pub mod data;
pub mod technical_indicators;
pub mod indicator_engine;
pub mod levels;
pub mod snapshot;
pub mod ai_api_config;
pub mod ai_analysis;
pub mod ai_analysis_json;

pub use types::*;
pub use data::{BinanceClient, MarketDataSource, DEFAULT_BINANCE_API_BASE};
pub use indicator_engine::{
    annotate, compute, BandsValue, CandleIndicators, IndicatorConfig, IndicatorKind,
    IndicatorSeries, IndicatorSet, IndicatorValue, MacdValue, StochasticValue,
};
pub use levels::{classic_pivots, liquidity_levels, pivot_points, DEFAULT_LIQUIDITY_LOOKBACK};
pub use snapshot::{AssemblerConfig, SnapshotAssembler};
pub use ai_api_config::GeminiConfig;
pub use ai_analysis::{Advice, AdvisoryRequest, Advisor, Decision, GeminiAdvisor};
