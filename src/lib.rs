pub mod cache;
pub mod commands;
pub mod config;
pub mod error;
pub mod market_api;

pub use cache::{AdvisoryCache, AdvisoryKey, AdvisoryResult, Clock, SystemClock};
pub use commands::MarketHub;
pub use config::AppConfig;
pub use error::{
    AdvisoryError, ConfigError, DerivedLevelUnavailable, HubError, MarketDataError, SeriesError,
};
