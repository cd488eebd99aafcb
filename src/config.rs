use std::env;
use std::time::Duration;

use crate::cache::DEFAULT_ADVISORY_TTL;
use crate::error::ConfigError;
use crate::market_api::ai_api_config::DEFAULT_GEMINI_ENDPOINT;
use crate::market_api::{
    normalize_symbol, AssemblerConfig, GeminiConfig, IndicatorConfig, Language, Timeframe,
    DEFAULT_BINANCE_API_BASE,
};

/// Runtime configuration derived from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub language: Language,

    pub binance_api_base: String,
    pub gemini: GeminiConfig,

    pub refresh_interval: Duration,
    pub advisory_ttl: Duration,
    pub assembler: AssemblerConfig,
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn env_str(vars: Lookup, name: &str, default: &str) -> String {
    env_opt(vars, name).unwrap_or_else(|| default.to_string())
}

fn env_opt(vars: Lookup, name: &str) -> Option<String> {
    vars(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_u64(vars: Lookup, name: &str, default: u64) -> u64 {
    vars(name)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_usize(vars: Lookup, name: &str, default: usize) -> usize {
    vars(name)
        .and_then(|s| s.trim().parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

/// Longest interval accepted from the environment.
const MAX_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

fn env_secs(vars: Lookup, name: &str, default: Duration) -> Duration {
    let secs = env_u64(vars, name, default.as_secs());
    if (1..=MAX_INTERVAL_SECS).contains(&secs) {
        Duration::from_secs(secs)
    } else {
        default
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&|name| env::var(name).ok())
    }

    /// Same as [`AppConfig::from_env`] with an arbitrary variable source.
    pub fn from_vars(vars: Lookup) -> Result<Self, ConfigError> {
        let timeframe = env_str(vars, "MARKET_TIMEFRAME", Timeframe::M15.as_str())
            .parse()
            .map_err(|source| ConfigError::InvalidValue {
                name: "MARKET_TIMEFRAME",
                source,
            })?;
        let language = env_str(vars, "ADVISOR_LANGUAGE", Language::En.code())
            .parse()
            .map_err(|source| ConfigError::InvalidValue {
                name: "ADVISOR_LANGUAGE",
                source,
            })?;

        let defaults = AssemblerConfig::default();
        let request_timeout = env_secs(vars, "REQUEST_TIMEOUT_SECS", defaults.request_timeout);
        let assembler = AssemblerConfig {
            candle_limit: env_usize(vars, "CANDLE_LIMIT", defaults.candle_limit),
            daily_limit: env_usize(vars, "DAILY_CANDLE_LIMIT", defaults.daily_limit),
            display_window: env_usize(vars, "DISPLAY_WINDOW", defaults.display_window),
            liquidity_lookback: env_usize(
                vars,
                "LIQUIDITY_LOOKBACK",
                defaults.liquidity_lookback,
            ),
            request_timeout,
            indicators: IndicatorConfig {
                momentum_lag: env_usize(vars, "MOMENTUM_LAG", defaults.indicators.momentum_lag),
                ..defaults.indicators
            },
        };

        assembler.indicators.validate()?;

        let gemini = GeminiConfig {
            endpoint: env_str(vars, "GEMINI_ENDPOINT", DEFAULT_GEMINI_ENDPOINT),
            model: env_str(vars, "GEMINI_MODEL", &GeminiConfig::default().model),
            api_key: env_opt(vars, "GEMINI_API_KEY").or_else(|| env_opt(vars, "API_KEY")),
        };

        Ok(Self {
            symbol: normalize_symbol(&env_str(vars, "MARKET_ASSET", "BTC")),
            timeframe,
            language,
            binance_api_base: env_str(vars, "BINANCE_API_BASE", DEFAULT_BINANCE_API_BASE),
            gemini,
            refresh_interval: env_secs(vars, "REFRESH_INTERVAL_SECS", Duration::from_secs(30)),
            advisory_ttl: env_secs(vars, "ADVISORY_TTL_SECS", DEFAULT_ADVISORY_TTL),
            assembler,
        })
    }

    pub fn advisory_enabled(&self) -> bool {
        self.gemini.api_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::ParseEnumError;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_vars(&|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.symbol, "BTCUSDT");
        assert_eq!(config.timeframe, Timeframe::M15);
        assert_eq!(config.language, Language::En);
        assert_eq!(config.binance_api_base, DEFAULT_BINANCE_API_BASE);
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert_eq!(config.advisory_ttl, Duration::from_secs(14_400));
        assert_eq!(config.assembler, AssemblerConfig::default());
        assert!(!config.advisory_enabled());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("MARKET_ASSET", " eth "),
            ("MARKET_TIMEFRAME", "4h"),
            ("ADVISOR_LANGUAGE", "ua"),
            ("API_KEY", "fallback-key"),
            ("CANDLE_LIMIT", "500"),
            ("MOMENTUM_LAG", "5"),
            ("REFRESH_INTERVAL_SECS", "not-a-number"),
        ])
        .unwrap();

        assert_eq!(config.symbol, "ETHUSDT");
        assert_eq!(config.timeframe, Timeframe::H4);
        assert_eq!(config.language, Language::Ua);
        assert_eq!(config.gemini.api_key.as_deref(), Some("fallback-key"));
        assert_eq!(config.assembler.candle_limit, 500);
        assert_eq!(config.assembler.indicators.momentum_lag, 5);
        assert_eq!(config.assembler.indicators.rsi_period, 14);
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_out_of_range_intervals_fall_back_to_defaults() {
        struct TestCase {
            value: &'static str,
            expected: Duration,
        }

        let tests = vec![
            TestCase {
                // TC0: far beyond any sensible TTL
                value: "100000000000",
                expected: DEFAULT_ADVISORY_TTL,
            },
            TestCase {
                // TC1: zero
                value: "0",
                expected: DEFAULT_ADVISORY_TTL,
            },
            TestCase {
                // TC2: one year is still accepted
                value: "31536000",
                expected: Duration::from_secs(31_536_000),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let config = config_from(&[("ADVISORY_TTL_SECS", test.value)]).unwrap();
            assert_eq!(config.advisory_ttl, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_primary_api_key_wins() {
        let config =
            config_from(&[("GEMINI_API_KEY", "primary"), ("API_KEY", "fallback")]).unwrap();
        assert_eq!(config.gemini.api_key.as_deref(), Some("primary"));
        assert!(config.advisory_enabled());
    }

    #[test]
    fn test_invalid_enums_are_errors() {
        struct TestCase {
            pairs: Vec<(&'static str, &'static str)>,
            expected: ConfigError,
        }

        let tests = vec![
            TestCase {
                // TC0: unknown timeframe
                pairs: vec![("MARKET_TIMEFRAME", "3m")],
                expected: ConfigError::InvalidValue {
                    name: "MARKET_TIMEFRAME",
                    source: ParseEnumError::Timeframe("3m".to_string()),
                },
            },
            TestCase {
                // TC1: unknown language
                pairs: vec![("ADVISOR_LANGUAGE", "de")],
                expected: ConfigError::InvalidValue {
                    name: "ADVISOR_LANGUAGE",
                    source: ParseEnumError::Language("de".to_string()),
                },
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = config_from(&test.pairs).unwrap_err();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }
}
