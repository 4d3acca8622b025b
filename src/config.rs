//! Bot configuration
//!
//! Operator settings come from a config file plus `APP`-prefixed environment
//! overrides (e.g. `APP_API__API_KEY=...`). Credentials should normally be
//! supplied through the environment or a `.env` file rather than the config
//! file itself.

use config::{Config, File};
pub use config::ConfigError;
use serde::Deserialize;

use crate::engine::errors::{BotError, BotResult};
use crate::engine::types::TradeMode;

/// Main configuration struct
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Strategy parameters (symbol, mode, thresholds)
    pub strategy: StrategyConfig,
    /// Exchange API access
    #[serde(default)]
    pub api: ApiConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

/// Immutable parameters of one strategy run
#[derive(Debug, Clone, Deserialize)]
pub struct StrategyConfig {
    /// Trading pair, e.g. "ETHUSDT"
    pub symbol: String,
    /// "long" or "short"
    pub mode: TradeMode,
    /// Notional value of the first order, in quote currency; also the price
    /// fallback when the ticker is unreachable
    pub base_price: f64,
    /// Deviation from the last trade price that triggers an add or a close,
    /// as a fraction (0.02 = 2%)
    pub threshold_pct: f64,
    /// Seconds between price polls
    pub poll_interval_secs: u64,
    /// Use the exchange testnet
    #[serde(default)]
    pub test_mode: bool,
}

impl StrategyConfig {
    /// Validate the configuration
    pub fn validate(&self) -> BotResult<()> {
        if self.symbol.is_empty() {
            return Err(BotError::InvalidConfig("symbol cannot be empty".into()));
        }

        if self.base_price <= 0.0 {
            return Err(BotError::InvalidConfig("base_price must be positive".into()));
        }

        if !(0.0..1.0).contains(&self.threshold_pct) || self.threshold_pct == 0.0 {
            return Err(BotError::InvalidConfig(
                "threshold_pct must be in (0, 1)".into(),
            ));
        }

        if self.poll_interval_secs == 0 {
            return Err(BotError::InvalidConfig(
                "poll_interval_secs must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

/// Exchange API credentials and transport options
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    /// Optional HTTP(S) proxy URL
    #[serde(default)]
    pub proxy_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    /// Load settings from a configuration file, with environment overrides
    pub fn new(config_path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(config_path))
            // e.g. APP_API__API_SECRET=...
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
