//! Application configuration.
//!
//! Loaded from an optional `config.{toml,yaml,json}` file plus `ARB_`
//! prefixed environment variables (`ARB_DETECTION__MIN_SPREAD_PCT` and
//! friends), with working defaults so a bare `serve` run needs no setup.

use anyhow::{ensure, Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_pairs")]
    pub pairs: Vec<String>,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Per-exchange fetch deadline. A slow exchange only forfeits its
    /// own quotes for the cycle.
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Spreads at or below this percentage are ignored.
    #[serde(default = "default_min_spread_pct")]
    pub min_spread_pct: Decimal,
    /// Notional position size used to express spreads as profit.
    #[serde(default = "default_notional_trade_size")]
    pub notional_trade_size: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default = "default_broadcast_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingConfig {
    /// Exchange-native instruments to pull candle history for.
    #[serde(default = "default_instruments")]
    pub instruments: Vec<String>,
    #[serde(default = "default_candle_interval")]
    pub candle_interval: String,
    #[serde(default = "default_lookback_candles")]
    pub lookback_candles: u32,
    /// Returns window for the volatility feature, in candles.
    #[serde(default = "default_volatility_window")]
    pub volatility_window: usize,
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// Share of rows held out for the accuracy check.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_trees")]
    pub trees: usize,
    #[serde(default = "default_model_dir")]
    pub model_dir: String,
}

fn default_pairs() -> Vec<String> {
    vec![
        "BTC/USDT".to_string(),
        "ETH/USDT".to_string(),
        "BNB/USDT".to_string(),
    ]
}
fn default_fetch_timeout_secs() -> u64 {
    5
}
fn default_min_spread_pct() -> Decimal {
    dec!(0.1)
}
fn default_notional_trade_size() -> Decimal {
    dec!(1000)
}
fn default_broadcast_interval_secs() -> u64 {
    5
}
fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_instruments() -> Vec<String> {
    vec![
        "BTCUSDT".to_string(),
        "ETHUSDT".to_string(),
        "BNBUSDT".to_string(),
    ]
}
fn default_candle_interval() -> String {
    "1h".to_string()
}
fn default_lookback_candles() -> u32 {
    720
}
fn default_volatility_window() -> usize {
    24
}
fn default_min_samples() -> usize {
    100
}
fn default_test_fraction() -> f64 {
    0.2
}
fn default_seed() -> u64 {
    42
}
fn default_trees() -> usize {
    100
}
fn default_model_dir() -> String {
    "data/model".to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_spread_pct: default_min_spread_pct(),
            notional_trade_size: default_notional_trade_size(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_broadcast_interval_secs(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            instruments: default_instruments(),
            candle_interval: default_candle_interval(),
            lookback_candles: default_lookback_candles(),
            volatility_window: default_volatility_window(),
            min_samples: default_min_samples(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            trees: default_trees(),
            model_dir: default_model_dir(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pairs: default_pairs(),
            fetch: FetchConfig::default(),
            detection: DetectionConfig::default(),
            broadcast: BroadcastConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl BroadcastConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Config {
    /// Load from `config.*` (optional) and `ARB_` environment variables.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config: Config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("ARB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.pairs.is_empty(), "pairs must not be empty");
        for pair in &self.pairs {
            ensure!(
                pair.contains('/'),
                "pair {pair:?} must be BASE/QUOTE formatted"
            );
        }
        ensure!(
            self.detection.min_spread_pct > Decimal::ZERO,
            "detection.min_spread_pct must be positive"
        );
        ensure!(
            self.detection.notional_trade_size > Decimal::ZERO,
            "detection.notional_trade_size must be positive"
        );
        ensure!(
            self.fetch.timeout_secs >= 1,
            "fetch.timeout_secs must be at least 1"
        );
        ensure!(
            self.broadcast.interval_secs >= 1,
            "broadcast.interval_secs must be at least 1"
        );
        ensure!(
            self.training.test_fraction > 0.0 && self.training.test_fraction < 1.0,
            "training.test_fraction must be in (0, 1)"
        );
        ensure!(
            self.training.min_samples >= 1,
            "training.min_samples must be at least 1"
        );
        ensure!(
            self.training.volatility_window >= 2,
            "training.volatility_window must be at least 2"
        );
        ensure!(self.training.trees >= 1, "training.trees must be at least 1");
        ensure!(
            !self.training.instruments.is_empty(),
            "training.instruments must not be empty"
        );
        Ok(())
    }
}
