//! Offline model training from historical OHLCV candles.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::config::TrainingConfig;

use super::features::N_FEATURES;
use super::forest::{shuffle_indices, RandomForest};
use super::scaler::StandardScaler;
use super::scorer::{TrainedArtifact, CLASSIFIER_FILE, SCALER_FILE};

/// One OHLCV bar. Training only needs the range, close, and volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    #[error("only {rows} training rows engineered, need at least {min}")]
    InsufficientData { rows: usize, min: usize },
    #[error("history fetch for {instrument} failed: {detail}")]
    Fetch { instrument: String, detail: String },
    #[error("failed to persist model artifacts")]
    Persist(#[from] std::io::Error),
    #[error("failed to encode model artifacts")]
    Encode(#[from] serde_json::Error),
}

/// Source of historical candles for feature engineering.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn fetch_candles(
        &self,
        instrument: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, TrainError>;
}

/// Candle history from the Binance klines endpoint.
#[derive(Debug, Clone)]
pub struct BinanceHistory {
    http: Client,
    base_url: String,
}

impl BinanceHistory {
    pub fn new() -> Result<Self> {
        Self::with_base_url("https://api.binance.com")
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
        })
    }
}

/// Kline rows are positional JSON arrays; index 2/3/4/5 are
/// high/low/close/volume as strings.
fn parse_kline(row: &[serde_json::Value]) -> Option<Candle> {
    let field = |i: usize| row.get(i)?.as_str()?.parse::<f64>().ok();
    Some(Candle {
        high: field(2)?,
        low: field(3)?,
        close: field(4)?,
        volume: field(5)?,
    })
}

#[async_trait]
impl HistoryProvider for BinanceHistory {
    #[instrument(skip(self), name = "fetch_klines")]
    async fn fetch_candles(
        &self,
        instrument: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Candle>, TrainError> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url, instrument, interval, limit
        );

        let response = self.http.get(&url).send().await.map_err(|e| {
            TrainError::Fetch {
                instrument: instrument.to_string(),
                detail: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrainError::Fetch {
                instrument: instrument.to_string(),
                detail: status.to_string(),
            });
        }

        let rows: Vec<Vec<serde_json::Value>> =
            response.json().await.map_err(|e| TrainError::Fetch {
                instrument: instrument.to_string(),
                detail: e.to_string(),
            })?;

        Ok(rows.iter().filter_map(|r| parse_kline(r)).collect())
    }
}

/// Trains the spread classifier and persists its artifact pair.
pub struct ModelTrainer {
    config: TrainingConfig,
}

impl ModelTrainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Fetch history for every configured instrument, engineer features,
    /// and fit a forest. Instruments that fail to fetch are skipped; the
    /// run only fails when the surviving rows cannot support training.
    pub async fn train(
        &self,
        history: &dyn HistoryProvider,
    ) -> Result<TrainedArtifact, TrainError> {
        let mut rows: Vec<[f64; N_FEATURES]> = Vec::new();
        let mut labels: Vec<bool> = Vec::new();

        for instrument in &self.config.instruments {
            match history
                .fetch_candles(
                    instrument,
                    &self.config.candle_interval,
                    self.config.lookback_candles,
                )
                .await
            {
                Ok(candles) => {
                    let before = rows.len();
                    engineer_features(
                        &candles,
                        self.config.volatility_window,
                        &mut rows,
                        &mut labels,
                    );
                    info!(
                        instrument = %instrument,
                        candles = candles.len(),
                        rows = rows.len() - before,
                        "Engineered training rows"
                    );
                }
                Err(e) => {
                    warn!(instrument = %instrument, error = %e, "Skipping instrument");
                }
            }
        }

        // The held-out split needs at least one row on each side, so two
        // rows is the floor no matter how low min_samples is configured.
        let min_required = self.config.min_samples.max(2);
        if rows.len() < min_required {
            return Err(TrainError::InsufficientData {
                rows: rows.len(),
                min: min_required,
            });
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let order = shuffle_indices(rows.len(), &mut rng);
        let test_len = ((rows.len() as f64 * self.config.test_fraction).round() as usize)
            .clamp(1, rows.len() - 1);
        let (test_idx, train_idx) = order.split_at(test_len);

        let train_rows: Vec<[f64; N_FEATURES]> = train_idx.iter().map(|&i| rows[i]).collect();
        let train_labels: Vec<bool> = train_idx.iter().map(|&i| labels[i]).collect();

        let scaler = StandardScaler::fit(&train_rows);
        let scaled_train: Vec<[f64; N_FEATURES]> =
            train_rows.iter().map(|r| scaler.transform(r)).collect();

        let forest = RandomForest::fit(&scaled_train, &train_labels, self.config.trees, &mut rng);

        let correct = test_idx
            .iter()
            .filter(|&&i| forest.predict(&scaler.transform(&rows[i])) == labels[i])
            .count();
        let accuracy = correct as f64 / test_len as f64;

        info!(
            rows = rows.len(),
            train = train_idx.len(),
            test = test_len,
            accuracy = format!("{:.3}", accuracy),
            trees = self.config.trees,
            "Training complete"
        );

        Ok(TrainedArtifact { forest, scaler })
    }

    /// Write the artifact pair to `dir` as JSON.
    pub fn persist(artifact: &TrainedArtifact, dir: &Path) -> Result<(), TrainError> {
        std::fs::create_dir_all(dir)?;
        std::fs::write(
            dir.join(CLASSIFIER_FILE),
            serde_json::to_string(&artifact.forest)?,
        )?;
        std::fs::write(
            dir.join(SCALER_FILE),
            serde_json::to_string(&artifact.scaler)?,
        )?;
        info!(dir = %dir.display(), "Model artifacts persisted");
        Ok(())
    }
}

/// Turn a candle series into labeled feature rows.
///
/// Each row describes one candle: its intra-bar spread proxy, the sample
/// standard deviation of the preceding `window` close-to-close returns,
/// and a log volume proxy. The label marks candles where a wide spread
/// coincided with a positive return into the bar.
fn engineer_features(
    candles: &[Candle],
    window: usize,
    rows: &mut Vec<[f64; N_FEATURES]>,
    labels: &mut Vec<bool>,
) {
    if candles.len() <= window {
        return;
    }

    let returns: Vec<f64> = candles
        .windows(2)
        .map(|w| {
            if w[0].close > 0.0 {
                (w[1].close - w[0].close) / w[0].close
            } else {
                0.0
            }
        })
        .collect();

    for c in window..candles.len() {
        let candle = &candles[c];
        if candle.low <= 0.0 {
            continue;
        }

        let spread_proxy = (candle.high - candle.low) / candle.low * 100.0;
        let volatility = sample_std(&returns[c - window..c]);
        let liquidity = (candle.volume + 1.0).ln();
        let ret = returns[c - 1];

        rows.push([spread_proxy, volatility, liquidity]);
        labels.push(spread_proxy > 0.5 && ret > 0.0);
    }
}

/// Sample standard deviation (n - 1 denominator).
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|v| {
            let dev = v - mean;
            dev * dev
        })
        .sum::<f64>()
        / (n - 1.0);
    variance.sqrt()
}
