//! Confidence model: feature extraction, training, and scoring.

pub mod features;
pub mod forest;
pub mod scaler;
pub mod scorer;
pub mod trainer;

pub use features::{FeatureVector, N_FEATURES};
pub use forest::RandomForest;
pub use scaler::StandardScaler;
pub use scorer::{fallback_score, Scorer, TrainedArtifact, CLASSIFIER_FILE, SCALER_FILE};
pub use trainer::{BinanceHistory, Candle, HistoryProvider, ModelTrainer, TrainError};
