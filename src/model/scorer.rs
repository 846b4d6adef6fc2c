//! Confidence scoring with hot-swappable trained artifacts.

use arc_swap::ArcSwapOption;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use serde::{Deserialize, Serialize};

use super::features::FeatureVector;
use super::forest::RandomForest;
use super::scaler::StandardScaler;

pub const CLASSIFIER_FILE: &str = "classifier.json";
pub const SCALER_FILE: &str = "scaler.json";

/// A classifier and the scaler it was fitted with. The two are only
/// meaningful together, so they load and swap as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedArtifact {
    pub forest: RandomForest,
    pub scaler: StandardScaler,
}

/// Scores opportunities on a 0-100 scale.
///
/// When a trained artifact is installed the score is the forest's
/// probability; otherwise a deterministic heuristic keeps scores
/// flowing. Artifact installation is an atomic pointer swap, so a
/// training run finishing mid-cycle never blocks scoring.
pub struct Scorer {
    artifact: ArcSwapOption<TrainedArtifact>,
}

impl Scorer {
    pub fn new() -> Self {
        Self {
            artifact: ArcSwapOption::const_empty(),
        }
    }

    pub fn is_trained(&self) -> bool {
        self.artifact.load().is_some()
    }

    pub fn install(&self, artifact: TrainedArtifact) {
        self.artifact.store(Some(Arc::new(artifact)));
        info!("Trained model installed");
    }

    /// Load a persisted artifact pair from `dir`. Both files must be
    /// present and valid; anything less leaves the fallback in place.
    pub fn load_from_dir(&self, dir: &Path) -> bool {
        let classifier_path = dir.join(CLASSIFIER_FILE);
        let scaler_path = dir.join(SCALER_FILE);

        let forest = match std::fs::read_to_string(&classifier_path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str::<RandomForest>(&s).map_err(|e| e.to_string()))
        {
            Ok(forest) => forest,
            Err(e) => {
                warn!(path = %classifier_path.display(), error = %e, "No usable classifier, using fallback scoring");
                return false;
            }
        };

        let scaler = match std::fs::read_to_string(&scaler_path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str::<StandardScaler>(&s).map_err(|e| e.to_string()))
        {
            Ok(scaler) => scaler,
            Err(e) => {
                warn!(path = %scaler_path.display(), error = %e, "Classifier present but scaler missing, using fallback scoring");
                return false;
            }
        };

        self.install(TrainedArtifact { forest, scaler });
        true
    }

    /// Score a feature vector. Trained: forest probability as a
    /// percentage, rounded to two decimals. Untrained: heuristic capped
    /// at 99 so an unscored opportunity never claims certainty.
    pub fn score(&self, features: &FeatureVector) -> f64 {
        match self.artifact.load().as_ref() {
            Some(artifact) => {
                let scaled = artifact.scaler.transform(&features.as_array());
                let p = artifact.forest.predict_proba(&scaled);
                ((p * 100.0 * 100.0).round() / 100.0).clamp(0.0, 100.0)
            }
            None => fallback_score(features.spread_pct, features.volatility),
        }
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Heuristic score: wider spreads help, dispersion across venues hurts.
pub fn fallback_score(spread_pct: f64, volatility: f64) -> f64 {
    (50.0 + spread_pct * 10.0 - volatility * 100.0).clamp(0.0, 99.0)
}
