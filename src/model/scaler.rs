//! Feature standardization fitted on training data.

use serde::{Deserialize, Serialize};

use super::features::N_FEATURES;

/// Per-feature zero-mean unit-variance scaling, persisted alongside the
/// classifier so live features pass through the same transform the
/// training rows did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: [f64; N_FEATURES],
    stds: [f64; N_FEATURES],
}

impl StandardScaler {
    /// Fit means and population standard deviations per feature column.
    /// Zero-variance columns scale by 1.0 so they pass through centered.
    pub fn fit(rows: &[[f64; N_FEATURES]]) -> Self {
        let n = rows.len().max(1) as f64;
        let mut means = [0.0; N_FEATURES];
        let mut stds = [1.0; N_FEATURES];

        for feature in 0..N_FEATURES {
            let mean = rows.iter().map(|r| r[feature]).sum::<f64>() / n;
            let variance = rows
                .iter()
                .map(|r| {
                    let dev = r[feature] - mean;
                    dev * dev
                })
                .sum::<f64>()
                / n;
            means[feature] = mean;
            if variance > 0.0 {
                stds[feature] = variance.sqrt();
            }
        }

        Self { means, stds }
    }

    pub fn transform(&self, row: &[f64; N_FEATURES]) -> [f64; N_FEATURES] {
        let mut scaled = [0.0; N_FEATURES];
        for feature in 0..N_FEATURES {
            scaled[feature] = (row[feature] - self.means[feature]) / self.stds[feature];
        }
        scaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_centers_and_scales() {
        let rows = vec![[1.0, 10.0, 0.0], [3.0, 10.0, 0.0]];
        let scaler = StandardScaler::fit(&rows);

        let low = scaler.transform(&rows[0]);
        let high = scaler.transform(&rows[1]);

        assert!((low[0] + 1.0).abs() < 1e-12);
        assert!((high[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_constant_column_passes_through_centered() {
        let rows = vec![[1.0, 10.0, 0.0], [3.0, 10.0, 0.0]];
        let scaler = StandardScaler::fit(&rows);

        let scaled = scaler.transform(&[2.0, 10.0, 0.0]);

        assert_eq!(scaled[1], 0.0);
    }

    #[test]
    fn test_round_trip_through_json() {
        let rows = vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let scaler = StandardScaler::fit(&rows);

        let encoded = serde_json::to_string(&scaler).unwrap();
        let decoded: StandardScaler = serde_json::from_str(&encoded).unwrap();

        assert_eq!(scaler.transform(&rows[1]), decoded.transform(&rows[1]));
    }
}
