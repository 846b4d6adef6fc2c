//! Random forest classifier over the three-feature opportunity vector.
//!
//! Bootstrap-sampled Gini decision trees averaged into a probability.
//! Small enough to serialize as JSON and rebuild from scratch on each
//! training run.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::features::N_FEATURES;

const MAX_DEPTH: usize = 8;
const MIN_SAMPLES_SPLIT: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        probability: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn fit(rows: &[[f64; N_FEATURES]], labels: &[bool], indices: &[usize]) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(rows, labels, indices, 0);
        tree
    }

    /// Grow a subtree from `indices`, returning the root node's slot.
    fn grow(
        &mut self,
        rows: &[[f64; N_FEATURES]],
        labels: &[bool],
        indices: &[usize],
        depth: usize,
    ) -> usize {
        let positives = indices.iter().filter(|&&i| labels[i]).count();
        let probability = positives as f64 / indices.len().max(1) as f64;

        let is_pure = positives == 0 || positives == indices.len();
        if depth >= MAX_DEPTH || indices.len() < MIN_SAMPLES_SPLIT || is_pure {
            self.nodes.push(Node::Leaf { probability });
            return self.nodes.len() - 1;
        }

        let Some((feature, threshold)) = best_split(rows, labels, indices) else {
            self.nodes.push(Node::Leaf { probability });
            return self.nodes.len() - 1;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| rows[i][feature] <= threshold);

        // Reserve the split's slot before growing children so child
        // indices are known when the node is filled in.
        let slot = self.nodes.len();
        self.nodes.push(Node::Leaf { probability });

        let left = self.grow(rows, labels, &left_idx, depth + 1);
        let right = self.grow(rows, labels, &right_idx, depth + 1);
        self.nodes[slot] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        slot
    }

    fn predict_proba(&self, row: &[f64; N_FEATURES]) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { probability } => return *probability,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Best (feature, threshold) by weighted Gini impurity, or `None` when no
/// feature separates the rows.
fn best_split(
    rows: &[[f64; N_FEATURES]],
    labels: &[bool],
    indices: &[usize],
) -> Option<(usize, f64)> {
    let total = indices.len();
    let total_positives = indices.iter().filter(|&&i| labels[i]).count();
    let mut best: Option<(usize, f64)> = None;
    let mut best_impurity = f64::INFINITY;

    for feature in 0..N_FEATURES {
        let mut sorted: Vec<usize> = indices.to_vec();
        sorted.sort_by(|&a, &b| {
            rows[a][feature]
                .partial_cmp(&rows[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left_positives = 0usize;
        for (left_count, window) in sorted.windows(2).enumerate() {
            let (lo, hi) = (window[0], window[1]);
            if labels[lo] {
                left_positives += 1;
            }
            // No threshold exists between equal values.
            if rows[lo][feature] == rows[hi][feature] {
                continue;
            }

            let left_n = left_count + 1;
            let right_n = total - left_n;
            let right_positives = total_positives - left_positives;

            let impurity = weighted_gini(left_n, left_positives, right_n, right_positives);
            if impurity < best_impurity {
                best_impurity = impurity;
                best = Some((feature, (rows[lo][feature] + rows[hi][feature]) / 2.0));
            }
        }
    }

    best
}

fn weighted_gini(left_n: usize, left_pos: usize, right_n: usize, right_pos: usize) -> f64 {
    let gini = |n: usize, pos: usize| {
        if n == 0 {
            return 0.0;
        }
        let p = pos as f64 / n as f64;
        2.0 * p * (1.0 - p)
    };
    let total = (left_n + right_n) as f64;
    (left_n as f64 * gini(left_n, left_pos) + right_n as f64 * gini(right_n, right_pos)) / total
}

/// Ensemble of bootstrap-trained decision trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Train `n_trees` trees on bootstrap resamples drawn from a seeded
    /// generator, so identical inputs always produce identical forests.
    pub fn fit(
        rows: &[[f64; N_FEATURES]],
        labels: &[bool],
        n_trees: usize,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        if rows.is_empty() {
            return Self { trees: Vec::new() };
        }

        let trees = (0..n_trees)
            .map(|_| {
                let sample: Vec<usize> =
                    (0..rows.len()).map(|_| rng.gen_range(0..rows.len())).collect();
                DecisionTree::fit(rows, labels, &sample)
            })
            .collect();

        Self { trees }
    }

    /// Mean leaf probability across the ensemble, in [0, 1].
    pub fn predict_proba(&self, row: &[f64; N_FEATURES]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees
            .iter()
            .map(|tree| tree.predict_proba(row))
            .sum::<f64>()
            / self.trees.len() as f64
    }

    pub fn predict(&self, row: &[f64; N_FEATURES]) -> bool {
        self.predict_proba(row) >= 0.5
    }
}

/// Deterministic in-place shuffle used for the train/test split.
pub fn shuffle_indices(len: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    indices.shuffle(rng);
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn separable_data() -> (Vec<[f64; N_FEATURES]>, Vec<bool>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let jitter = (i % 7) as f64 * 0.01;
            rows.push([2.0 + jitter, 0.1, 5.0]);
            labels.push(true);
            rows.push([0.1 + jitter, 0.9, 5.0]);
            labels.push(false);
        }
        (rows, labels)
    }

    #[test]
    fn test_forest_learns_separable_data() {
        let (rows, labels) = separable_data();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let forest = RandomForest::fit(&rows, &labels, 20, &mut rng);

        assert!(forest.predict(&[2.5, 0.1, 5.0]));
        assert!(!forest.predict(&[0.05, 0.9, 5.0]));
        assert!(forest.predict_proba(&[2.5, 0.1, 5.0]) > 0.9);
        assert!(forest.predict_proba(&[0.05, 0.9, 5.0]) < 0.1);
    }

    #[test]
    fn test_proba_stays_in_unit_interval() {
        let (rows, labels) = separable_data();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let forest = RandomForest::fit(&rows, &labels, 10, &mut rng);

        for probe in [[0.0, 0.0, 0.0], [100.0, -5.0, 1e9], [1.0, 0.5, 5.0]] {
            let p = forest.predict_proba(&probe);
            assert!((0.0..=1.0).contains(&p), "probability {p} out of range");
        }
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (rows, labels) = separable_data();
        let forest_a =
            RandomForest::fit(&rows, &labels, 15, &mut ChaCha8Rng::seed_from_u64(99));
        let forest_b =
            RandomForest::fit(&rows, &labels, 15, &mut ChaCha8Rng::seed_from_u64(99));

        for probe in [[1.1, 0.3, 4.0], [2.2, 0.05, 6.0], [0.4, 0.7, 5.5]] {
            assert_eq!(forest_a.predict_proba(&probe), forest_b.predict_proba(&probe));
        }
    }

    #[test]
    fn test_empty_training_set_yields_inert_forest() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let forest = RandomForest::fit(&[], &[], 10, &mut rng);

        assert_eq!(forest.predict_proba(&[1.0, 1.0, 1.0]), 0.0);
    }
}
