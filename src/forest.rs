use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use thiserror::Error;

use crate::tree::{DecisionTree, TreeConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("model has not been fitted")]
    NotFitted,
    #[error("feature mismatch: model expects {expected:?}, got {actual:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("{rows} feature rows but {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },
}

/// Bagged regression trees. Every tree stays individually queryable so callers can look at the
/// spread of the ensemble, not just its mean.
#[derive(Debug, Clone)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    feature_names: Vec<String>,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            feature_names: Vec::new(),
            feature_importances: Vec::new(),
        }
    }

    pub fn fit(
        &mut self,
        feature_names: &[&str],
        features: &[Vec<f64>],
        labels: &[f64],
    ) -> Result<(), ModelError> {
        if features.len() != labels.len() {
            return Err(ModelError::LengthMismatch {
                rows: features.len(),
                labels: labels.len(),
            });
        }
        if labels.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if let Some(row) = features.iter().find(|row| row.len() != feature_names.len()) {
            return Err(ModelError::FeatureMismatch {
                expected: feature_names.iter().map(|s| s.to_string()).collect(),
                actual: (0..row.len()).map(|i| format!("column {i}")).collect(),
            });
        }

        self.feature_names = feature_names.iter().map(|s| s.to_string()).collect();
        let n_samples = labels.len();
        let config = self.config;

        // Each tree owns its seed, so parallel fitting stays reproducible.
        self.trees = (0..config.n_trees.max(1))
            .into_par_iter()
            .map(|i| {
                let seed = config.seed.wrapping_add(i as u64);
                let mut tree = DecisionTree::new(TreeConfig {
                    max_depth: config.max_depth,
                    min_samples_split: config.min_samples_split,
                    min_samples_leaf: config.min_samples_leaf,
                    max_features: config.max_features,
                    seed,
                });
                if config.bootstrap {
                    let sample = bootstrap_indices(n_samples, seed);
                    tree.fit_indices(features, labels, &sample);
                } else {
                    tree.fit(features, labels);
                }
                tree
            })
            .collect();

        let n_features = feature_names.len();
        let mut importances = vec![0.0; n_features];
        for tree in &self.trees {
            for (slot, imp) in importances.iter_mut().zip(tree.feature_importances()) {
                *slot += imp;
            }
        }
        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut importances {
                *imp /= sum;
            }
        }
        self.feature_importances = importances;

        tracing::debug!(
            trees = self.trees.len(),
            samples = n_samples,
            features = n_features,
            "forest fitted"
        );
        Ok(())
    }

    pub fn check_features(&self, names: &[&str]) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        let matches = names.len() == self.feature_names.len()
            && names.iter().zip(&self.feature_names).all(|(a, b)| *a == b);
        if matches {
            Ok(())
        } else {
            Err(ModelError::FeatureMismatch {
                expected: self.feature_names.clone(),
                actual: names.iter().map(|s| s.to_string()).collect(),
            })
        }
    }

    /// Mean of the per-tree predictions.
    pub fn predict_one(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: f64 = self.trees.iter().map(|t| t.predict_one(features)).sum();
        total / self.trees.len() as f64
    }

    pub fn predict_per_tree(&self, features: &[f64]) -> Vec<f64> {
        self.trees.iter().map(|t| t.predict_one(features)).collect()
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.par_iter().map(|row| self.predict_one(row)).collect()
    }

    pub fn estimators(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }
}

fn bootstrap_indices(n: usize, seed: u64) -> Vec<usize> {
    // Offset keeps the bootstrap stream independent of the tree's own split stream.
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x9E37_79B9_7F4A_7C15);
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..200 {
            let x1 = i as f64 / 20.0;
            let x2 = ((i * 7) % 13) as f64;
            features.push(vec![x1, x2]);
            labels.push(3.0 * x1 + 0.1 * (i % 5) as f64);
        }
        (features, labels)
    }

    fn small_forest(seed: u64) -> RandomForest {
        RandomForest::new(ForestConfig {
            n_trees: 12,
            seed,
            ..ForestConfig::default()
        })
    }

    #[test]
    fn fits_requested_number_of_trees() {
        let (features, labels) = linear_data();
        let mut forest = small_forest(42);
        forest.fit(&["x1", "x2"], &features, &labels).unwrap();

        assert_eq!(forest.n_trees(), 12);
        assert_eq!(forest.estimators().len(), 12);
        assert_eq!(forest.feature_importances().len(), 2);
        let sum: f64 = forest.feature_importances().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(forest.feature_importances()[0] > forest.feature_importances()[1]);
    }

    #[test]
    fn mean_of_trees_is_the_forest_prediction() {
        let (features, labels) = linear_data();
        let mut forest = small_forest(42);
        forest.fit(&["x1", "x2"], &features, &labels).unwrap();

        let x = [4.2, 6.0];
        let per_tree = forest.predict_per_tree(&x);
        let mean = per_tree.iter().sum::<f64>() / per_tree.len() as f64;
        assert!((forest.predict_one(&x) - mean).abs() < 1e-9);
        assert!((forest.predict_one(&x) - 12.6).abs() < 1.5);
    }

    #[test]
    fn same_seed_gives_identical_models() {
        let (features, labels) = linear_data();
        let mut a = small_forest(7);
        let mut b = small_forest(7);
        a.fit(&["x1", "x2"], &features, &labels).unwrap();
        b.fit(&["x1", "x2"], &features, &labels).unwrap();

        for row in features.iter().step_by(17) {
            assert_eq!(a.predict_one(row).to_bits(), b.predict_one(row).to_bits());
        }
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn feature_names_are_enforced() {
        let (features, labels) = linear_data();
        let mut forest = small_forest(1);
        assert_eq!(forest.check_features(&["x1", "x2"]), Err(ModelError::NotFitted));

        forest.fit(&["x1", "x2"], &features, &labels).unwrap();
        assert!(forest.check_features(&["x1", "x2"]).is_ok());
        assert!(matches!(
            forest.check_features(&["x2", "x1"]),
            Err(ModelError::FeatureMismatch { .. })
        ));
    }

    #[test]
    fn rejects_inconsistent_training_input() {
        let mut forest = small_forest(1);
        assert_eq!(
            forest.fit(&["x"], &[vec![1.0]], &[1.0, 2.0]),
            Err(ModelError::LengthMismatch { rows: 1, labels: 2 })
        );
        assert_eq!(forest.fit(&["x"], &[], &[]), Err(ModelError::EmptyTrainingSet));
    }
}
