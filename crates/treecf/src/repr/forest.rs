//! Isolation forest ensemble.

use ndarray::ArrayView2;

use crate::data::SampleAccessor;
use crate::utils::Parallelism;

use super::label::Label;
use super::tree::{IsolationTree, TreeValidationError, TreeView};

/// Euler-Mascheroni constant.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Default anomaly score above which a sample is labelled an outlier.
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.5;

/// Average path length of an unsuccessful search in a binary search tree
/// built from `n` samples.
///
/// `c(n) = 2 H(n - 1) - 2 (n - 1) / n` with `H(i) ~ ln(i) + gamma`.
/// Used both to normalize forest path lengths and to correct the depth of
/// leaves that still hold more than one sample.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n_f = n as f64;
            2.0 * ((n_f - 1.0).ln() + EULER_GAMMA) - 2.0 * (n_f - 1.0) / n_f
        }
    }
}

/// Structural validation errors for [`IsolationForest`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForestValidationError {
    #[error("forest has no trees")]
    NoTrees,
    #[error("forest has no features")]
    NoFeatures,
    /// `c(1) = 0` would score every sample as an outlier.
    #[error("max_samples must be at least 2")]
    InvalidMaxSamples,
    #[error("score threshold must be finite, got {0}")]
    InvalidThreshold(f64),
    #[error("tree {tree_idx} splits on feature {feature} but the forest has {n_features} features")]
    FeatureOutOfRange {
        tree_idx: usize,
        feature: u32,
        n_features: usize,
    },
    #[error("tree {tree_idx} is invalid: {error}")]
    InvalidTree {
        tree_idx: usize,
        error: TreeValidationError,
    },
}

/// Fitted isolation forest.
///
/// Holds the member trees together with the sub-sample size they were grown
/// on, which normalizes the expected path length into an anomaly score in
/// `(0, 1]`. Samples scoring above the threshold are outliers.
#[derive(Debug, Clone, PartialEq)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    n_features: usize,
    max_samples: usize,
    threshold: f64,
}

impl IsolationForest {
    /// Create an empty forest over `n_features` features whose trees were
    /// grown on sub-samples of `max_samples` rows.
    pub fn new(n_features: usize, max_samples: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_features,
            max_samples,
            threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }

    /// Set the anomaly score threshold (builder pattern).
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Add a tree to the forest.
    pub fn push_tree(&mut self, tree: IsolationTree) {
        self.trees.push(tree);
    }

    /// Number of trees.
    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of input features.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Sub-sample size used to grow each tree.
    #[inline]
    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    /// Anomaly score threshold.
    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// All trees, in insertion order.
    #[inline]
    pub fn trees(&self) -> &[IsolationTree] {
        &self.trees
    }

    /// Validate structural invariants of the forest and all of its trees.
    pub fn validate(&self) -> Result<(), ForestValidationError> {
        if self.trees.is_empty() {
            return Err(ForestValidationError::NoTrees);
        }
        if self.n_features == 0 {
            return Err(ForestValidationError::NoFeatures);
        }
        if self.max_samples < 2 {
            return Err(ForestValidationError::InvalidMaxSamples);
        }
        if !self.threshold.is_finite() {
            return Err(ForestValidationError::InvalidThreshold(self.threshold));
        }

        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate()
                .map_err(|error| ForestValidationError::InvalidTree { tree_idx, error })?;

            if let Some(feature) = tree.max_split_index() {
                if feature as usize >= self.n_features {
                    return Err(ForestValidationError::FeatureOutOfRange {
                        tree_idx,
                        feature,
                        n_features: self.n_features,
                    });
                }
            }
        }

        Ok(())
    }

    // =========================================================================
    // Path lengths
    // =========================================================================

    /// Mean number of edges from the root to the reached leaf, over all trees.
    ///
    /// Returns 0 for an empty forest.
    pub fn mean_decision_path_length<S: SampleAccessor + ?Sized>(&self, sample: &S) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: usize = self
            .trees
            .iter()
            .map(|tree| tree.decision_path_length(sample))
            .sum();
        total as f64 / self.trees.len() as f64
    }

    /// Expected isolation depth `E[h(x)]`, where each tree contributes its
    /// edge count plus `c(n)` for the samples left in the reached leaf.
    pub fn expected_path_length<S: SampleAccessor + ?Sized>(&self, sample: &S) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| {
                let (leaf, depth) = tree.walk(sample);
                depth as f64 + average_path_length(tree.node_samples(leaf) as usize)
            })
            .sum();
        total / self.trees.len() as f64
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    /// Anomaly score `2^(-E[h(x)] / c(max_samples))`.
    ///
    /// Scores close to 1 indicate anomalies; scores well below 0.5 indicate
    /// normal samples.
    pub fn anomaly_score<S: SampleAccessor + ?Sized>(&self, sample: &S) -> f64 {
        let norm = average_path_length(self.max_samples);
        if norm <= 0.0 {
            return 1.0;
        }
        2f64.powf(-self.expected_path_length(sample) / norm)
    }

    /// Label a single sample.
    pub fn predict<S: SampleAccessor + ?Sized>(&self, sample: &S) -> Label {
        if self.anomaly_score(sample) > self.threshold {
            Label::Outlier
        } else {
            Label::Inlier
        }
    }

    /// Anomaly scores for every row of `samples` (shape `[n_samples, n_features]`).
    pub fn score_batch(&self, samples: ArrayView2<'_, f64>, parallelism: Parallelism) -> Vec<f64> {
        parallelism.maybe_par_map(samples.nrows(), |row| self.anomaly_score(&samples.row(row)))
    }

    /// Labels for every row of `samples` (shape `[n_samples, n_features]`).
    pub fn predict_batch(&self, samples: ArrayView2<'_, f64>, parallelism: Parallelism) -> Vec<Label> {
        parallelism.maybe_par_map(samples.nrows(), |row| self.predict(&samples.row(row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn build_tree(threshold: f64) -> IsolationTree {
        crate::isolation_tree! {
            0 => split(0, threshold) -> 1, 2,
            1 => split(0, -threshold) -> 3, 4,
            2 => leaf(1),
            3 => leaf(1),
            4 => leaf(4),
        }
    }

    fn forest() -> IsolationForest {
        let mut forest = IsolationForest::new(1, 4);
        forest.push_tree(build_tree(1.0));
        forest.push_tree(build_tree(2.0));
        forest
    }

    #[test]
    fn average_path_length_known_values() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // c(256) = 2 (ln 255 + gamma) - 2 * 255 / 256
        assert_abs_diff_eq!(average_path_length(256), 10.2448, epsilon = 1e-3);
    }

    #[test]
    fn mean_decision_path_length_averages_trees() {
        let forest = forest();
        // Tree 1: 1.5 >= 1.0 -> depth 1. Tree 2: 1.5 < 2, 1.5 >= -2 -> depth 2.
        assert_abs_diff_eq!(forest.mean_decision_path_length(&[1.5]), 1.5);
        assert_abs_diff_eq!(forest.mean_decision_path_length(&[0.0]), 2.0);
    }

    #[test]
    fn expected_path_length_adds_leaf_correction() {
        let forest = forest();
        let c4 = average_path_length(4);
        assert_abs_diff_eq!(forest.expected_path_length(&[0.0]), 2.0 + c4, epsilon = 1e-12);
    }

    #[test]
    fn predict_separates_inliers_and_outliers() {
        let forest = forest();
        assert_eq!(forest.predict(&[0.0]), Label::Inlier);
        assert_eq!(forest.predict(&[10.0]), Label::Outlier);
        assert!(forest.anomaly_score(&[10.0]) > forest.anomaly_score(&[0.0]));
    }

    #[test]
    fn threshold_controls_labels() {
        let strict = forest().with_threshold(0.99);
        assert_eq!(strict.predict(&[10.0]), Label::Inlier);
    }

    #[test]
    fn batch_matches_single() {
        let forest = forest();
        let samples = array![[0.0], [10.0], [-5.0], [1.5]];

        for parallelism in [Parallelism::Sequential, Parallelism::Parallel] {
            let labels = forest.predict_batch(samples.view(), parallelism);
            let scores = forest.score_batch(samples.view(), parallelism);
            for (i, row) in samples.rows().into_iter().enumerate() {
                assert_eq!(labels[i], forest.predict(&row));
                assert_abs_diff_eq!(scores[i], forest.anomaly_score(&row));
            }
        }
    }

    #[test]
    fn validate_forest() {
        assert!(forest().validate().is_ok());
        assert_eq!(IsolationForest::new(1, 4).validate(), Err(ForestValidationError::NoTrees));

        let mut wide = IsolationForest::new(1, 4);
        wide.push_tree(crate::isolation_tree! {
            0 => split(3, 0.0) -> 1, 2,
            1 => leaf(1),
            2 => leaf(1),
        });
        assert!(matches!(
            wide.validate(),
            Err(ForestValidationError::FeatureOutOfRange { tree_idx: 0, feature: 3, .. })
        ));

        let no_samples = {
            let mut f = IsolationForest::new(1, 0);
            f.push_tree(build_tree(1.0));
            f
        };
        assert_eq!(no_samples.validate(), Err(ForestValidationError::InvalidMaxSamples));
    }

    #[test]
    fn single_sample_forest_is_rejected() {
        let mut forest = IsolationForest::new(1, 1);
        forest.push_tree(build_tree(1.0));
        assert_eq!(forest.validate(), Err(ForestValidationError::InvalidMaxSamples));

        let mut forest = IsolationForest::new(1, 2);
        forest.push_tree(build_tree(1.0));
        assert!(forest.validate().is_ok());
    }
}
