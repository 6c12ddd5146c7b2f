//! Starting points derived from the forest structure.

use ndarray::{Array1, ArrayView1};

use super::config::{DEFAULT_ADJUSTMENT_MARGIN, DEFAULT_PATH_LENGTH_TOLERANCE};
use crate::cost::Regularizer;
use crate::paths::{decision_path, extract_leaf_paths, score_adjustments, PathError};
use crate::repr::{IsolationForest, Label};

/// Proposes starting points for the search.
///
/// For every tree, the input is moved onto the leaves whose path length is
/// close to the one the target label calls for: the shortest path for
/// outliers, the longest for inliers. Within a tree, candidates are ordered
/// by regularization cost.
pub struct CandidateGenerator<'a> {
    forest: &'a IsolationForest,
    target: Label,
    regularizer: Option<&'a dyn Regularizer>,
    whitelist: Option<&'a [usize]>,
    tolerance: usize,
    margin: f64,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(forest: &'a IsolationForest, target: Label) -> Self {
        Self {
            forest,
            target,
            regularizer: None,
            whitelist: None,
            tolerance: DEFAULT_PATH_LENGTH_TOLERANCE,
            margin: DEFAULT_ADJUSTMENT_MARGIN,
        }
    }

    /// Rank adjustments within a tree by this regularizer.
    pub fn with_regularizer(mut self, regularizer: Option<&'a dyn Regularizer>) -> Self {
        self.regularizer = regularizer;
        self
    }

    /// Drop candidates that change features outside `whitelist`.
    pub fn with_whitelist(mut self, whitelist: Option<&'a [usize]>) -> Self {
        self.whitelist = whitelist;
        self
    }

    /// Keep leaves with `|len - target_len| < tolerance`.
    pub fn with_tolerance(mut self, tolerance: usize) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Distance kept below a threshold when moving left of a split.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Starting points for `x`, beginning with `x` itself.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if a tree of the forest is malformed.
    pub fn generate(&self, x: ArrayView1<'_, f64>) -> Result<Vec<Array1<f64>>, PathError> {
        let mut candidates = vec![x.to_owned()];

        for (tree_idx, tree) in self.forest.trees().iter().enumerate() {
            let paths = extract_leaf_paths(tree)?;
            let lengths = paths.iter().map(|p| p.len());
            let target_len = match self.target {
                Label::Outlier => lengths.min(),
                Label::Inlier => lengths.max(),
            }
            .unwrap_or(0);

            let current = decision_path(tree, &x);
            let near_target = paths
                .iter()
                .filter(|p| p.len().abs_diff(target_len) < self.tolerance);

            let before = candidates.len();
            candidates.extend(
                score_adjustments(x, &current, near_target, self.regularizer, self.margin)
                    .into_iter()
                    .map(|scored| scored.adjustment.apply(x))
                    .filter(|candidate| self.respects_whitelist(x, candidate.view())),
            );

            log::debug!(
                "tree {}: {} candidates (target path length {})",
                tree_idx,
                candidates.len() - before,
                target_len
            );
        }

        Ok(candidates)
    }

    fn respects_whitelist(&self, x: ArrayView1<'_, f64>, candidate: ArrayView1<'_, f64>) -> bool {
        let Some(whitelist) = self.whitelist else {
            return true;
        };
        x.iter()
            .zip(candidate.iter())
            .enumerate()
            .all(|(i, (a, b))| a == b || whitelist.contains(&i))
    }
}
