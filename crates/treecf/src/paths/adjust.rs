//! Minimal input adjustments that redirect a sample along a chosen path.

use std::collections::BTreeMap;

use ndarray::{Array1, ArrayView1};

use super::{DecisionPath, Direction};
use crate::cost::Regularizer;
use crate::repr::NodeId;

/// Sparse feature overrides, ordered by feature index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Adjustment {
    values: BTreeMap<usize, f64>,
}

impl Adjustment {
    /// Replacement value for `feature`, if it is adjusted.
    #[inline]
    pub fn get(&self, feature: usize) -> Option<f64> {
        self.values.get(&feature).copied()
    }

    /// Set the replacement value of `feature`, overwriting any earlier one.
    pub fn set(&mut self, feature: usize, value: f64) {
        self.values.insert(feature, value);
    }

    /// Number of adjusted features.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if no feature is adjusted.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(feature, value)` pairs in feature order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values.iter().map(|(&f, &v)| (f, v))
    }

    /// Copy of `x` with the adjusted features overwritten.
    pub fn apply(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        let mut out = x.to_owned();
        for (feature, value) in self.iter() {
            if let Some(slot) = out.get_mut(feature) {
                *slot = value;
            }
        }
        out
    }

    /// `apply(x) - x`, dense.
    pub fn delta(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        let mut delta = Array1::zeros(x.len());
        for (feature, value) in self.iter() {
            if let (Some(d), Some(&orig)) = (delta.get_mut(feature), x.get(feature)) {
                *d = value - orig;
            }
        }
        delta
    }
}

/// An adjustment together with its regularization cost and target leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAdjustment {
    pub cost: f64,
    /// Leaf the adjusted sample reaches.
    pub leaf: NodeId,
    /// Length of the targeted path.
    pub path_len: usize,
    pub adjustment: Adjustment,
}

/// Largest value strictly below `threshold`, preferring `threshold - margin`.
///
/// Falls back to the adjacent representable float when the margin is lost to
/// rounding (large thresholds).
pub(crate) fn step_below(threshold: f64, margin: f64) -> f64 {
    let candidate = threshold - margin;
    if candidate < threshold {
        return candidate;
    }
    next_below(threshold)
}

fn next_below(value: f64) -> f64 {
    if value.is_nan() || value == f64::NEG_INFINITY {
        return value;
    }
    if value == 0.0 {
        return -f64::from_bits(1);
    }
    let bits = value.to_bits();
    if value > 0.0 {
        f64::from_bits(bits - 1)
    } else {
        f64::from_bits(bits + 1)
    }
}

/// Compute the adjustment that sends `x` along each candidate path.
///
/// Steps shared with `current_path` (the path `x` already follows) are
/// skipped. Every other step is checked against the running value of its
/// feature; a step that disagrees moves the feature onto the threshold
/// (`Right`) or `margin` below it (`Left`). The last assignment to a feature
/// wins.
///
/// Results are sorted by ascending cost; ties keep candidate order. Without a
/// regularizer every cost is zero.
pub fn score_adjustments<'p, I>(
    x: ArrayView1<'_, f64>,
    current_path: &DecisionPath,
    candidates: I,
    regularizer: Option<&dyn Regularizer>,
    margin: f64,
) -> Vec<ScoredAdjustment>
where
    I: IntoIterator<Item = &'p DecisionPath>,
{
    let mut scored: Vec<ScoredAdjustment> = candidates
        .into_iter()
        .map(|path| {
            let adjustment = adjust_to_path(x, current_path, path, margin);
            let cost = match regularizer {
                Some(reg) if !adjustment.is_empty() => reg.cost(adjustment.delta(x).view()),
                _ => 0.0,
            };
            ScoredAdjustment {
                cost,
                leaf: path.leaf(),
                path_len: path.len(),
                adjustment,
            }
        })
        .collect();

    // Stable
    scored.sort_by(|a, b| a.cost.total_cmp(&b.cost));
    scored
}

fn adjust_to_path(
    x: ArrayView1<'_, f64>,
    current_path: &DecisionPath,
    path: &DecisionPath,
    margin: f64,
) -> Adjustment {
    let shared = current_path.common_prefix_len(path);
    let mut adjustment = Adjustment::default();

    for step in &path.steps()[shared..] {
        let value = adjustment
            .get(step.feature)
            .or_else(|| x.get(step.feature).copied())
            .unwrap_or(f64::NAN);
        if step.is_satisfied_by(value) {
            continue;
        }
        let target = match step.direction {
            Direction::Right => step.threshold,
            Direction::Left => step_below(step.threshold, margin),
        };
        adjustment.set(step.feature, target);
    }

    adjustment
}
