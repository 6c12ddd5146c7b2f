//! Path-length loss and its regularized objective.

use ndarray::ArrayView1;

use super::{CostFunction, Regularizer};
use crate::repr::{IsolationForest, Label};

/// Signed mean decision-path length.
///
/// `loss(x) = -sign(target) * mean_t(edges_t(x))`. Outliers are isolated by
/// short paths and inliers by long ones, so minimizing the loss moves `x`
/// toward regions the forest labels `target`.
///
/// Piecewise constant in `x`: no gradient is available.
#[derive(Debug, Clone, Copy)]
pub struct IsolationForestLoss<'a> {
    forest: &'a IsolationForest,
    target: Label,
}

impl<'a> IsolationForestLoss<'a> {
    pub fn new(forest: &'a IsolationForest, target: Label) -> Self {
        Self { forest, target }
    }

    pub fn target(&self) -> Label {
        self.target
    }
}

impl CostFunction for IsolationForestLoss<'_> {
    fn score(&self, x: ArrayView1<'_, f64>) -> f64 {
        -self.target.sign() * self.forest.mean_decision_path_length(&x)
    }
}

/// `regularizer(x - origin) + c * loss(x)`.
///
/// Without a regularizer this is the bare loss and `c` has no effect.
pub struct RegularizedCost<'a> {
    loss: &'a dyn CostFunction,
    regularizer: Option<&'a dyn Regularizer>,
    origin: ArrayView1<'a, f64>,
    c: f64,
}

impl<'a> RegularizedCost<'a> {
    pub fn new(
        loss: &'a dyn CostFunction,
        regularizer: Option<&'a dyn Regularizer>,
        origin: ArrayView1<'a, f64>,
        c: f64,
    ) -> Self {
        Self {
            loss,
            regularizer,
            origin,
            c,
        }
    }
}

impl CostFunction for RegularizedCost<'_> {
    fn score(&self, x: ArrayView1<'_, f64>) -> f64 {
        match self.regularizer {
            Some(reg) => {
                let delta = &x - &self.origin;
                reg.cost(delta.view()) + self.c * self.loss.score(x)
            }
            None => self.loss.score(x),
        }
    }
}
