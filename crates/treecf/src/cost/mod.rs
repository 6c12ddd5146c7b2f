//! Objective functions for the counterfactual search.
//!
//! - [`CostFunction`]: black-box scalar objective consumed by minimizers
//! - [`Regularizer`]: penalty on the distance between a counterfactual and the input
//! - [`IsolationForestLoss`]: path-length loss pushing a sample toward a label
//! - [`RegularizedCost`]: `regularizer(x - origin) + C * loss(x)`

mod loss;
mod regularization;

pub use loss::{IsolationForestLoss, RegularizedCost};
pub use regularization::{
    L1Penalty, L2Penalty, RegularizationKind, RegularizationSpec, Regularizer,
    UnknownRegularization,
};

use ndarray::{Array1, ArrayView1};

/// Scalar objective over an input vector.
///
/// Implementations that can provide a gradient override [`gradient`] and
/// [`is_differentiable`]; derivative-free minimizers only call [`score`].
///
/// [`gradient`]: CostFunction::gradient
/// [`is_differentiable`]: CostFunction::is_differentiable
/// [`score`]: CostFunction::score
pub trait CostFunction {
    /// Evaluate the objective at `x`.
    fn score(&self, x: ArrayView1<'_, f64>) -> f64;

    /// Gradient at `x`, if available.
    fn gradient(&self, _x: ArrayView1<'_, f64>) -> Option<Array1<f64>> {
        None
    }

    /// Whether [`CostFunction::gradient`] returns values.
    fn is_differentiable(&self) -> bool {
        false
    }
}

impl<F> CostFunction for F
where
    F: Fn(ArrayView1<'_, f64>) -> f64,
{
    fn score(&self, x: ArrayView1<'_, f64>) -> f64 {
        self(x)
    }
}
