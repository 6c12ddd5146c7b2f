//! Counterfactual search for isolation forests.
//!
//! # Overview
//!
//! A counterfactual of `x` for a target label is a nearby input the forest
//! assigns that label. The search:
//!
//! 1. validates the forest, configuration and input,
//! 2. derives starting points from the tree structure ([`CandidateGenerator`]),
//! 3. runs the minimizer on `regularization(x' - x) + C * loss(x')` for every
//!    (starting point, C) pair in [`SearchPlan`] order,
//! 4. returns the first result the acceptance predicate approves.
//!
//! # Key Types
//!
//! - [`CounterfactualConfig`] - Search configuration
//! - [`CounterfactualSearch`] - Search engine bound to a forest
//! - [`Counterfactual`] - Accepted result
//! - [`CounterfactualError`] - Everything that can go wrong

mod candidates;
mod config;
mod search;

pub use candidates::CandidateGenerator;
pub use config::{
    Acceptance, CValues, ConfigError, CounterfactualConfig, SearchOrder,
    DEFAULT_ADJUSTMENT_MARGIN, DEFAULT_PATH_LENGTH_TOLERANCE,
};
pub use search::{generate_counterfactual, Attempt, CounterfactualSearch, SearchPlan};

use ndarray::Array1;

use crate::cost::UnknownRegularization;
use crate::optim::{OptimError, UnknownOptimizer};
use crate::paths::PathError;
use crate::repr::{ForestValidationError, Label};

/// Errors raised by the counterfactual search.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CounterfactualError {
    /// The forest failed structural validation.
    #[error("invalid model: {0}")]
    InvalidModel(#[from] ForestValidationError),

    /// A signed label other than `-1` or `+1`.
    #[error("invalid label {0} (expected -1 or +1)")]
    InvalidLabel(i8),

    #[error("unknown regularization {name:?} (expected \"l1\" or \"l2\")")]
    InvalidRegularization { name: String },

    #[error("unknown optimizer {name:?} (expected \"nelder-mead\" or \"bfgs\")")]
    InvalidOptimizer { name: String },

    /// The optimizer needs gradients the isolation-forest loss cannot provide.
    #[error("optimizer {optimizer:?} requires gradients, but the isolation forest loss is not differentiable")]
    GradientUnavailable { optimizer: String },

    #[error("input has {actual} features, model expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("input value at index {index} is not finite")]
    NonFiniteInput { index: usize },

    #[error("whitelisted feature {index} is out of range ({n_features} features)")]
    WhitelistOutOfRange { index: usize, n_features: usize },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("path extraction failed: {0}")]
    Path(#[from] PathError),

    #[error("optimizer failed: {0}")]
    Optimizer(#[from] OptimError),

    /// Every (starting point, C) pair was tried without an accepted result.
    #[error("no counterfactual found after {attempts} attempts")]
    NotFound { attempts: usize },
}

impl From<UnknownRegularization> for CounterfactualError {
    fn from(err: UnknownRegularization) -> Self {
        Self::InvalidRegularization { name: err.name }
    }
}

impl From<UnknownOptimizer> for CounterfactualError {
    fn from(err: UnknownOptimizer) -> Self {
        Self::InvalidOptimizer { name: err.name }
    }
}

/// Accepted counterfactual.
#[derive(Debug, Clone, PartialEq)]
pub struct Counterfactual {
    /// The modified input.
    pub counterfactual: Array1<f64>,
    /// Forest prediction for `counterfactual`.
    pub prediction: Label,
    /// `counterfactual - x`.
    pub delta: Array1<f64>,
    /// Number of minimizer runs, including the accepted one.
    pub attempts: usize,
}

impl Counterfactual {
    /// `(counterfactual, prediction, delta)`.
    pub fn into_triple(self) -> (Array1<f64>, Label, Array1<f64>) {
        (self.counterfactual, self.prediction, self.delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_convert() {
        let err: CounterfactualError = "l3"
            .parse::<crate::cost::RegularizationSpec>()
            .unwrap_err()
            .into();
        assert_eq!(err, CounterfactualError::InvalidRegularization { name: "l3".into() });

        let err: CounterfactualError = "sgd"
            .parse::<crate::optim::OptimizerSpec>()
            .unwrap_err()
            .into();
        assert_eq!(err, CounterfactualError::InvalidOptimizer { name: "sgd".into() });
    }

    #[test]
    fn invalid_signed_label() {
        let err = Label::try_from(0i8).map_err(CounterfactualError::InvalidLabel);
        assert_eq!(err, Err(CounterfactualError::InvalidLabel(0)));
        assert_eq!(err.unwrap_err().to_string(), "invalid label 0 (expected -1 or +1)");
    }
}
