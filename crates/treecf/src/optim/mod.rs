//! Black-box minimizers.
//!
//! The search only needs "start here, return a better point". Minimizers are
//! plugged in through the [`Minimizer`] trait; [`OptimizerSpec`] selects a
//! built-in one by name or wraps a custom implementation.

mod mask;
mod nelder_mead;

pub use mask::{InputMask, MaskedCost};
pub use nelder_mead::NelderMead;

use std::str::FromStr;
use std::sync::Arc;

use ndarray::{Array1, ArrayView1};

use crate::cost::CostFunction;

/// Errors raised by minimizers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptimError {
    #[error("starting point has non-finite value at index {index}")]
    NonFiniteStart { index: usize },
    #[error("objective is NaN at the starting point")]
    NanObjective,
    #[error("minimizer requires a gradient the objective does not provide")]
    GradientRequired,
    #[error("minimizer failed: {0}")]
    Failed(String),
}

/// Derivative-free or gradient-based minimizer.
pub trait Minimizer: Send + Sync {
    /// Minimize `cost` starting from `x0`, returning the best point found.
    fn minimize(
        &self,
        cost: &dyn CostFunction,
        x0: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, OptimError>;

    /// Whether the minimizer needs [`CostFunction::gradient`].
    fn requires_gradient(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "custom"
    }
}

// =============================================================================
// Named optimizers
// =============================================================================

/// Unrecognized optimizer name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown optimizer {name:?} (expected \"nelder-mead\" or \"bfgs\")")]
pub struct UnknownOptimizer {
    pub name: String,
}

/// Built-in optimizer names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OptimizerKind {
    #[default]
    NelderMead,
    /// Gradient-based. Reserved: no implementation ships with the crate, and
    /// the isolation-forest loss has no gradient.
    Bfgs,
}

impl OptimizerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NelderMead => "nelder-mead",
            Self::Bfgs => "bfgs",
        }
    }

    pub fn requires_gradient(self) -> bool {
        matches!(self, Self::Bfgs)
    }
}

impl FromStr for OptimizerKind {
    type Err = UnknownOptimizer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nelder-mead" | "nelder_mead" | "neldermead" => Ok(Self::NelderMead),
            "bfgs" => Ok(Self::Bfgs),
            _ => Err(UnknownOptimizer { name: s.to_string() }),
        }
    }
}

impl std::fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optimizer used by the search: a built-in one or a custom [`Minimizer`].
#[derive(Clone)]
pub enum OptimizerSpec {
    Named(OptimizerKind),
    Custom(Arc<dyn Minimizer>),
}

impl OptimizerSpec {
    /// Wrap a custom minimizer.
    pub fn custom(minimizer: impl Minimizer + 'static) -> Self {
        Self::Custom(Arc::new(minimizer))
    }

    pub fn requires_gradient(&self) -> bool {
        match self {
            Self::Named(kind) => kind.requires_gradient(),
            Self::Custom(inner) => inner.requires_gradient(),
        }
    }

    /// Minimizer for a derivative-free objective.
    ///
    /// Returns `None` when the optimizer needs gradients.
    pub fn resolve_derivative_free(&self) -> Option<Arc<dyn Minimizer>> {
        if self.requires_gradient() {
            return None;
        }
        match self {
            Self::Named(_) => Some(Arc::new(NelderMead::default())),
            Self::Custom(inner) => Some(Arc::clone(inner)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Named(kind) => kind.as_str(),
            Self::Custom(inner) => inner.name(),
        }
    }
}

impl Default for OptimizerSpec {
    fn default() -> Self {
        Self::Named(OptimizerKind::NelderMead)
    }
}

impl From<OptimizerKind> for OptimizerSpec {
    fn from(kind: OptimizerKind) -> Self {
        Self::Named(kind)
    }
}

impl FromStr for OptimizerSpec {
    type Err = UnknownOptimizer;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self::Named)
    }
}

impl std::fmt::Debug for OptimizerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(kind) => f.debug_tuple("Named").field(kind).finish(),
            Self::Custom(_) => f.debug_tuple("Custom").field(&"<dyn Minimizer>").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Identity;

    impl Minimizer for Identity {
        fn minimize(
            &self,
            _cost: &dyn CostFunction,
            x0: ArrayView1<'_, f64>,
        ) -> Result<Array1<f64>, OptimError> {
            Ok(x0.to_owned())
        }
    }

    struct NeedsGradient;

    impl Minimizer for NeedsGradient {
        fn minimize(
            &self,
            _cost: &dyn CostFunction,
            _x0: ArrayView1<'_, f64>,
        ) -> Result<Array1<f64>, OptimError> {
            Err(OptimError::GradientRequired)
        }

        fn requires_gradient(&self) -> bool {
            true
        }
    }

    #[test]
    fn parse_names() {
        assert!(matches!(
            "nelder-mead".parse::<OptimizerSpec>(),
            Ok(OptimizerSpec::Named(OptimizerKind::NelderMead))
        ));
        assert!(matches!(
            "BFGS".parse::<OptimizerSpec>(),
            Ok(OptimizerSpec::Named(OptimizerKind::Bfgs))
        ));
        let err = "adam".parse::<OptimizerSpec>().unwrap_err();
        assert_eq!(err.name, "adam");
    }

    #[test]
    fn gradient_optimizers_do_not_resolve() {
        assert!(OptimizerSpec::default().resolve_derivative_free().is_some());
        assert!(OptimizerSpec::Named(OptimizerKind::Bfgs)
            .resolve_derivative_free()
            .is_none());
        assert!(OptimizerSpec::custom(NeedsGradient)
            .resolve_derivative_free()
            .is_none());

        let custom = OptimizerSpec::custom(Identity);
        assert_eq!(custom.name(), "custom");
        assert!(custom.resolve_derivative_free().is_some());
    }
}
