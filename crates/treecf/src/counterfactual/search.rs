//! The counterfactual search loop.

use ndarray::ArrayView1;

use super::candidates::CandidateGenerator;
use super::config::{CounterfactualConfig, SearchOrder};
use super::{Counterfactual, CounterfactualError};
use crate::cost::{IsolationForestLoss, RegularizedCost};
use crate::optim::{InputMask, MaskedCost};
use crate::repr::{IsolationForest, Label};

// =============================================================================
// Search plan
// =============================================================================

/// One minimizer run: a starting point index and a regularization strength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attempt {
    /// Index into the starting points.
    pub start: usize,
    /// Index into the strengths.
    pub c_index: usize,
    pub c: f64,
}

/// Lazily enumerates the (starting point, C) cross-product.
///
/// # Example
///
/// ```
/// use treecf::counterfactual::SearchPlan;
/// use treecf::SearchOrder;
///
/// let c = [1.0, 0.1];
/// let plan: Vec<_> = SearchPlan::new(2, &c, SearchOrder::StrengthMajor)
///     .map(|a| (a.start, a.c))
///     .collect();
/// assert_eq!(plan, vec![(0, 1.0), (1, 1.0), (0, 0.1), (1, 0.1)]);
/// ```
#[derive(Debug, Clone)]
pub struct SearchPlan<'a> {
    n_starts: usize,
    c_values: &'a [f64],
    order: SearchOrder,
    position: usize,
}

impl<'a> SearchPlan<'a> {
    pub fn new(n_starts: usize, c_values: &'a [f64], order: SearchOrder) -> Self {
        Self {
            n_starts,
            c_values,
            order,
            position: 0,
        }
    }

    fn total(&self) -> usize {
        self.n_starts * self.c_values.len()
    }
}

impl Iterator for SearchPlan<'_> {
    type Item = Attempt;

    fn next(&mut self) -> Option<Attempt> {
        if self.position >= self.total() {
            return None;
        }
        let pos = self.position;
        self.position += 1;

        let (start, c_index) = match self.order {
            SearchOrder::CandidateMajor => (pos / self.c_values.len(), pos % self.c_values.len()),
            SearchOrder::StrengthMajor => (pos % self.n_starts, pos / self.n_starts),
        };
        Some(Attempt {
            start,
            c_index,
            c: self.c_values[c_index],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SearchPlan<'_> {}

// =============================================================================
// CounterfactualSearch
// =============================================================================

/// Counterfactual search engine bound to a forest and a configuration.
///
/// Stateless between calls; one engine can serve many inputs.
pub struct CounterfactualSearch<'a> {
    forest: &'a IsolationForest,
    config: &'a CounterfactualConfig,
}

impl<'a> CounterfactualSearch<'a> {
    pub fn new(forest: &'a IsolationForest, config: &'a CounterfactualConfig) -> Self {
        Self { forest, config }
    }

    /// Search for a counterfactual of `x` labelled `target`.
    ///
    /// # Errors
    ///
    /// - contract violations (model, configuration, input, whitelist,
    ///   gradient-based optimizer) fail before any minimizer run
    /// - minimizer failures are propagated as [`CounterfactualError::Optimizer`]
    /// - [`CounterfactualError::NotFound`] once every attempt was rejected
    pub fn compute(
        &self,
        x: ArrayView1<'_, f64>,
        target: Label,
    ) -> Result<Counterfactual, CounterfactualError> {
        let forest = self.forest;
        let config = self.config;

        forest.validate()?;
        config.validate()?;
        self.check_input(x)?;

        let regularizer = config.regularization.resolve();
        let minimizer = config.optimizer.resolve_derivative_free().ok_or_else(|| {
            CounterfactualError::GradientUnavailable {
                optimizer: config.optimizer.name().to_string(),
            }
        })?;

        let current = forest.predict(&x);
        if config.acceptance.accepts(current, target) {
            log::warn!(
                "input is already predicted as {}, which satisfies the acceptance criterion for target {}",
                current,
                target
            );
        }

        let whitelist = config.features_whitelist.as_deref();
        let starts = CandidateGenerator::new(forest, target)
            .with_regularizer(regularizer.as_deref())
            .with_whitelist(whitelist)
            .with_tolerance(config.path_length_tolerance)
            .with_margin(config.adjustment_margin)
            .generate(x)?;

        let loss = IsolationForestLoss::new(forest, target);
        let mask = whitelist.map(InputMask::new);
        let plan = SearchPlan::new(starts.len(), config.c_values.as_slice(), config.search_order);

        let mut attempts = 0;
        for attempt in plan {
            attempts += 1;
            let start = starts[attempt.start].view();
            let cost = RegularizedCost::new(&loss, regularizer.as_deref(), x.view(), attempt.c);

            let x_cf = match &mask {
                Some(mask) => {
                    let masked = MaskedCost::new(&cost, mask, start);
                    let reduced = minimizer.minimize(&masked, mask.reduce(start).view())?;
                    mask.expand(start, reduced.view())
                }
                None => minimizer.minimize(&cost, start)?,
            };

            let prediction = forest.predict(&x_cf);
            log::debug!(
                "attempt {}: start {} C={} -> {}",
                attempts,
                attempt.start,
                attempt.c,
                prediction
            );

            if config.acceptance.accepts(prediction, target) {
                let delta = &x_cf - &x;
                return Ok(Counterfactual {
                    counterfactual: x_cf,
                    prediction,
                    delta,
                    attempts,
                });
            }
        }

        Err(CounterfactualError::NotFound { attempts })
    }

    fn check_input(&self, x: ArrayView1<'_, f64>) -> Result<(), CounterfactualError> {
        let n_features = self.forest.n_features();
        if x.len() != n_features {
            return Err(CounterfactualError::DimensionMismatch {
                expected: n_features,
                actual: x.len(),
            });
        }
        if let Some(index) = x.iter().position(|v| !v.is_finite()) {
            return Err(CounterfactualError::NonFiniteInput { index });
        }
        if let Some(whitelist) = &self.config.features_whitelist {
            if let Some(&index) = whitelist.iter().find(|&&i| i >= n_features) {
                return Err(CounterfactualError::WhitelistOutOfRange { index, n_features });
            }
        }
        Ok(())
    }
}

/// Search for a counterfactual of `x` that `forest` labels `target`.
///
/// Convenience wrapper around [`CounterfactualSearch::compute`].
pub fn generate_counterfactual(
    forest: &IsolationForest,
    x: ArrayView1<'_, f64>,
    target: Label,
    config: &CounterfactualConfig,
) -> Result<Counterfactual, CounterfactualError> {
    CounterfactualSearch::new(forest, config).compute(x, target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_major_order() {
        let c = [1.0, 0.1, 0.01];
        let plan: Vec<_> = SearchPlan::new(2, &c, SearchOrder::CandidateMajor)
            .map(|a| (a.start, a.c_index))
            .collect();
        assert_eq!(plan, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2)]);
    }

    #[test]
    fn strength_major_order() {
        let c = [1.0, 0.1, 0.01];
        let plan: Vec<_> = SearchPlan::new(2, &c, SearchOrder::StrengthMajor)
            .map(|a| (a.start, a.c))
            .collect();
        assert_eq!(
            plan,
            vec![(0, 1.0), (1, 1.0), (0, 0.1), (1, 0.1), (0, 0.01), (1, 0.01)]
        );
    }

    #[test]
    fn plan_length() {
        let c = [1.0, 0.5];
        let plan = SearchPlan::new(3, &c, SearchOrder::default());
        assert_eq!(plan.len(), 6);
        assert_eq!(SearchPlan::new(0, &c, SearchOrder::default()).count(), 0);
    }
}
