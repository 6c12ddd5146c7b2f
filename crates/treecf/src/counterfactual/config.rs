//! Counterfactual search configuration with builder pattern.
//!
//! [`CounterfactualConfig`] collects every knob of the search. It uses the
//! `bon` crate for builder generation with validation at build time.
//!
//! # Example
//!
//! ```
//! use treecf::{CounterfactualConfig, RegularizationSpec, SearchOrder};
//!
//! // All defaults: L1 regularization, C = 1.0, Nelder-Mead
//! let config = CounterfactualConfig::builder().build().unwrap();
//!
//! // Only let features 0 and 2 move, try several strengths
//! let config = CounterfactualConfig::builder()
//!     .features_whitelist(vec![0, 2])
//!     .regularization("l2".parse::<RegularizationSpec>().unwrap())
//!     .c_values(vec![1.0, 0.1, 0.01])
//!     .search_order(SearchOrder::StrengthMajor)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.c_values.as_slice(), &[1.0, 0.1, 0.01]);
//! ```

use std::sync::Arc;

use bon::Builder;

use crate::cost::RegularizationSpec;
use crate::optim::OptimizerSpec;
use crate::repr::Label;

/// Default [`CounterfactualConfig::path_length_tolerance`].
pub const DEFAULT_PATH_LENGTH_TOLERANCE: usize = 2;

/// Default [`CounterfactualConfig::adjustment_margin`].
pub const DEFAULT_ADJUSTMENT_MARGIN: f64 = 1e-5;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// No regularization strength was given.
    #[error("c_values must not be empty")]
    EmptyCValues,
    /// A regularization strength is negative or not finite.
    #[error("c_values[{index}] must be finite and non-negative, got {value}")]
    InvalidCValue { index: usize, value: f64 },
    /// Path-length tolerance must be at least 1.
    #[error("path_length_tolerance must be at least 1")]
    InvalidPathLengthTolerance,
    /// Adjustment margin must be positive and finite.
    #[error("adjustment_margin must be positive and finite, got {0}")]
    InvalidAdjustmentMargin(f64),
}

// =============================================================================
// CValues
// =============================================================================

/// Ordered regularization strengths `C` to try.
///
/// Converts from a single value or a list.
#[derive(Debug, Clone, PartialEq)]
pub struct CValues(Vec<f64>);

impl CValues {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.0.is_empty() {
            return Err(ConfigError::EmptyCValues);
        }
        for (index, &value) in self.0.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidCValue { index, value });
            }
        }
        Ok(())
    }
}

impl Default for CValues {
    fn default() -> Self {
        Self(vec![1.0])
    }
}

impl From<f64> for CValues {
    fn from(c: f64) -> Self {
        Self(vec![c])
    }
}

impl From<Vec<f64>> for CValues {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

impl From<&[f64]> for CValues {
    fn from(values: &[f64]) -> Self {
        Self(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for CValues {
    fn from(values: [f64; N]) -> Self {
        Self(values.to_vec())
    }
}

// =============================================================================
// Acceptance
// =============================================================================

/// Predicate deciding whether a predicted label is an acceptable outcome.
#[derive(Clone, Default)]
pub enum Acceptance {
    /// Accept exactly the target label.
    #[default]
    ExactMatch,
    /// User-provided predicate.
    Custom(Arc<dyn Fn(Label) -> bool + Send + Sync>),
}

impl Acceptance {
    pub fn custom(predicate: impl Fn(Label) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(predicate))
    }

    /// Whether `prediction` is acceptable for `target`.
    pub fn accepts(&self, prediction: Label, target: Label) -> bool {
        match self {
            Self::ExactMatch => prediction == target,
            Self::Custom(predicate) => predicate(prediction),
        }
    }
}

impl std::fmt::Debug for Acceptance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExactMatch => f.write_str("ExactMatch"),
            Self::Custom(_) => f.debug_tuple("Custom").field(&"<dyn Fn(Label) -> bool>").finish(),
        }
    }
}

// =============================================================================
// SearchOrder
// =============================================================================

/// Order in which (starting point, C) pairs are attempted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchOrder {
    /// For each starting point, try every C.
    #[default]
    CandidateMajor,
    /// For each C, try every starting point.
    StrengthMajor,
}

// =============================================================================
// CounterfactualConfig
// =============================================================================

/// Configuration of the counterfactual search.
#[derive(Debug, Clone, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct CounterfactualConfig {
    /// Features allowed to change. `None` lets every feature change.
    pub features_whitelist: Option<Vec<usize>>,

    /// Distance penalty. Default: L1.
    #[builder(default)]
    pub regularization: RegularizationSpec,

    /// Regularization strengths, tried in order. Default: `[1.0]`.
    #[builder(into, default)]
    pub c_values: CValues,

    /// Minimizer. Default: Nelder-Mead.
    #[builder(default)]
    pub optimizer: OptimizerSpec,

    /// Acceptance predicate. Default: exact match with the target.
    #[builder(default)]
    pub acceptance: Acceptance,

    /// Leaf paths whose length differs from the target length by less than
    /// this are used as starting points. Default: 2.
    #[builder(default = DEFAULT_PATH_LENGTH_TOLERANCE)]
    pub path_length_tolerance: usize,

    /// Distance kept below a threshold when moving a feature left of a split.
    /// Default: `1e-5`.
    #[builder(default = DEFAULT_ADJUSTMENT_MARGIN)]
    pub adjustment_margin: f64,

    /// Attempt order. Default: candidate-major.
    #[builder(default)]
    pub search_order: SearchOrder,
}

/// Custom finishing function that validates the config.
impl<S: counterfactual_config_builder::IsComplete> CounterfactualConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is invalid:
    /// - empty `c_values`, or a negative or non-finite strength
    /// - `path_length_tolerance == 0`
    /// - non-positive or non-finite `adjustment_margin`
    pub fn build(self) -> Result<CounterfactualConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl Default for CounterfactualConfig {
    fn default() -> Self {
        Self {
            features_whitelist: None,
            regularization: RegularizationSpec::default(),
            c_values: CValues::default(),
            optimizer: OptimizerSpec::default(),
            acceptance: Acceptance::default(),
            path_length_tolerance: DEFAULT_PATH_LENGTH_TOLERANCE,
            adjustment_margin: DEFAULT_ADJUSTMENT_MARGIN,
            search_order: SearchOrder::default(),
        }
    }
}

impl CounterfactualConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.c_values.validate()?;

        if self.path_length_tolerance == 0 {
            return Err(ConfigError::InvalidPathLengthTolerance);
        }

        if !(self.adjustment_margin.is_finite() && self.adjustment_margin > 0.0) {
            return Err(ConfigError::InvalidAdjustmentMargin(self.adjustment_margin));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::RegularizationKind;
    use rstest::rstest;

    #[test]
    fn defaults() {
        let config = CounterfactualConfig::builder().build().unwrap();
        assert!(config.features_whitelist.is_none());
        assert!(matches!(
            config.regularization,
            RegularizationSpec::Named(RegularizationKind::L1)
        ));
        assert_eq!(config.c_values.as_slice(), &[1.0]);
        assert_eq!(config.path_length_tolerance, 2);
        assert_eq!(config.adjustment_margin, 1e-5);
        assert_eq!(config.search_order, SearchOrder::CandidateMajor);
        assert!(matches!(config.acceptance, Acceptance::ExactMatch));
    }

    #[test]
    fn default_matches_builder() {
        let built = CounterfactualConfig::builder().build().unwrap();
        let default = CounterfactualConfig::default();
        assert_eq!(built.c_values, default.c_values);
        assert_eq!(built.path_length_tolerance, default.path_length_tolerance);
        assert_eq!(built.adjustment_margin, default.adjustment_margin);
    }

    #[test]
    fn scalar_c_converts() {
        let config = CounterfactualConfig::builder().c_values(0.5).build().unwrap();
        assert_eq!(config.c_values.as_slice(), &[0.5]);

        let config = CounterfactualConfig::builder()
            .c_values([1.0, 0.1])
            .build()
            .unwrap();
        assert_eq!(config.c_values.len(), 2);
    }

    #[rstest]
    #[case(vec![], ConfigError::EmptyCValues)]
    #[case(vec![1.0, -0.1], ConfigError::InvalidCValue { index: 1, value: -0.1 })]
    fn invalid_c_values(#[case] c: Vec<f64>, #[case] expected: ConfigError) {
        let err = CounterfactualConfig::builder().c_values(c).build().unwrap_err();
        assert_eq!(err, expected);
    }

    #[test]
    fn nan_c_value_is_rejected() {
        let err = CounterfactualConfig::builder()
            .c_values(f64::NAN)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidCValue { index: 0, .. }));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1e-5)]
    #[case(f64::INFINITY)]
    fn invalid_margin(#[case] margin: f64) {
        let err = CounterfactualConfig::builder()
            .adjustment_margin(margin)
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAdjustmentMargin(_)));
    }

    #[test]
    fn zero_tolerance_is_rejected() {
        let err = CounterfactualConfig::builder()
            .path_length_tolerance(0)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidPathLengthTolerance);
    }

    #[test]
    fn custom_acceptance() {
        let any = Acceptance::custom(|_| true);
        assert!(any.accepts(Label::Outlier, Label::Inlier));
        assert!(!Acceptance::ExactMatch.accepts(Label::Outlier, Label::Inlier));
        assert!(format!("{any:?}").starts_with("Custom"));
    }
}
