//! Distance penalties between a counterfactual and the original input.

use std::str::FromStr;
use std::sync::Arc;

use ndarray::ArrayView1;

/// Penalty on the difference `x' - x` between a counterfactual and the input.
pub trait Regularizer: Send + Sync {
    /// Penalty for `delta`.
    fn cost(&self, delta: ArrayView1<'_, f64>) -> f64;

    /// Name used in logs.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Sum of absolute deviations.
#[derive(Debug, Clone, Copy, Default)]
pub struct L1Penalty;

impl Regularizer for L1Penalty {
    fn cost(&self, delta: ArrayView1<'_, f64>) -> f64 {
        delta.iter().map(|d| d.abs()).sum()
    }

    fn name(&self) -> &str {
        "l1"
    }
}

/// Sum of squared deviations.
#[derive(Debug, Clone, Copy, Default)]
pub struct L2Penalty;

impl Regularizer for L2Penalty {
    fn cost(&self, delta: ArrayView1<'_, f64>) -> f64 {
        delta.dot(&delta)
    }

    fn name(&self) -> &str {
        "l2"
    }
}

// =============================================================================
// Named regularizers
// =============================================================================

/// Unrecognized regularization name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown regularization {name:?} (expected \"l1\", \"l2\" or \"none\")")]
pub struct UnknownRegularization {
    pub name: String,
}

/// Built-in regularizers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RegularizationKind {
    #[default]
    L1,
    L2,
}

impl RegularizationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::L1 => "l1",
            Self::L2 => "l2",
        }
    }
}

impl FromStr for RegularizationKind {
    type Err = UnknownRegularization;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l1" => Ok(Self::L1),
            "l2" => Ok(Self::L2),
            _ => Err(UnknownRegularization { name: s.to_string() }),
        }
    }
}

impl std::fmt::Display for RegularizationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regularization used by the search.
///
/// # Example
///
/// ```
/// use treecf::cost::RegularizationSpec;
///
/// let l2: RegularizationSpec = "l2".parse().unwrap();
/// assert_eq!(l2.name(), "l2");
/// assert!("l3".parse::<RegularizationSpec>().is_err());
/// assert!(RegularizationSpec::None.resolve().is_none());
/// ```
#[derive(Clone)]
pub enum RegularizationSpec {
    /// No regularization: the objective is the raw loss.
    None,
    /// A built-in penalty.
    Named(RegularizationKind),
    /// User-provided penalty.
    Custom(Arc<dyn Regularizer>),
}

impl RegularizationSpec {
    /// Wrap a custom regularizer.
    pub fn custom(regularizer: impl Regularizer + 'static) -> Self {
        Self::Custom(Arc::new(regularizer))
    }

    /// Trait object for this spec, or `None` when unregularized.
    pub fn resolve(&self) -> Option<Arc<dyn Regularizer>> {
        match self {
            Self::None => None,
            Self::Named(RegularizationKind::L1) => Some(Arc::new(L1Penalty)),
            Self::Named(RegularizationKind::L2) => Some(Arc::new(L2Penalty)),
            Self::Custom(inner) => Some(Arc::clone(inner)),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Named(kind) => kind.as_str(),
            Self::Custom(inner) => inner.name(),
        }
    }
}

impl Default for RegularizationSpec {
    fn default() -> Self {
        Self::Named(RegularizationKind::L1)
    }
}

impl From<RegularizationKind> for RegularizationSpec {
    fn from(kind: RegularizationKind) -> Self {
        Self::Named(kind)
    }
}

impl FromStr for RegularizationSpec {
    type Err = UnknownRegularization;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("none") {
            return Ok(Self::None);
        }
        s.parse().map(Self::Named)
    }
}

impl std::fmt::Debug for RegularizationSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Named(kind) => f.debug_tuple("Named").field(kind).finish(),
            Self::Custom(_) => f.debug_tuple("Custom").field(&"<dyn Regularizer>").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn penalties() {
        let delta = array![1.0, -2.0, 0.5];
        assert_eq!(L1Penalty.cost(delta.view()), 3.5);
        assert_eq!(L2Penalty.cost(delta.view()), 5.25);
    }

    #[test]
    fn parse_names() {
        assert!(matches!(
            "l1".parse::<RegularizationSpec>(),
            Ok(RegularizationSpec::Named(RegularizationKind::L1))
        ));
        assert!(matches!(
            "L2".parse::<RegularizationSpec>(),
            Ok(RegularizationSpec::Named(RegularizationKind::L2))
        ));
        assert!(matches!("none".parse::<RegularizationSpec>(), Ok(RegularizationSpec::None)));

        let err = "l3".parse::<RegularizationSpec>().unwrap_err();
        assert_eq!(err.name, "l3");
    }

    #[test]
    fn resolve_custom() {
        struct Max;
        impl Regularizer for Max {
            fn cost(&self, delta: ArrayView1<'_, f64>) -> f64 {
                delta.iter().fold(0.0, |m, d| m.max(d.abs()))
            }
        }

        let spec = RegularizationSpec::custom(Max);
        let reg = spec.resolve().unwrap();
        assert_eq!(reg.cost(array![1.0, -3.0].view()), 3.0);
        assert_eq!(spec.name(), "custom");
        assert_eq!(format!("{spec:?}"), "Custom(\"<dyn Regularizer>\")");
    }

    #[test]
    fn default_is_l1() {
        assert_eq!(RegularizationSpec::default().name(), "l1");
    }
}
