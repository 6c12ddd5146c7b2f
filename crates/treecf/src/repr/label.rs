//! Isolation forest output labels.

use serde::{Deserialize, Serialize};

/// Label assigned by an isolation forest.
///
/// Follows the `-1` (outlier) / `+1` (inlier) convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// Anomalous sample: isolated by short paths.
    Outlier,
    /// Normal sample: isolated by long paths.
    Inlier,
}

impl Label {
    /// Sign of the label: `-1.0` for outliers, `+1.0` for inliers.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Label::Outlier => -1.0,
            Label::Inlier => 1.0,
        }
    }

    /// Integer encoding of the label.
    #[inline]
    pub fn as_i8(self) -> i8 {
        match self {
            Label::Outlier => -1,
            Label::Inlier => 1,
        }
    }

    /// The other label.
    #[inline]
    pub fn flipped(self) -> Self {
        match self {
            Label::Outlier => Label::Inlier,
            Label::Inlier => Label::Outlier,
        }
    }
}

impl TryFrom<i8> for Label {
    type Error = i8;

    /// Convert from `-1` / `+1`; any other value is returned as the error.
    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Label::Outlier),
            1 => Ok(Label::Inlier),
            other => Err(other),
        }
    }
}

impl From<Label> for i8 {
    fn from(label: Label) -> Self {
        label.as_i8()
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Outlier => write!(f, "outlier (-1)"),
            Label::Inlier => write!(f, "inlier (+1)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_encoding() {
        assert_eq!(Label::try_from(-1i8), Ok(Label::Outlier));
        assert_eq!(Label::try_from(1i8), Ok(Label::Inlier));
        assert_eq!(Label::try_from(0i8), Err(0));
        assert_eq!(i8::from(Label::Outlier), -1);
        assert_eq!(Label::Inlier.sign(), 1.0);
        assert_eq!(Label::Outlier.flipped(), Label::Inlier);
    }

    #[test]
    fn serde_names() {
        let json = serde_json::to_string(&Label::Outlier).unwrap();
        assert_eq!(json, "\"outlier\"");
        let back: Label = serde_json::from_str("\"inlier\"").unwrap();
        assert_eq!(back, Label::Inlier);
    }
}
