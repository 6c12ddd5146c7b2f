//! Sample access for tree traversal.
//!
//! Trees only need to read single feature values, so traversal is written
//! against [`SampleAccessor`] and works with plain slices as well as
//! `ndarray` vectors and views.

use ndarray::{Array1, ArrayView1};

/// Read-only access to the feature values of one sample.
pub trait SampleAccessor {
    /// Value of feature `index`.
    ///
    /// Out-of-range indices read as NaN.
    fn feature(&self, index: usize) -> f64;
}

impl SampleAccessor for [f64] {
    #[inline]
    fn feature(&self, index: usize) -> f64 {
        self.get(index).copied().unwrap_or(f64::NAN)
    }
}

impl<const N: usize> SampleAccessor for [f64; N] {
    #[inline]
    fn feature(&self, index: usize) -> f64 {
        self.as_slice().feature(index)
    }
}

impl SampleAccessor for Vec<f64> {
    #[inline]
    fn feature(&self, index: usize) -> f64 {
        self.as_slice().feature(index)
    }
}

impl SampleAccessor for ArrayView1<'_, f64> {
    #[inline]
    fn feature(&self, index: usize) -> f64 {
        self.get(index).copied().unwrap_or(f64::NAN)
    }
}

impl SampleAccessor for Array1<f64> {
    #[inline]
    fn feature(&self, index: usize) -> f64 {
        self.get(index).copied().unwrap_or(f64::NAN)
    }
}
