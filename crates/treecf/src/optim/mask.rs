//! Restricting a minimizer to a subset of coordinates.

use ndarray::{Array1, ArrayView1};

use crate::cost::CostFunction;

/// Set of free coordinates of an input vector.
///
/// The minimizer works in the reduced space of free coordinates; the other
/// coordinates are held at the values of a base point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputMask {
    free: Vec<usize>,
}

impl InputMask {
    /// Mask freeing `indices` (sorted and deduplicated).
    pub fn new(indices: &[usize]) -> Self {
        let mut free = indices.to_vec();
        free.sort_unstable();
        free.dedup();
        Self { free }
    }

    /// Free coordinates, ascending.
    pub fn free(&self) -> &[usize] {
        &self.free
    }

    /// Dimension of the reduced space.
    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    /// Free coordinates of `full`.
    pub fn reduce(&self, full: ArrayView1<'_, f64>) -> Array1<f64> {
        self.free.iter().map(|&i| full[i]).collect()
    }

    /// `base` with its free coordinates replaced by `reduced`.
    pub fn expand(&self, base: ArrayView1<'_, f64>, reduced: ArrayView1<'_, f64>) -> Array1<f64> {
        let mut full = base.to_owned();
        for (&i, &v) in self.free.iter().zip(reduced.iter()) {
            full[i] = v;
        }
        full
    }
}

/// Cost over the reduced space of an [`InputMask`].
pub struct MaskedCost<'a> {
    inner: &'a dyn CostFunction,
    mask: &'a InputMask,
    base: ArrayView1<'a, f64>,
}

impl<'a> MaskedCost<'a> {
    pub fn new(inner: &'a dyn CostFunction, mask: &'a InputMask, base: ArrayView1<'a, f64>) -> Self {
        Self { inner, mask, base }
    }
}

impl CostFunction for MaskedCost<'_> {
    fn score(&self, x: ArrayView1<'_, f64>) -> f64 {
        let full = self.mask.expand(self.base, x);
        self.inner.score(full.view())
    }

    fn gradient(&self, x: ArrayView1<'_, f64>) -> Option<Array1<f64>> {
        let full = self.mask.expand(self.base, x);
        let grad = self.inner.gradient(full.view())?;
        Some(self.mask.reduce(grad.view()))
    }

    fn is_differentiable(&self) -> bool {
        self.inner.is_differentiable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn reduce_and_expand() {
        let mask = InputMask::new(&[2, 0, 2]);
        assert_eq!(mask.free(), &[0, 2]);

        let base = array![1.0, 2.0, 3.0];
        assert_eq!(mask.reduce(base.view()), array![1.0, 3.0]);
        assert_eq!(
            mask.expand(base.view(), array![-1.0, -3.0].view()),
            array![-1.0, 2.0, -3.0]
        );
    }

    fn sum(x: ArrayView1<'_, f64>) -> f64 {
        x.sum()
    }

    #[test]
    fn masked_cost_holds_fixed_coordinates() {
        let mask = InputMask::new(&[1]);
        let base = array![10.0, 0.0];
        let cost = MaskedCost::new(&sum, &mask, base.view());

        assert_eq!(cost.score(array![5.0].view()), 15.0);
    }
}
