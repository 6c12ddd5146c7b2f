//! Nelder-Mead downhill simplex.
//!
//! Follows the classic formulation used by SciPy's `minimize(method="Nelder-Mead")`:
//!
//! ```text
//! simplex: x0 plus x0 with coordinate k scaled by 1.05 (or set to 0.00025 if zero)
//! loop until tolerances or budget are met:
//!     order vertices by objective value
//!     reflect the worst vertex through the centroid of the others
//!     expand if the reflection is the new best
//!     contract (outside or inside) if it is still among the worst
//!     shrink toward the best vertex if contraction fails
//! ```
//!
//! Only objective values are used, so the method works on the piecewise
//! constant isolation-forest loss.

use ndarray::{Array1, ArrayView1};

use super::{Minimizer, OptimError};
use crate::cost::CostFunction;

const NONZERO_DELTA: f64 = 0.05;
const ZERO_DELTA: f64 = 0.00025;

/// Nelder-Mead minimizer.
///
/// Defaults: `200 * n` iterations and function evaluations, absolute
/// tolerances of `1e-4` on both the simplex spread and the objective spread,
/// standard (non-adaptive) coefficients.
///
/// # Example
///
/// ```
/// use ndarray::{array, ArrayView1};
/// use treecf::optim::{Minimizer, NelderMead};
///
/// fn bowl(x: ArrayView1<'_, f64>) -> f64 {
///     (x[0] - 1.0).powi(2) + (x[1] + 2.0).powi(2)
/// }
///
/// let nm = NelderMead::default().with_xatol(1e-8).with_fatol(1e-10);
/// let best = nm.minimize(&bowl, array![0.0, 0.0].view()).unwrap();
/// assert!((best[0] - 1.0).abs() < 1e-3);
/// assert!((best[1] + 2.0).abs() < 1e-3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NelderMead {
    max_iter: Option<usize>,
    max_fev: Option<usize>,
    xatol: f64,
    fatol: f64,
    adaptive: bool,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iter: None,
            max_fev: None,
            xatol: 1e-4,
            fatol: 1e-4,
            adaptive: false,
        }
    }
}

/// Reflection, expansion, contraction and shrink coefficients.
#[derive(Debug, Clone, Copy)]
struct Coefficients {
    rho: f64,
    chi: f64,
    psi: f64,
    sigma: f64,
}

impl Coefficients {
    fn for_dim(n: usize, adaptive: bool) -> Self {
        if adaptive {
            // Gao & Han (2012)
            let dim = n as f64;
            Self {
                rho: 1.0,
                chi: 1.0 + 2.0 / dim,
                psi: 0.75 - 1.0 / (2.0 * dim),
                sigma: 1.0 - 1.0 / dim,
            }
        } else {
            Self {
                rho: 1.0,
                chi: 2.0,
                psi: 0.5,
                sigma: 0.5,
            }
        }
    }
}

/// Objective wrapper counting evaluations.
struct Counted<'a> {
    cost: &'a dyn CostFunction,
    calls: usize,
}

impl Counted<'_> {
    fn eval(&mut self, x: &Array1<f64>) -> f64 {
        self.calls += 1;
        self.cost.score(x.view())
    }
}

impl NelderMead {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum number of iterations. Default: `200 * n`.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = Some(max_iter);
        self
    }

    /// Maximum number of objective evaluations. Default: `200 * n`.
    pub fn with_max_fev(mut self, max_fev: usize) -> Self {
        self.max_fev = Some(max_fev);
        self
    }

    /// Absolute tolerance on the simplex spread.
    pub fn with_xatol(mut self, xatol: f64) -> Self {
        self.xatol = xatol;
        self
    }

    /// Absolute tolerance on the objective spread.
    pub fn with_fatol(mut self, fatol: f64) -> Self {
        self.fatol = fatol;
        self
    }

    /// Use dimension-dependent coefficients, which behave better for large `n`.
    pub fn with_adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }

    fn initial_simplex(x0: ArrayView1<'_, f64>) -> Vec<Array1<f64>> {
        let n = x0.len();
        let mut simplex = Vec::with_capacity(n + 1);
        simplex.push(x0.to_owned());
        for k in 0..n {
            let mut vertex = x0.to_owned();
            vertex[k] = if vertex[k] != 0.0 {
                (1.0 + NONZERO_DELTA) * vertex[k]
            } else {
                ZERO_DELTA
            };
            simplex.push(vertex);
        }
        simplex
    }

    fn converged(&self, simplex: &[Array1<f64>], values: &[f64]) -> bool {
        let best = &simplex[0];
        let x_spread = simplex[1..]
            .iter()
            .flat_map(|v| v.iter().zip(best.iter()).map(|(a, b)| (a - b).abs()))
            .fold(0.0f64, f64::max);
        let f_spread = values[1..]
            .iter()
            .map(|f| (f - values[0]).abs())
            .fold(0.0f64, f64::max);
        x_spread <= self.xatol && f_spread <= self.fatol
    }
}

/// Reorder vertices by ascending objective value (stable).
fn sort_simplex(simplex: &mut Vec<Array1<f64>>, values: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    *simplex = order.iter().map(|&i| simplex[i].clone()).collect();
    *values = order.iter().map(|&i| values[i]).collect();
}

impl Minimizer for NelderMead {
    fn minimize(
        &self,
        cost: &dyn CostFunction,
        x0: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, OptimError> {
        if let Some(index) = x0.iter().position(|v| !v.is_finite()) {
            return Err(OptimError::NonFiniteStart { index });
        }
        let n = x0.len();
        if n == 0 {
            return Ok(x0.to_owned());
        }

        let Coefficients {
            rho,
            chi,
            psi,
            sigma,
        } = Coefficients::for_dim(n, self.adaptive);
        let max_iter = self.max_iter.unwrap_or(200 * n);
        let max_fev = self.max_fev.unwrap_or(200 * n);

        let mut f = Counted { cost, calls: 0 };
        let mut simplex = Self::initial_simplex(x0);
        let mut values: Vec<f64> = simplex.iter().map(|v| f.eval(v)).collect();
        if values[0].is_nan() {
            return Err(OptimError::NanObjective);
        }
        sort_simplex(&mut simplex, &mut values);

        let mut iterations = 1;
        while f.calls < max_fev && iterations < max_iter {
            if self.converged(&simplex, &values) {
                break;
            }

            let centroid = simplex[..n]
                .iter()
                .fold(Array1::<f64>::zeros(n), |acc, v| acc + v)
                / n as f64;
            let worst = simplex[n].clone();

            let reflected = &centroid * (1.0 + rho) - &worst * rho;
            let f_reflected = f.eval(&reflected);
            let mut shrink = false;

            if f_reflected < values[0] {
                let expanded = &centroid * (1.0 + rho * chi) - &worst * (rho * chi);
                let f_expanded = f.eval(&expanded);
                if f_expanded < f_reflected {
                    simplex[n] = expanded;
                    values[n] = f_expanded;
                } else {
                    simplex[n] = reflected;
                    values[n] = f_reflected;
                }
            } else if f_reflected < values[n - 1] {
                simplex[n] = reflected;
                values[n] = f_reflected;
            } else if f_reflected < values[n] {
                let contracted = &centroid * (1.0 + psi * rho) - &worst * (psi * rho);
                let f_contracted = f.eval(&contracted);
                if f_contracted <= f_reflected {
                    simplex[n] = contracted;
                    values[n] = f_contracted;
                } else {
                    shrink = true;
                }
            } else {
                let contracted = &centroid * (1.0 - psi) + &worst * psi;
                let f_contracted = f.eval(&contracted);
                if f_contracted < values[n] {
                    simplex[n] = contracted;
                    values[n] = f_contracted;
                } else {
                    shrink = true;
                }
            }

            if shrink {
                let best = simplex[0].clone();
                for j in 1..=n {
                    let vertex = &best + &((&simplex[j] - &best) * sigma);
                    values[j] = f.eval(&vertex);
                    simplex[j] = vertex;
                }
            }

            iterations += 1;
            sort_simplex(&mut simplex, &mut values);
        }

        log::trace!(
            "nelder-mead stopped after {} iterations, {} evaluations, best value {}",
            iterations,
            f.calls,
            values[0]
        );

        Ok(simplex.swap_remove(0))
    }

    fn name(&self) -> &str {
        "nelder-mead"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::cell::Cell;

    fn rosenbrock(x: ArrayView1<'_, f64>) -> f64 {
        (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
    }

    fn step(x: ArrayView1<'_, f64>) -> f64 {
        if x[0] < 1.0 {
            -2.0
        } else {
            -1.0
        }
    }

    #[test]
    fn minimizes_rosenbrock() {
        let nm = NelderMead::default();
        let best = nm.minimize(&rosenbrock, array![-1.2, 1.0].view()).unwrap();
        assert_abs_diff_eq!(best[0], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(best[1], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn initial_simplex_perturbs_each_coordinate() {
        let simplex = NelderMead::initial_simplex(array![2.0, 0.0].view());
        assert_eq!(simplex.len(), 3);
        assert_abs_diff_eq!(simplex[1][0], 2.1, epsilon = 1e-12);
        assert_eq!(simplex[1][1], 0.0);
        assert_eq!(simplex[2], array![2.0, ZERO_DELTA]);
    }

    #[test]
    fn empty_input_is_returned_unchanged() {
        let x0 = Array1::<f64>::zeros(0);
        let best = NelderMead::default().minimize(&rosenbrock, x0.view()).unwrap();
        assert!(best.is_empty());
    }

    #[test]
    fn non_finite_start_is_rejected() {
        let err = NelderMead::default()
            .minimize(&rosenbrock, array![0.0, f64::NAN].view())
            .unwrap_err();
        assert_eq!(err, OptimError::NonFiniteStart { index: 1 });
    }

    #[test]
    fn respects_evaluation_budget() {
        struct Counting<'a>(&'a Cell<usize>);
        impl CostFunction for Counting<'_> {
            fn score(&self, x: ArrayView1<'_, f64>) -> f64 {
                self.0.set(self.0.get() + 1);
                rosenbrock(x)
            }
        }

        let calls = Cell::new(0);
        let nm = NelderMead::default().with_max_fev(10).with_xatol(0.0).with_fatol(0.0);
        nm.minimize(&Counting(&calls), array![-1.2, 1.0].view()).unwrap();
        // One iteration can spend up to n + 2 evaluations past the check.
        assert!(calls.get() <= 10 + 4);
    }

    #[test]
    fn stays_put_on_flat_objective() {
        let best = NelderMead::default()
            .minimize(&step, array![0.0].view())
            .unwrap();
        assert!(best[0] < 1.0);
        assert_eq!(step(best.view()), -2.0);
    }

    #[test]
    fn walks_down_a_step() {
        // Starting just past the edge, the simplex steps back across it.
        let best = NelderMead::default()
            .minimize(&step, array![1.0].view())
            .unwrap();
        assert_eq!(step(best.view()), -2.0);
    }

    #[test]
    fn adaptive_coefficients() {
        let c = Coefficients::for_dim(4, true);
        assert_abs_diff_eq!(c.chi, 1.5);
        assert_abs_diff_eq!(c.psi, 0.625);
        assert_abs_diff_eq!(c.sigma, 0.75);
    }
}
