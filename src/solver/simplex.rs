//! Pairwise solver for quadratic programs on the probability simplex
//!
//! minimise ½wᵀQw − cᵀw subject to w ≥ 0, Σw = 1
//!
//! Like SMO, each iteration moves mass between exactly two coordinates, which
//! keeps the equality constraint satisfied without a projection. The pair is
//! the steepest-descent working set: the receiver has the smallest gradient,
//! the donor the largest gradient among coordinates that still hold mass. At
//! an optimum every coordinate with mass shares the minimum gradient, so the
//! gap between the two is the optimality measure.

use crate::core::{CoresetError, QpSolution, Result, SolverConfig};
use log::{debug, warn};
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Curvature floor for pairs where Q is not strictly convex
const MIN_CURVATURE: f64 = 1e-12;

/// Pairwise simplex QP solver
#[derive(Debug, Clone, Default)]
pub struct SimplexQpSolver {
    config: SolverConfig,
}

impl SimplexQpSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve the QP starting from uniform weights
    pub fn solve(&self, q: ArrayView2<'_, f64>, c: ArrayView1<'_, f64>) -> Result<QpSolution> {
        let m = c.len();
        if m == 0 {
            return Err(CoresetError::EmptyDataset);
        }
        if q.nrows() != m || q.ncols() != m {
            return Err(CoresetError::DimensionMismatch {
                expected: m,
                actual: q.nrows().max(q.ncols()),
            });
        }

        let mut weights = Array1::from_elem(m, 1.0 / m as f64);
        let mut gradient = q.dot(&weights) - &c;
        let mut iterations = 0;
        let mut converged = false;

        loop {
            let (receiver, donor) = match self.select_working_set(&weights, &gradient) {
                Some(pair) => pair,
                None => break,
            };
            let gap = gradient[donor] - gradient[receiver];
            if gap < self.config.epsilon {
                converged = true;
                break;
            }
            if iterations >= self.config.max_iterations {
                break;
            }

            self.take_step(q, receiver, donor, gap, &mut weights, &mut gradient);
            iterations += 1;
        }

        if !converged {
            warn!(
                "Simplex QP stopped at the iteration limit ({}) before reaching epsilon {}",
                self.config.max_iterations, self.config.epsilon
            );
        }

        let objective_value = 0.5 * weights.dot(&q.dot(&weights)) - weights.dot(&c);
        debug!(
            "Simplex QP finished after {} iterations, objective {:.6e}",
            iterations, objective_value
        );

        Ok(QpSolution {
            weights,
            iterations,
            objective_value,
            converged,
        })
    }

    /// Receiver: smallest gradient overall. Donor: largest gradient among
    /// coordinates with positive weight. `None` only for NaN gradients.
    fn select_working_set(
        &self,
        weights: &Array1<f64>,
        gradient: &Array1<f64>,
    ) -> Option<(usize, usize)> {
        let mut receiver: Option<usize> = None;
        let mut donor: Option<usize> = None;

        for (i, (&g, &w)) in gradient.iter().zip(weights.iter()).enumerate() {
            if g.is_nan() {
                continue;
            }
            if receiver.map_or(true, |r| g < gradient[r]) {
                receiver = Some(i);
            }
            if w > 0.0 && donor.map_or(true, |d| g > gradient[d]) {
                donor = Some(i);
            }
        }

        receiver.zip(donor)
    }

    /// Move mass from `donor` to `receiver` along the exact line minimum,
    /// clipped so the donor stays non-negative
    fn take_step(
        &self,
        q: ArrayView2<'_, f64>,
        receiver: usize,
        donor: usize,
        gap: f64,
        weights: &mut Array1<f64>,
        gradient: &mut Array1<f64>,
    ) {
        let curvature = (q[[receiver, receiver]] + q[[donor, donor]]
            - 2.0 * q[[receiver, donor]])
            .max(MIN_CURVATURE);
        let step = (gap / curvature).min(weights[donor]);

        weights[receiver] += step;
        weights[donor] -= step;
        if weights[donor] < 0.0 {
            weights[donor] = 0.0;
        }

        // ∇ changes by step · (Q[:, receiver] − Q[:, donor])
        gradient.scaled_add(step, &q.column(receiver));
        gradient.scaled_add(-step, &q.column(donor));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    #[test]
    fn test_identity_is_centred() {
        // ½‖w‖² on the simplex: the uniform vector is optimal
        let q = Array2::<f64>::eye(4);
        let c = Array1::<f64>::zeros(4);
        let solution = SimplexQpSolver::default().solve(q.view(), c.view()).unwrap();

        assert!(solution.converged);
        for w in solution.weights.iter() {
            assert_abs_diff_eq!(*w, 0.25, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_linear_term_shifts_weight() {
        // Q = I, c = [0.5, 0]: minimiser of ½(a² + b²) − a/2 with a + b = 1 is a = 3/4
        let q = Array2::<f64>::eye(2);
        let c = array![0.5, 0.0];
        let solution = SimplexQpSolver::default().solve(q.view(), c.view()).unwrap();

        assert_abs_diff_eq!(solution.weights[0], 0.75, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.weights[1], 0.25, epsilon = 1e-9);
        assert_abs_diff_eq!(solution.objective_value, 0.3125 - 0.375, epsilon = 1e-9);
    }

    #[test]
    fn test_active_bound() {
        // c strongly favours the first coordinate; the second is driven to 0
        let q = Array2::<f64>::eye(2);
        let c = array![5.0, 0.0];
        let solution = SimplexQpSolver::default().solve(q.view(), c.view()).unwrap();

        assert!(solution.converged);
        assert_abs_diff_eq!(solution.weights[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(solution.weights[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weights_stay_on_simplex() {
        let q = array![[2.0, 0.5, 0.1], [0.5, 1.0, 0.3], [0.1, 0.3, 1.5]];
        let c = array![0.3, 0.9, 0.2];
        let solution = SimplexQpSolver::default().solve(q.view(), c.view()).unwrap();

        assert_abs_diff_eq!(solution.weights.sum(), 1.0, epsilon = 1e-12);
        assert!(solution.weights.iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn test_iteration_limit() {
        let config = SolverConfig {
            max_iterations: 0,
            ..SolverConfig::default()
        };
        let q = Array2::<f64>::eye(2);
        let c = array![1.0, 0.0];
        let solution = SimplexQpSolver::new(config).solve(q.view(), c.view()).unwrap();

        assert!(!solution.converged);
        assert_eq!(solution.iterations, 0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let q = Array2::<f64>::eye(3);
        let c = array![1.0, 0.0];
        let result = SimplexQpSolver::default().solve(q.view(), c.view());
        assert!(matches!(result, Err(CoresetError::DimensionMismatch { .. })));
    }
}
