//! Stein kernel built from a differentiable base kernel and a score function
//!
//! k_p(x, y) = ∇ₓ·∇ᵧk(x, y) + ∇ₓk(x, y)·s(y) + ∇ᵧk(x, y)·s(x) + k(x, y) s(x)·s(y)
//!
//! where s = ∇ log p. Under the density p, E[k_p(X, y)] = 0 for every y.

use crate::core::{CoresetError, Result};
use crate::kernel::{DifferentiableKernel, Kernel, ScoreFunction};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::fmt;
use std::sync::Arc;

/// Langevin Stein kernel over a base kernel `B`
#[derive(Clone)]
pub struct SteinKernel<B: DifferentiableKernel> {
    base_kernel: B,
    score_function: Arc<dyn ScoreFunction>,
}

impl<B: DifferentiableKernel> SteinKernel<B> {
    pub fn new<S: ScoreFunction + 'static>(base_kernel: B, score_function: S) -> Self {
        Self {
            base_kernel,
            score_function: Arc::new(score_function),
        }
    }

    /// Share one score function between several Stein kernels
    pub fn with_shared_score(base_kernel: B, score_function: Arc<dyn ScoreFunction>) -> Self {
        Self {
            base_kernel,
            score_function,
        }
    }

    pub fn base_kernel(&self) -> &B {
        &self.base_kernel
    }

    /// Evaluate the score function at `x`
    pub fn score(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        self.score_function.score(x)
    }

    /// Scores of every row of `x`, rejecting outputs of the wrong
    /// dimension and non-finite values
    pub fn checked_scores(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let mut scores = Array2::zeros((x.nrows(), x.ncols()));
        for (mut out, row) in scores.rows_mut().into_iter().zip(x.rows()) {
            let score = self.score(row);
            if score.len() != x.ncols() {
                return Err(CoresetError::DimensionMismatch {
                    expected: x.ncols(),
                    actual: score.len(),
                });
            }
            if score.iter().any(|v| !v.is_finite()) {
                return Err(CoresetError::InvalidParameter(
                    "score function returned a non-finite value".to_string(),
                ));
            }
            out.assign(&score);
        }
        Ok(scores)
    }

    /// Stein kernel value with the scores of `x` and `y` already evaluated
    pub fn compute_with_scores(
        &self,
        x: ArrayView1<'_, f64>,
        y: ArrayView1<'_, f64>,
        score_x: ArrayView1<'_, f64>,
        score_y: ArrayView1<'_, f64>,
    ) -> f64 {
        let k = &self.base_kernel;
        k.divergence_x_grad_y(x, y)
            + k.grad_x(x, y).dot(&score_y)
            + k.grad_y(x, y).dot(&score_x)
            + k.compute(x, y) * score_x.dot(&score_y)
    }

    fn scores(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut scores = Array2::zeros((x.nrows(), x.ncols()));
        for (mut out, row) in scores.rows_mut().into_iter().zip(x.rows()) {
            out.assign(&self.score(row));
        }
        scores
    }
}

impl<B: DifferentiableKernel + fmt::Debug> fmt::Debug for SteinKernel<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SteinKernel")
            .field("base_kernel", &self.base_kernel)
            .finish_non_exhaustive()
    }
}

impl<B: DifferentiableKernel> Kernel for SteinKernel<B> {
    fn compute(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        let score_x = self.score(x);
        let score_y = self.score(y);
        self.compute_with_scores(x, y, score_x.view(), score_y.view())
    }

    // Scores are evaluated once per row instead of once per pair
    fn compute_block(&self, x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Array2<f64> {
        let score_x = self.scores(x);
        let score_y = self.scores(y);
        Array2::from_shape_fn((x.nrows(), y.nrows()), |(i, j)| {
            self.compute_with_scores(x.row(i), y.row(j), score_x.row(i), score_y.row(j))
        })
    }

    fn compute_row(&self, x: ArrayView1<'_, f64>, y: ArrayView2<'_, f64>) -> Array1<f64> {
        let score_x = self.score(x);
        let score_y = self.scores(y);
        (0..y.nrows())
            .map(|j| self.compute_with_scores(x, y.row(j), score_x.view(), score_y.row(j)))
            .collect()
    }

    fn diagonal(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.rows()
            .into_iter()
            .map(|row| {
                let score = self.score(row);
                self.compute_with_scores(row, row, score.view(), score.view())
            })
            .collect()
    }

    fn validate_points(&self, x: ArrayView2<'_, f64>) -> Result<()> {
        self.checked_scores(x).map(|_| ())
    }

    fn point_cache(&self, x: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>> {
        self.checked_scores(x).map(Some)
    }

    fn cached_row(
        &self,
        i: usize,
        x: ArrayView2<'_, f64>,
        cache: Option<ArrayView2<'_, f64>>,
    ) -> Array1<f64> {
        match cache {
            Some(scores) => (0..x.nrows())
                .map(|j| self.compute_with_scores(x.row(i), x.row(j), scores.row(i), scores.row(j)))
                .collect(),
            None => self.compute_row(x.row(i), x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{PCIMQKernel, SquaredExponentialKernel};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn standard_normal_score(x: ArrayView1<'_, f64>) -> Array1<f64> {
        x.mapv(|v| -v)
    }

    /// ∫ k_p(x, y) φ(x) dx by the trapezoid rule on [-12, 12]
    fn expectation_under_standard_normal<K: Kernel>(kernel: &K, y: f64) -> f64 {
        let n = 24_001;
        let h = 24.0 / (n - 1) as f64;
        let norm = (2.0 * std::f64::consts::PI).sqrt();
        (0..n)
            .map(|i| {
                let x = -12.0 + i as f64 * h;
                let weight = if i == 0 || i == n - 1 { 0.5 } else { 1.0 };
                weight * h * (-0.5 * x * x).exp() / norm
                    * kernel.compute(array![x].view(), array![y].view())
            })
            .sum()
    }

    #[test]
    fn test_stein_property_squared_exponential() {
        let kernel = SteinKernel::new(SquaredExponentialKernel::new(0.8, 1.0), standard_normal_score);
        for y in [-1.5, 0.0, 0.7, 2.5] {
            assert_abs_diff_eq!(expectation_under_standard_normal(&kernel, y), 0.0, epsilon = 1e-8);
        }
    }

    #[test]
    fn test_stein_property_pcimq() {
        let kernel = SteinKernel::new(PCIMQKernel::new(1.0, 1.0), standard_normal_score);
        for y in [-0.3, 1.2] {
            assert_abs_diff_eq!(expectation_under_standard_normal(&kernel, y), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_symmetry() {
        let kernel = SteinKernel::new(PCIMQKernel::default(), standard_normal_score);
        let x = array![0.3, -1.0];
        let y = array![1.1, 0.4];
        assert_abs_diff_eq!(
            kernel.compute(x.view(), y.view()),
            kernel.compute(y.view(), x.view()),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_block_row_and_diagonal_agree() {
        let kernel = SteinKernel::new(SquaredExponentialKernel::default(), standard_normal_score);
        let x = array![[0.0, 1.0], [0.5, -0.5], [2.0, 0.1]];
        let block = kernel.compute_block(x.view(), x.view());
        let diagonal = kernel.diagonal(x.view());
        for i in 0..3 {
            let row = kernel.compute_row(x.row(i), x.view());
            for j in 0..3 {
                let pointwise = kernel.compute(x.row(i), x.row(j));
                assert_abs_diff_eq!(block[[i, j]], pointwise, epsilon = 1e-12);
                assert_abs_diff_eq!(row[j], pointwise, epsilon = 1e-12);
            }
            assert_abs_diff_eq!(diagonal[i], block[[i, i]], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cached_row_matches_compute_row() {
        let kernel = SteinKernel::new(PCIMQKernel::new(0.9, 1.0), standard_normal_score);
        let x = array![[0.0, 1.0], [0.5, -0.5], [2.0, 0.1], [-1.0, 0.3]];
        let cache = kernel.point_cache(x.view()).unwrap();
        assert!(cache.is_some());
        for i in 0..4 {
            let cached = kernel.cached_row(i, x.view(), cache.as_ref().map(|c| c.view()));
            let direct = kernel.compute_row(x.row(i), x.view());
            for (c, d) in cached.iter().zip(direct.iter()) {
                assert_abs_diff_eq!(c, d, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_validate_points_rejects_bad_scores() {
        let x = array![[0.0, 1.0], [0.5, 2.0]];

        let too_long = SteinKernel::new(SquaredExponentialKernel::default(), |x: ArrayView1<'_, f64>| {
            Array1::<f64>::zeros(x.len() + 1)
        });
        assert!(matches!(
            too_long.validate_points(x.view()),
            Err(CoresetError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));

        let scalar = SteinKernel::new(SquaredExponentialKernel::default(), |_: ArrayView1<'_, f64>| {
            array![1.0]
        });
        assert!(matches!(
            scalar.point_cache(x.view()),
            Err(CoresetError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));

        // Only the second row produces a non-finite score
        let blows_up = SteinKernel::new(SquaredExponentialKernel::default(), |x: ArrayView1<'_, f64>| {
            x.mapv(|v| if v > 1.5 { f64::NAN } else { -v })
        });
        assert!(matches!(
            blows_up.validate_points(x.view()),
            Err(CoresetError::InvalidParameter(_))
        ));

        let good = SteinKernel::new(SquaredExponentialKernel::default(), standard_normal_score);
        assert!(good.validate_points(x.view()).is_ok());
    }

    #[test]
    fn test_kernel_means_reject_bad_scores() {
        let kernel = SteinKernel::new(PCIMQKernel::default(), |x: ArrayView1<'_, f64>| {
            Array1::<f64>::zeros(x.len() + 1)
        });
        let x = array![[0.0, 1.0], [0.5, -0.5], [2.0, 0.1]];
        assert!(matches!(
            kernel.gramian_row_mean(x.view(), 2),
            Err(CoresetError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            kernel.compute_mean(x.view(), x.view(), None, None, 2),
            Err(CoresetError::DimensionMismatch { .. })
        ));
    }
}
