//! Laplacian kernel implementation
//!
//! k(x, y) = o · exp(-‖x - y‖₁ / (2l²))

use crate::kernel::{DifferentiableKernel, Kernel};
use crate::utils::{manhattan_distance, sign};
use ndarray::{Array1, ArrayView1};

/// Laplacian kernel: k(x, y) = o · exp(-‖x - y‖₁ / (2l²))
///
/// Heavier tails than the squared exponential kernel. The derivatives are
/// taken away from the kink at x_i = y_i, where the sign is treated as zero.
#[derive(Debug, Clone, Copy)]
pub struct LaplacianKernel {
    length_scale: f64,
    output_scale: f64,
}

impl LaplacianKernel {
    /// # Panics
    /// Panics if either scale is not positive
    pub fn new(length_scale: f64, output_scale: f64) -> Self {
        assert!(
            length_scale > 0.0,
            "Length scale must be positive, got: {}",
            length_scale
        );
        assert!(
            output_scale > 0.0,
            "Output scale must be positive, got: {}",
            output_scale
        );
        Self {
            length_scale,
            output_scale,
        }
    }

    pub fn with_length_scale(length_scale: f64) -> Self {
        Self::new(length_scale, 1.0)
    }

    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    pub fn output_scale(&self) -> f64 {
        self.output_scale
    }

    fn denominator(&self) -> f64 {
        2.0 * self.length_scale * self.length_scale
    }
}

impl Default for LaplacianKernel {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl Kernel for LaplacianKernel {
    fn compute(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        self.output_scale * (-manhattan_distance(x, y) / self.denominator()).exp()
    }
}

impl DifferentiableKernel for LaplacianKernel {
    fn grad_x(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> Array1<f64> {
        -self.grad_y(x, y)
    }

    fn grad_y(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> Array1<f64> {
        let k = self.compute(x, y);
        let denominator = self.denominator();
        (&x - &y).mapv(|d| sign(d) * k / denominator)
    }

    fn divergence_x_grad_y(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        let k = self.compute(x, y);
        let denominator = self.denominator();
        -(x.len() as f64) * k / (denominator * denominator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::tests::assert_gradients_match;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_known_value() {
        // ‖x - y‖₁ = 3, 2l² = 2: k = exp(-1.5)
        let kernel = LaplacianKernel::default();
        let x = array![1.0, 0.0];
        let y = array![0.0, 2.0];
        assert_abs_diff_eq!(
            kernel.compute(x.view(), y.view()),
            (-1.5f64).exp(),
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_symmetry_and_self_similarity() {
        let kernel = LaplacianKernel::new(0.5, 3.0);
        let x = array![0.1, 0.2, -0.4];
        let y = array![1.0, -2.0, 0.5];
        assert_eq!(
            kernel.compute(x.view(), y.view()),
            kernel.compute(y.view(), x.view())
        );
        assert_abs_diff_eq!(kernel.compute(x.view(), x.view()), 3.0, epsilon = 1e-15);
    }

    #[test]
    fn test_gradient_zero_at_equal_coordinates() {
        let kernel = LaplacianKernel::default();
        let x = array![1.0, 2.0];
        let y = array![1.0, 3.0];
        let grad = kernel.grad_y(x.view(), y.view());
        assert_eq!(grad[0], 0.0);
        assert!(grad[1] < 0.0);
    }

    #[test]
    fn test_gradients() {
        assert_gradients_match(&LaplacianKernel::new(1.1, 0.8));
    }

    #[test]
    #[should_panic(expected = "Length scale must be positive")]
    fn test_invalid_length_scale() {
        LaplacianKernel::new(-1.0, 1.0);
    }
}
