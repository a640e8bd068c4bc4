//! Squared exponential kernel implementation
//!
//! The squared exponential kernel is defined as: k(x, y) = o · exp(-‖x - y‖² / (2l²))
//! where l (length scale) controls the kernel width and o (output scale) its amplitude.

use crate::kernel::{DifferentiableKernel, Kernel};
use crate::utils::{squared_distance, squared_norms};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Zip};
use std::f64::consts::PI;

/// Squared exponential kernel: k(x, y) = o · exp(-‖x - y‖² / (2l²))
///
/// The Gaussian (RBF) kernel under another name; `gamma` in RBF terms is
/// 1 / (2l²). A small length scale makes similarity decay quickly with
/// distance, a large one makes distant points look alike.
#[derive(Debug, Clone, Copy)]
pub struct SquaredExponentialKernel {
    length_scale: f64,
    output_scale: f64,
}

impl SquaredExponentialKernel {
    /// Create a new squared exponential kernel
    ///
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

    /// Create a kernel with unit output scale
    pub fn with_length_scale(length_scale: f64) -> Self {
        Self::new(length_scale, 1.0)
    }

    /// Create a kernel normalised as a one-dimensional Gaussian density,
    /// o = 1 / (l√(2π))
    pub fn normalised(length_scale: f64) -> Self {
        Self::new(length_scale, 1.0 / (length_scale * (2.0 * PI).sqrt()))
    }

    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    pub fn output_scale(&self) -> f64 {
        self.output_scale
    }

    fn from_squared_distance(&self, sq_dist: f64) -> f64 {
        self.output_scale * (-sq_dist / (2.0 * self.length_scale * self.length_scale)).exp()
    }
}

impl Default for SquaredExponentialKernel {
    /// Default kernel with unit length and output scale
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl Kernel for SquaredExponentialKernel {
    fn compute(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        self.from_squared_distance(squared_distance(x, y))
    }

    fn compute_block(&self, x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Array2<f64> {
        // ‖x - y‖² = ‖x‖² + ‖y‖² - 2xᵀy
        let x_norms = squared_norms(x);
        let y_norms = squared_norms(y);
        let mut block = x.dot(&y.t());
        Zip::indexed(&mut block).for_each(|(i, j), cross| {
            let sq_dist = (x_norms[i] + y_norms[j] - 2.0 * *cross).max(0.0);
            *cross = self.from_squared_distance(sq_dist);
        });
        block
    }
}

impl DifferentiableKernel for SquaredExponentialKernel {
    fn grad_x(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> Array1<f64> {
        -self.grad_y(x, y)
    }

    fn grad_y(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> Array1<f64> {
        let k = self.compute(x, y);
        let l2 = self.length_scale * self.length_scale;
        (&x - &y) * (k / l2)
    }

    fn divergence_x_grad_y(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        let sq_dist = squared_distance(x, y);
        let k = self.from_squared_distance(sq_dist);
        let l2 = self.length_scale * self.length_scale;
        k / l2 * (x.len() as f64 - sq_dist / l2)
    }
}
