//! Preconditioned inverse multi-quadric (PCIMQ) kernel implementation

use crate::kernel::{DifferentiableKernel, Kernel};
use crate::utils::squared_distance;
use ndarray::{Array1, ArrayView1};

/// PCIMQ kernel: k(x, y) = o / √(1 + ‖x - y‖² / (2l²))
///
/// Polynomial tails make it the usual base kernel for Stein discrepancies,
/// where exponential tails would fail to detect non-convergence.
#[derive(Debug, Clone, Copy)]
pub struct PCIMQKernel {
    length_scale: f64,
    output_scale: f64,
}

impl PCIMQKernel {
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

    /// u = 1 + ‖x - y‖² / (2l²)
    fn base(&self, sq_dist: f64) -> f64 {
        1.0 + sq_dist / (2.0 * self.length_scale * self.length_scale)
    }
}

impl Default for PCIMQKernel {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl Kernel for PCIMQKernel {
    fn compute(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        self.output_scale / self.base(squared_distance(x, y)).sqrt()
    }
}

impl DifferentiableKernel for PCIMQKernel {
    fn grad_x(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> Array1<f64> {
        -self.grad_y(x, y)
    }

    // ∂k/∂y = o (x - y) / (2l²) · u^(-3/2)
    fn grad_y(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> Array1<f64> {
        let u = self.base(squared_distance(x, y));
        let l2 = self.length_scale * self.length_scale;
        (&x - &y) * (self.output_scale / (2.0 * l2) * u.powf(-1.5))
    }

    fn divergence_x_grad_y(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        let sq_dist = squared_distance(x, y);
        let u = self.base(sq_dist);
        let l2 = self.length_scale * self.length_scale;
        let d = x.len() as f64;
        self.output_scale / (2.0 * l2)
            * (d * u.powf(-1.5) - 3.0 * sq_dist / (2.0 * l2) * u.powf(-2.5))
    }
}
