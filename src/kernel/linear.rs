//! Linear kernel implementation

use crate::kernel::{DifferentiableKernel, Kernel};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Linear kernel: k(x, y) = o · xᵀy + c
///
/// Not bounded below, so MMD under this kernel only compares means.
#[derive(Debug, Clone, Copy)]
pub struct LinearKernel {
    output_scale: f64,
    constant: f64,
}

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new(output_scale: f64, constant: f64) -> Self {
        Self {
            output_scale,
            constant,
        }
    }

    pub fn output_scale(&self) -> f64 {
        self.output_scale
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }
}

impl Default for LinearKernel {
    fn default() -> Self {
        Self::new(1.0, 0.0)
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        self.output_scale * x.dot(&y) + self.constant
    }

    fn compute_block(&self, x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Array2<f64> {
        x.dot(&y.t()) * self.output_scale + self.constant
    }
}

impl DifferentiableKernel for LinearKernel {
    fn grad_x(&self, _x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> Array1<f64> {
        &y * self.output_scale
    }

    fn grad_y(&self, x: ArrayView1<'_, f64>, _y: ArrayView1<'_, f64>) -> Array1<f64> {
        &x * self.output_scale
    }

    fn divergence_x_grad_y(&self, x: ArrayView1<'_, f64>, _y: ArrayView1<'_, f64>) -> f64 {
        self.output_scale * x.len() as f64
    }
}
