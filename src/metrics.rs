//! Discrepancy metrics between a dataset and a (weighted) coreset

use crate::core::Result;
use crate::kernel::Kernel;
use log::debug;
use ndarray::{ArrayView1, ArrayView2};

/// Default tile size for the kernel means
pub const DEFAULT_BLOCK_SIZE: usize = 10_000;

/// Default threshold below which MMD² is reported as exactly zero
pub const DEFAULT_PRECISION_THRESHOLD: f64 = 1e-12;

/// Metric comparing two weighted point sets
pub trait Metric: Send + Sync {
    /// Discrepancy between `x` and `y`; missing weights are uniform
    fn evaluate(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView2<'_, f64>,
        weights_x: Option<ArrayView1<'_, f64>>,
        weights_y: Option<ArrayView1<'_, f64>>,
    ) -> Result<f64>;
}

/// Maximum mean discrepancy
///
/// MMD²(X, Y) = E k(x, x') + E k(y, y') − 2 E k(x, y), each expectation a
/// tiled weighted mean. Round-off can push MMD² slightly negative or leave a
/// tiny positive residue for identical inputs; any value below the precision
/// threshold is reported as 0 before taking the square root.
#[derive(Debug, Clone)]
pub struct MMD<K: Kernel> {
    kernel: K,
    block_size: usize,
    precision_threshold: f64,
}

impl<K: Kernel> MMD<K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            block_size: DEFAULT_BLOCK_SIZE,
            precision_threshold: DEFAULT_PRECISION_THRESHOLD,
        }
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_precision_threshold(mut self, precision_threshold: f64) -> Self {
        self.precision_threshold = precision_threshold;
        self
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// MMD between uniformly weighted `x` and `y`
    pub fn compute(&self, x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Result<f64> {
        self.compute_weighted(x, y, None, None)
    }

    /// MMD between weighted `x` and `y`; weights are normalised to sum to one
    pub fn compute_weighted(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView2<'_, f64>,
        weights_x: Option<ArrayView1<'_, f64>>,
        weights_y: Option<ArrayView1<'_, f64>>,
    ) -> Result<f64> {
        let kxx = self
            .kernel
            .compute_mean(x, x, weights_x, weights_x, self.block_size)?;
        let kyy = self
            .kernel
            .compute_mean(y, y, weights_y, weights_y, self.block_size)?;
        let kxy = self
            .kernel
            .compute_mean(x, y, weights_x, weights_y, self.block_size)?;

        let squared = kxx + kyy - 2.0 * kxy;
        if squared < self.precision_threshold {
            debug!("MMD² of {:.3e} is below the precision threshold, reporting 0", squared);
            return Ok(0.0);
        }
        Ok(squared.sqrt())
    }
}

impl<K: Kernel> Metric for MMD<K> {
    fn evaluate(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView2<'_, f64>,
        weights_x: Option<ArrayView1<'_, f64>>,
        weights_y: Option<ArrayView1<'_, f64>>,
    ) -> Result<f64> {
        self.compute_weighted(x, y, weights_x, weights_y)
    }
}
