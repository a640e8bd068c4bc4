//! Kernel trait definitions

use crate::core::Result;
use crate::kernel::gramian;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Kernel function trait
///
/// A kernel k(x, y) measures the similarity of two feature vectors. Only
/// `compute` is required; the block and mean operations are tiled on top of it
/// and may be overridden when a kernel can share work across a block.
pub trait Kernel: Send + Sync {
    /// Compute kernel value k(x, y)
    fn compute(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64;

    /// Compute the matrix of k(x_i, y_j) for all rows of `x` and `y`
    fn compute_block(&self, x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Array2<f64> {
        Array2::from_shape_fn((x.nrows(), y.nrows()), |(i, j)| {
            self.compute(x.row(i), y.row(j))
        })
    }

    /// Compute k(x, y_j) for every row of `y`
    fn compute_row(&self, x: ArrayView1<'_, f64>, y: ArrayView2<'_, f64>) -> Array1<f64> {
        y.rows().into_iter().map(|row| self.compute(x, row)).collect()
    }

    /// Compute k(x_i, x_i) for every row of `x`
    fn diagonal(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.compute(row, row)).collect()
    }

    /// Check that the kernel can be evaluated on the rows of `x`
    ///
    /// Kernels that call out to user code validate its output here, so that
    /// evaluation itself never has to fail.
    fn validate_points(&self, _x: ArrayView2<'_, f64>) -> Result<()> {
        Ok(())
    }

    /// Validate `x` and return per-point values reused by [`cached_row`](Self::cached_row)
    fn point_cache(&self, x: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>> {
        self.validate_points(x)?;
        Ok(None)
    }

    /// Compute k(x_i, x_j) for every row j, given the output of
    /// [`point_cache`](Self::point_cache) on the same `x`
    fn cached_row(
        &self,
        i: usize,
        x: ArrayView2<'_, f64>,
        _cache: Option<ArrayView2<'_, f64>>,
    ) -> Array1<f64> {
        self.compute_row(x.row(i), x)
    }

    /// Mean of each Gramian row, computed in tiles of `block_size` columns
    ///
    /// Tiles in flight together hold at most about `block_size` × `block_size`
    /// values, instead of the full n × n matrix. A `block_size` of zero is
    /// rejected.
    fn gramian_row_mean(&self, x: ArrayView2<'_, f64>, block_size: usize) -> Result<Array1<f64>> {
        gramian::row_mean(self, x, block_size)
    }

    /// Weighted mean of k(x_i, y_j) over all pairs, computed in tiles
    ///
    /// Missing weights are uniform; supplied weights are normalised to sum to one.
    fn compute_mean(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView2<'_, f64>,
        weights_x: Option<ArrayView1<'_, f64>>,
        weights_y: Option<ArrayView1<'_, f64>>,
        block_size: usize,
    ) -> Result<f64> {
        gramian::weighted_mean(self, x, y, weights_x, weights_y, block_size)
    }
}

impl<K: Kernel + ?Sized> Kernel for Box<K> {
    fn compute(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        (**self).compute(x, y)
    }

    fn compute_block(&self, x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Array2<f64> {
        (**self).compute_block(x, y)
    }

    fn compute_row(&self, x: ArrayView1<'_, f64>, y: ArrayView2<'_, f64>) -> Array1<f64> {
        (**self).compute_row(x, y)
    }

    fn diagonal(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        (**self).diagonal(x)
    }

    fn validate_points(&self, x: ArrayView2<'_, f64>) -> Result<()> {
        (**self).validate_points(x)
    }

    fn point_cache(&self, x: ArrayView2<'_, f64>) -> Result<Option<Array2<f64>>> {
        (**self).point_cache(x)
    }

    fn cached_row(
        &self,
        i: usize,
        x: ArrayView2<'_, f64>,
        cache: Option<ArrayView2<'_, f64>>,
    ) -> Array1<f64> {
        (**self).cached_row(i, x, cache)
    }

    fn gramian_row_mean(&self, x: ArrayView2<'_, f64>, block_size: usize) -> Result<Array1<f64>> {
        (**self).gramian_row_mean(x, block_size)
    }

    fn compute_mean(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView2<'_, f64>,
        weights_x: Option<ArrayView1<'_, f64>>,
        weights_y: Option<ArrayView1<'_, f64>>,
        block_size: usize,
    ) -> Result<f64> {
        (**self).compute_mean(x, y, weights_x, weights_y, block_size)
    }
}

/// Kernels with closed-form derivatives, as required to build a Stein kernel
pub trait DifferentiableKernel: Kernel {
    /// Gradient of k(x, y) with respect to x
    fn grad_x(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> Array1<f64>;

    /// Gradient of k(x, y) with respect to y
    fn grad_y(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> Array1<f64>;

    /// Divergence with respect to x of the gradient with respect to y,
    /// i.e. the trace of the mixed second derivative ∂²k/∂x∂y
    fn divergence_x_grad_y(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64;
}

/// Score function: the gradient of the log-density of the data
///
/// Estimated outside this crate (density estimation, score matching, or an
/// analytic model) and consumed only as a callable.
pub trait ScoreFunction: Send + Sync {
    fn score(&self, x: ArrayView1<'_, f64>) -> Array1<f64>;
}

impl<F> ScoreFunction for F
where
    F: Fn(ArrayView1<'_, f64>) -> Array1<f64> + Send + Sync,
{
    fn score(&self, x: ArrayView1<'_, f64>) -> Array1<f64> {
        self(x)
    }
}
