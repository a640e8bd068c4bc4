//! Tiled Gramian reductions
//!
//! The n × n Gramian is never formed. Columns are split into blocks of
//! `block_size` and rows into slices of `block_size / workers`, so the tiles
//! alive at once hold about `block_size²` values. Row slices run in parallel;
//! each walks the column blocks in order and folds every tile into per-row
//! sums before dropping it.

use crate::core::{CoresetError, Result};
use crate::kernel::Kernel;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

fn block_starts(n: usize, block_size: usize) -> Vec<usize> {
    (0..n).step_by(block_size).collect()
}

/// Rows per tile, so that one tile per worker fits in `block_size²` values
fn rows_per_tile(block_size: usize) -> usize {
    (block_size / rayon::current_num_threads().max(1)).max(1)
}

fn check_block_size(block_size: usize) -> Result<()> {
    if block_size == 0 {
        return Err(CoresetError::InvalidParameter(
            "block_size must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

/// Sum of f(tile) over the column blocks of `y`, for every row of `x`
///
/// `f` maps a tile and its column range to one value per tile row. Each row's
/// sum is accumulated in column order, so the result does not depend on the
/// row split or on scheduling.
fn tiled_row_sums<K, F>(
    kernel: &K,
    x: ArrayView2<'_, f64>,
    y: ArrayView2<'_, f64>,
    block_size: usize,
    f: F,
) -> Array1<f64>
where
    K: Kernel + ?Sized,
    F: Fn(&Array2<f64>, usize, usize) -> Array1<f64> + Sync,
{
    let row_block = rows_per_tile(block_size);
    let col_starts = block_starts(y.nrows(), block_size);
    let row_sums: Vec<Array1<f64>> = block_starts(x.nrows(), row_block)
        .par_iter()
        .map(|&row_start| {
            let row_end = (row_start + row_block).min(x.nrows());
            let rows = x.slice(s![row_start..row_end, ..]);
            let mut acc = Array1::<f64>::zeros(row_end - row_start);
            for &col_start in &col_starts {
                let col_end = (col_start + block_size).min(y.nrows());
                let tile = kernel.compute_block(rows, y.slice(s![col_start..col_end, ..]));
                acc += &f(&tile, col_start, col_end);
            }
            acc
        })
        .collect();

    let mut sums = Vec::with_capacity(x.nrows());
    for block in row_sums {
        sums.extend(block.iter().copied());
    }
    Array1::from_vec(sums)
}

/// Row means of the Gramian of `x` against itself
pub(crate) fn row_mean<K: Kernel + ?Sized>(
    kernel: &K,
    x: ArrayView2<'_, f64>,
    block_size: usize,
) -> Result<Array1<f64>> {
    cross_row_mean(kernel, x, x, block_size)
}

/// Mean of k(x_i, y_j) over j, for every row of `x`
pub(crate) fn cross_row_mean<K: Kernel + ?Sized>(
    kernel: &K,
    x: ArrayView2<'_, f64>,
    y: ArrayView2<'_, f64>,
    block_size: usize,
) -> Result<Array1<f64>> {
    check_block_size(block_size)?;
    if x.nrows() == 0 {
        return Ok(Array1::zeros(0));
    }
    if y.nrows() == 0 {
        return Err(CoresetError::EmptyDataset);
    }
    kernel.validate_points(x)?;
    kernel.validate_points(y)?;

    let m = y.nrows() as f64;
    let sums = tiled_row_sums(kernel, x, y, block_size, |tile, _, _| tile.sum_axis(Axis(1)));
    Ok(sums / m)
}

/// Normalise optional weights to a probability vector of length `n`
pub(crate) fn normalised_weights(weights: Option<ArrayView1<'_, f64>>, n: usize) -> Result<Array1<f64>> {
    match weights {
        None => Ok(Array1::from_elem(n, 1.0 / n as f64)),
        Some(w) => {
            if w.len() != n {
                return Err(CoresetError::DimensionMismatch {
                    expected: n,
                    actual: w.len(),
                });
            }
            let total = w.sum();
            if !total.is_finite() || total <= 0.0 {
                return Err(CoresetError::InvalidParameter(
                    "weights must have a positive, finite sum".to_string(),
                ));
            }
            Ok(w.mapv(|v| v / total))
        }
    }
}

/// Weighted mean of k(x_i, y_j) over all pairs
pub(crate) fn weighted_mean<K: Kernel + ?Sized>(
    kernel: &K,
    x: ArrayView2<'_, f64>,
    y: ArrayView2<'_, f64>,
    weights_x: Option<ArrayView1<'_, f64>>,
    weights_y: Option<ArrayView1<'_, f64>>,
    block_size: usize,
) -> Result<f64> {
    check_block_size(block_size)?;
    if x.nrows() == 0 || y.nrows() == 0 {
        return Err(CoresetError::EmptyDataset);
    }
    if x.ncols() != y.ncols() {
        return Err(CoresetError::DimensionMismatch {
            expected: x.ncols(),
            actual: y.ncols(),
        });
    }

    kernel.validate_points(x)?;
    kernel.validate_points(y)?;

    let wx = normalised_weights(weights_x, x.nrows())?;
    let wy = normalised_weights(weights_y, y.nrows())?;
    let row_totals = tiled_row_sums(kernel, x, y, block_size, |tile, col_start, col_end| {
        tile.dot(&wy.slice(s![col_start..col_end]))
    });
    Ok(wx.dot(&row_totals))
}

/// Rows of the Gramian of a fixed point set
///
/// Per-point kernel work, such as Stein scores, is done once when the rows
/// are set up and reused by every [`row`](Self::row).
pub(crate) struct GramianRows<'a, K: Kernel + ?Sized> {
    kernel: &'a K,
    points: ArrayView2<'a, f64>,
    cache: Option<Array2<f64>>,
}

impl<'a, K: Kernel + ?Sized> GramianRows<'a, K> {
    /// Validate `points` for `kernel` and precompute its per-point values
    pub(crate) fn new(kernel: &'a K, points: ArrayView2<'a, f64>) -> Result<Self> {
        let cache = kernel.point_cache(points)?;
        Ok(Self {
            kernel,
            points,
            cache,
        })
    }

    /// k(x_i, x_j) for every point j
    pub(crate) fn row(&self, i: usize) -> Array1<f64> {
        self.kernel
            .cached_row(i, self.points, self.cache.as_ref().map(|c| c.view()))
    }

    pub(crate) fn diagonal(&self) -> Array1<f64> {
        self.kernel.diagonal(self.points)
    }
}
