//! Randomly pivoted Cholesky
//!
//! Builds a rank-m approximation of the Gramian one column at a time. Each
//! pivot is drawn with probability proportional to the residual diagonal, so
//! points the current approximation explains poorly are the likeliest picks.

use crate::core::{Block, CoresetError, Result};
use crate::coresubset::traits::check_unique_size;
use crate::coresubset::CoresetMethod;
use crate::kernel::gramian::GramianRows;
use crate::kernel::Kernel;
use log::{debug, warn};
use ndarray::{s, Array1, Array2};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Randomly pivoted Cholesky constructor
#[derive(Debug, Clone)]
pub struct RPCholesky<K: Kernel> {
    kernel: K,
    unique: bool,
}

impl<K: Kernel> RPCholesky<K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            unique: true,
        }
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    fn draw_pivot(&self, residual: &Array1<f64>, selected: &[bool], rng: &mut ChaCha8Rng) -> usize {
        if residual.sum().is_finite() {
            if let Ok(distribution) = WeightedIndex::new(residual.iter()) {
                return distribution.sample(rng);
            }
        }

        // Residual exhausted: the current pivots explain every point, so any
        // choice adds nothing and a uniform draw keeps the size contract
        warn!("RPCholesky residual has no remaining mass, drawing the pivot uniformly");
        let candidates: Vec<usize> = (0..residual.len())
            .filter(|&i| !(self.unique && selected[i]))
            .collect();
        candidates[rng.gen_range(0..candidates.len())]
    }
}

impl<K: Kernel> CoresetMethod for RPCholesky<K> {
    fn name(&self) -> &'static str {
        "rp_cholesky"
    }

    fn validate_coreset_size(&self, coreset_size: i64) -> Result<usize> {
        match coreset_size {
            0 => Err(CoresetError::InvalidCoresetSize(
                "coreset_size must be non-zero".to_string(),
            )),
            s if s < 0 => Err(CoresetError::InvalidCoresetSize(
                "coreset_size must not be negative".to_string(),
            )),
            s => Ok(s as usize),
        }
    }

    fn select(
        &self,
        block: &Block<'_>,
        coreset_size: usize,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<usize>> {
        let n = block.len();
        check_unique_size(self.unique, coreset_size, n)?;
        if coreset_size == 0 {
            return Ok(Vec::new());
        }
        if n == 0 {
            return Err(CoresetError::EmptyDataset);
        }

        let rows = GramianRows::new(&self.kernel, block.points.view())?;
        let mut residual = rows.diagonal().mapv(|v| v.max(0.0));
        let mut factor = Array2::<f64>::zeros((n, coreset_size));
        let mut selected = vec![false; n];
        let mut indices = Vec::with_capacity(coreset_size);

        for step in 0..coreset_size {
            let pivot = self.draw_pivot(&residual, &selected, rng);

            // Column of the residual Gramian at the pivot
            let previous = factor.slice(s![.., ..step]);
            let mut column = rows.row(pivot) - previous.dot(&previous.row(pivot));

            let pivot_residual = column[pivot];
            if pivot_residual > 0.0 {
                column /= pivot_residual.sqrt();
            } else {
                column.fill(0.0);
            }

            residual.zip_mut_with(&column, |r, c| *r = (*r - c * c).max(0.0));
            if self.unique {
                residual[pivot] = 0.0;
            }
            factor.column_mut(step).assign(&column);
            selected[pivot] = true;
            indices.push(pivot);
        }

        debug!(
            "RPCholesky selected {} of {} points, residual trace {:.3e}",
            coreset_size,
            n,
            residual.sum()
        );
        Ok(indices)
    }

    fn unique(&self) -> bool {
        self.unique
    }

    fn kernel(&self) -> Option<&dyn Kernel> {
        Some(&self.kernel)
    }
}
