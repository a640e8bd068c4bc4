//! Kernel herding
//!
//! Greedy selection balancing density (the Gramian row-mean) against
//! similarity to points already chosen (an accumulated penalty). Step t scores
//! every point as r[i] - p[i] / (t + 1), picks the first maximum, and adds the
//! selected point's kernel row to the penalty.

use crate::core::{Block, CoresetError, Result};
use crate::coresubset::traits::check_unique_size;
use crate::coresubset::CoresetMethod;
use crate::kernel::gramian::GramianRows;
use crate::kernel::Kernel;
use crate::utils::argmax;
use log::debug;
use ndarray::{Array1, ArrayView1};
use rand_chacha::ChaCha8Rng;

/// Default tile size for the Gramian row-mean
pub const DEFAULT_BLOCK_SIZE: usize = 10_000;

/// State carried between greedy steps
#[derive(Debug, Clone, PartialEq)]
pub struct GreedyState {
    /// Selected indices; entries at positions >= step are placeholders
    pub indices: Array1<usize>,
    /// Accumulated kernel similarity of every point to the selection
    pub penalty: Array1<f64>,
}

impl GreedyState {
    /// Initial state for selecting `coreset_size` of `n` points
    pub fn new(coreset_size: usize, n: usize) -> Self {
        Self {
            indices: Array1::zeros(coreset_size),
            penalty: Array1::zeros(n),
        }
    }
}

/// One herding step
///
/// `kernel_row(i)` must return k(x_i, x_j) for every j. With `unique` the
/// selected point's penalty becomes infinite so it can never win again.
pub fn greedy_body<F>(
    step: usize,
    state: GreedyState,
    kernel_row: F,
    gramian_row_mean: ArrayView1<'_, f64>,
    unique: bool,
) -> Result<GreedyState>
where
    F: Fn(usize) -> Array1<f64>,
{
    let GreedyState {
        mut indices,
        mut penalty,
    } = state;

    let scale = (step + 1) as f64;
    let scores = &gramian_row_mean - &(&penalty / scale);
    let selected = argmax(scores.view()).ok_or_else(|| {
        CoresetError::OptimizationError(format!("no finite herding score at step {}", step))
    })?;

    indices[step] = selected;
    penalty += &kernel_row(selected);
    if unique {
        penalty[selected] = f64::INFINITY;
    }

    Ok(GreedyState { indices, penalty })
}

/// Kernel herding constructor
///
/// # Example
/// ```
/// use rcoreset::{KernelHerding, SquaredExponentialKernel};
///
/// let herding = KernelHerding::new(SquaredExponentialKernel::default())
///     .with_unique(true)
///     .with_block_size(1_000);
/// ```
#[derive(Debug, Clone)]
pub struct KernelHerding<K: Kernel> {
    kernel: K,
    unique: bool,
    block_size: usize,
    gramian_row_mean: Option<Array1<f64>>,
}

impl<K: Kernel> KernelHerding<K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            unique: true,
            block_size: DEFAULT_BLOCK_SIZE,
            gramian_row_mean: None,
        }
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Tile size for the Gramian row-mean computation
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Supply the row-mean of the full dataset's Gramian
    ///
    /// Used only when selecting from the complete dataset; partitions produced
    /// by map-reduce always compute their own.
    pub fn with_gramian_row_mean(mut self, gramian_row_mean: Array1<f64>) -> Self {
        self.gramian_row_mean = Some(gramian_row_mean);
        self
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    fn row_mean(&self, block: &Block<'_>) -> Result<Array1<f64>> {
        match &self.gramian_row_mean {
            Some(precomputed) if block.spans_dataset => {
                if precomputed.len() != block.len() {
                    return Err(CoresetError::InvalidParameter(format!(
                        "gramian_row_mean has length {} but the dataset has {} points",
                        precomputed.len(),
                        block.len()
                    )));
                }
                Ok(precomputed.clone())
            }
            _ => self.kernel.gramian_row_mean(block.points, self.block_size),
        }
    }
}

impl<K: Kernel> CoresetMethod for KernelHerding<K> {
    fn name(&self) -> &'static str {
        "kernel_herding"
    }

    fn validate_coreset_size(&self, coreset_size: i64) -> Result<usize> {
        match coreset_size {
            0 => Err(CoresetError::InvalidCoresetSize(
                "coreset_size must be non-zero".to_string(),
            )),
            s if s < 0 => Err(CoresetError::InvalidCoresetSize(
                "coreset_size must be a positive integer".to_string(),
            )),
            s => Ok(s as usize),
        }
    }

    fn select(
        &self,
        block: &Block<'_>,
        coreset_size: usize,
        _rng: &mut ChaCha8Rng,
    ) -> Result<Vec<usize>> {
        check_unique_size(self.unique, coreset_size, block.len())?;
        if coreset_size == 0 {
            return Ok(Vec::new());
        }

        let rows = GramianRows::new(&self.kernel, block.points.view())?;
        let row_mean = self.row_mean(block)?;
        let kernel_row = |i: usize| rows.row(i);

        let mut state = GreedyState::new(coreset_size, block.len());
        for step in 0..coreset_size {
            state = greedy_body(step, state, &kernel_row, row_mean.view(), self.unique)?;
        }

        debug!(
            "Kernel herding selected {} of {} points",
            coreset_size,
            block.len()
        );
        Ok(state.indices.to_vec())
    }

    fn unique(&self) -> bool {
        self.unique
    }

    fn kernel(&self) -> Option<&dyn Kernel> {
        Some(&self.kernel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{tests::random_points, PCIMQKernel, SquaredExponentialKernel, SteinKernel};
    use ndarray::array;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(0)
    }

    // Every kernel row is [1, 1, 1]; only the penalty bookkeeping matters
    fn constant_row(_: usize) -> Array1<f64> {
        array![1.0, 1.0, 1.0]
    }

    #[test]
    fn test_greedy_body_selects_row_mean_argmax() {
        let row_mean = array![0.6, 0.75, 0.55];
        let state = GreedyState::new(2, 3);

        let state = greedy_body(0, state, constant_row, row_mean.view(), true).unwrap();
        assert_eq!(state.indices, array![1, 0]);
        assert_eq!(state.penalty, array![1.0, f64::INFINITY, 1.0]);
    }

    #[test]
    fn test_greedy_body_penalty_changes_choice() {
        let row_mean = array![0.6, 0.75, 0.55];
        let mut state = GreedyState::new(2, 3);
        state = greedy_body(0, state, constant_row, row_mean.view(), true).unwrap();

        // Point 0 has the next highest density, but a penalty of 2 * 0.59
        // halved at step 1 leaves it below point 2
        state.penalty[0] = 2.0 * 0.59;
        let state = greedy_body(1, state, constant_row, row_mean.view(), false).unwrap();

        assert_eq!(state.indices, array![1, 2]);
        assert!(state.penalty[2] < f64::INFINITY);
    }

    #[test]
    fn test_validate_coreset_size() {
        let herding = KernelHerding::new(SquaredExponentialKernel::default());
        assert_eq!(herding.validate_coreset_size(5).unwrap(), 5);

        match herding.validate_coreset_size(0) {
            Err(CoresetError::InvalidCoresetSize(msg)) => {
                assert_eq!(msg, "coreset_size must be non-zero")
            }
            other => panic!("unexpected result: {:?}", other),
        }
        match herding.validate_coreset_size(-2) {
            Err(e) => assert_eq!(e.to_string(), "coreset_size must be a positive integer"),
            Ok(_) => panic!("negative size accepted"),
        }
    }

    #[test]
    fn test_select_unique() {
        let x = random_points(40, 2, 11);
        let herding = KernelHerding::new(SquaredExponentialKernel::new(0.3, 1.0));
        let indices = herding.select(&Block::full(x.view()), 10, &mut rng()).unwrap();

        assert_eq!(indices.len(), 10);
        let mut sorted = indices.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 10);
        assert!(indices.iter().all(|&i| i < 40));
    }

    #[test]
    fn test_select_first_point_is_densest() {
        let x = random_points(25, 2, 4);
        let kernel = SquaredExponentialKernel::new(0.5, 1.0);
        let row_mean = kernel.gramian_row_mean(x.view(), 8).unwrap();
        let herding = KernelHerding::new(kernel).with_block_size(8);

        let indices = herding.select(&Block::full(x.view()), 3, &mut rng()).unwrap();
        assert_eq!(Some(indices[0]), argmax(row_mean.view()));
    }

    #[test]
    fn test_precomputed_row_mean() {
        let x = array![[0.0], [1.0], [2.0]];
        let herding = KernelHerding::new(SquaredExponentialKernel::default())
            .with_gramian_row_mean(array![0.1, 0.2, 0.9]);

        let indices = herding.select(&Block::full(x.view()), 1, &mut rng()).unwrap();
        assert_eq!(indices, vec![2]);

        // Partitions ignore the precomputed vector and recompute; the middle
        // point is the densest
        let indices = herding
            .select(&Block::partition(x.view()), 1, &mut rng())
            .unwrap();
        assert_eq!(indices, vec![1]);
    }

    #[test]
    fn test_precomputed_row_mean_matches_computed() {
        let x = random_points(60, 3, 21);
        let kernel = SquaredExponentialKernel::new(0.4, 1.0);
        let row_mean = kernel.gramian_row_mean(x.view(), DEFAULT_BLOCK_SIZE).unwrap();

        let computed = KernelHerding::new(kernel)
            .select(&Block::full(x.view()), 12, &mut rng())
            .unwrap();
        let supplied = KernelHerding::new(kernel)
            .with_gramian_row_mean(row_mean)
            .select(&Block::full(x.view()), 12, &mut rng())
            .unwrap();
        assert_eq!(computed, supplied);
    }

    #[test]
    fn test_bad_score_function_is_an_error() {
        let x = random_points(20, 2, 8);
        let kernel = SteinKernel::new(PCIMQKernel::default(), |x: ArrayView1<'_, f64>| {
            Array1::<f64>::zeros(x.len() + 1)
        });
        let herding = KernelHerding::new(kernel);

        let result = herding.select(&Block::full(x.view()), 4, &mut rng());
        assert!(matches!(
            result,
            Err(CoresetError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));

        // Also rejected when the row-mean is supplied and never recomputed
        let with_row_mean = herding.with_gramian_row_mean(Array1::zeros(20));
        let result = with_row_mean.select(&Block::full(x.view()), 4, &mut rng());
        assert!(matches!(result, Err(CoresetError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_precomputed_row_mean_wrong_length() {
        let x = array![[0.0], [1.0], [2.0]];
        let herding = KernelHerding::new(SquaredExponentialKernel::default())
            .with_gramian_row_mean(array![0.1, 0.2]);
        let result = herding.select(&Block::full(x.view()), 1, &mut rng());
        assert!(matches!(result, Err(CoresetError::InvalidParameter(_))));
    }

    #[test]
    fn test_unique_size_larger_than_block() {
        let x = array![[0.0], [1.0]];
        let herding = KernelHerding::new(SquaredExponentialKernel::default());
        let result = herding.select(&Block::full(x.view()), 3, &mut rng());
        assert!(matches!(result, Err(CoresetError::InvalidParameter(_))));

        let repeats = herding.with_unique(false);
        let indices = repeats.select(&Block::full(x.view()), 3, &mut rng()).unwrap();
        assert_eq!(indices.len(), 3);
    }
}
