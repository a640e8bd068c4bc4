//! Local-search refinement of fitted coresets
//!
//! Every strategy swaps one coreset point for an original point at a time and
//! keeps a swap only if it strictly lowers MMD² between the uniformly weighted
//! coreset and the data. Swap gains are evaluated incrementally from cached
//! kernel columns, so a candidate costs O(1) rather than a fresh MMD.

pub mod random;
pub mod regular;
pub mod reverse;

pub use self::random::RefineRandom;
pub use self::regular::RefineRegular;
pub use self::reverse::RefineReverse;

use crate::core::{CoresetError, RefineOutcome, Result};
use crate::kernel::gramian::GramianRows;
use crate::kernel::Kernel;
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand_chacha::ChaCha8Rng;

/// Smallest MMD² decrease accepted as an improvement
pub const IMPROVEMENT_THRESHOLD: f64 = 1e-12;

/// Default tile size for the data row-mean
pub const DEFAULT_BLOCK_SIZE: usize = 10_000;

/// Inputs shared by every refinement strategy
#[derive(Clone, Copy)]
pub struct RefineProblem<'a> {
    /// Kernel the discrepancy is measured in
    pub kernel: &'a dyn Kernel,
    /// Original data the coreset indexes into
    pub data: ArrayView2<'a, f64>,
    /// Forbid swaps that would duplicate a coreset point
    pub unique: bool,
    /// Tile size for the data row-mean
    pub block_size: usize,
}

impl<'a> RefineProblem<'a> {
    pub fn new(kernel: &'a dyn Kernel, data: ArrayView2<'a, f64>) -> Self {
        Self {
            kernel,
            data,
            unique: false,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }
}

/// Refinement strategy trait
pub trait Refine: Send + Sync {
    /// Improve `indices` in place; returns the passes run and swaps applied
    fn refine(
        &self,
        problem: &RefineProblem<'_>,
        indices: &mut [usize],
        rng: &mut ChaCha8Rng,
    ) -> Result<RefineOutcome>;
}

impl<R: Refine + ?Sized> Refine for Box<R> {
    fn refine(
        &self,
        problem: &RefineProblem<'_>,
        indices: &mut [usize],
        rng: &mut ChaCha8Rng,
    ) -> Result<RefineOutcome> {
        (**self).refine(problem, indices, rng)
    }
}

fn check_passes(max_passes: usize) -> Result<()> {
    if max_passes == 0 {
        return Err(CoresetError::InvalidParameter(
            "max_passes must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

/// Run `pass` up to `max_passes` times, stopping after a pass without swaps
pub(crate) fn run_passes<F>(max_passes: usize, mut pass: F) -> Result<RefineOutcome>
where
    F: FnMut() -> Result<usize>,
{
    check_passes(max_passes)?;
    let mut outcome = RefineOutcome::default();
    while outcome.passes < max_passes {
        let swaps = pass()?;
        outcome.passes += 1;
        outcome.swaps += swaps;
        debug!("Refine pass {} applied {} swaps", outcome.passes, swaps);
        if swaps == 0 {
            break;
        }
    }
    info!(
        "Refinement finished: {} passes, {} swaps",
        outcome.passes, outcome.swaps
    );
    Ok(outcome)
}

/// Cached quantities for incremental swap evaluation
///
/// For a coreset C of size m with uniform weights, replacing c_p by z changes
/// MMD² by
///
/// Δ = −2/m (r[z] − r[c_p])
///     + 1/m² (2 Σ_{j≠p} (k(z, c_j) − k(c_p, c_j)) + k(z, z) − k(c_p, c_p))
///
/// where r is the Gramian row-mean of the data. `cross` holds k(x_i, c_j)
/// for every data point i and coreset position j.
pub(crate) struct SwapState<'a> {
    problem: RefineProblem<'a>,
    rows: GramianRows<'a, dyn Kernel + 'a>,
    row_mean: Array1<f64>,
    diagonal: Array1<f64>,
    cross: Array2<f64>,
    cross_sums: Array1<f64>,
    membership: Vec<usize>,
}

impl<'a> SwapState<'a> {
    pub(crate) fn new(problem: &RefineProblem<'a>, indices: &[usize]) -> Result<Self> {
        let data = problem.data;
        let n = data.nrows();
        if n == 0 {
            return Err(CoresetError::EmptyDataset);
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= n) {
            return Err(CoresetError::InvalidParameter(format!(
                "coreset index {} is out of range for {} points",
                bad, n
            )));
        }

        let rows = GramianRows::new(problem.kernel, data)?;
        let row_mean = problem.kernel.gramian_row_mean(data, problem.block_size)?;
        let diagonal = rows.diagonal();
        let coreset = data.select(Axis(0), indices);
        let cross = problem.kernel.compute_block(data, coreset.view());
        let cross_sums = cross.sum_axis(Axis(1));

        let mut membership = vec![0; n];
        for &i in indices {
            membership[i] += 1;
        }

        Ok(Self {
            problem: *problem,
            rows,
            row_mean,
            diagonal,
            cross,
            cross_sums,
            membership,
        })
    }

    pub(crate) fn n(&self) -> usize {
        self.row_mean.len()
    }

    /// Whether `candidate` may replace the point at `position`
    pub(crate) fn allowed(&self, indices: &[usize], position: usize, candidate: usize) -> bool {
        !self.problem.unique || indices[position] == candidate || self.membership[candidate] == 0
    }

    /// Change in MMD² from replacing position `position` by `candidate`
    pub(crate) fn delta(&self, indices: &[usize], position: usize, candidate: usize) -> f64 {
        let m = indices.len() as f64;
        let current = indices[position];
        let others_candidate = self.cross_sums[candidate] - self.cross[[candidate, position]];
        let others_current = self.cross_sums[current] - self.cross[[current, position]];

        -2.0 / m * (self.row_mean[candidate] - self.row_mean[current])
            + (2.0 * (others_candidate - others_current) + self.diagonal[candidate]
                - self.diagonal[current])
                / (m * m)
    }

    /// Best allowed candidate for `position` among `candidates`, if it
    /// improves MMD² by more than the threshold
    pub(crate) fn best_candidate<I>(
        &self,
        indices: &[usize],
        position: usize,
        candidates: I,
    ) -> Option<usize>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut best: Option<(usize, f64)> = None;
        for candidate in candidates {
            if !self.allowed(indices, position, candidate) {
                continue;
            }
            let delta = self.delta(indices, position, candidate);
            if best.map_or(true, |(_, b)| delta < b) {
                best = Some((candidate, delta));
            }
        }
        best.filter(|&(_, delta)| delta < -IMPROVEMENT_THRESHOLD)
            .map(|(candidate, _)| candidate)
    }

    /// Replace the point at `position` and update the cached columns
    pub(crate) fn apply(&mut self, indices: &mut [usize], position: usize, candidate: usize) {
        let previous = indices[position];
        let column = self.rows.row(candidate);

        self.cross_sums -= &self.cross.column(position);
        self.cross_sums += &column;
        self.cross.column_mut(position).assign(&column);

        self.membership[previous] -= 1;
        self.membership[candidate] += 1;
        indices[position] = candidate;
    }
}
