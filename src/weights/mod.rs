//! Weights optimisers for fitted coresets
//!
//! Both optimisers match the kernel mean embedding of the weighted coreset Y
//! to that of the uniformly weighted data X. With K = k(Y, Y) + εI and
//! z_i = mean_j k(y_i, x_j), MMD² as a function of the weights is
//! wᵀKw − 2wᵀz up to a constant.

use crate::core::{CoresetError, Result, SolverConfig};
use crate::kernel::gramian::cross_row_mean;
use crate::kernel::Kernel;
use crate::solver::{cholesky_solve, SimplexQpSolver};
use log::debug;
use ndarray::{Array1, Array2, ArrayView2};

/// Default tile size for the data/coreset kernel means
pub const DEFAULT_BLOCK_SIZE: usize = 10_000;

/// Weights optimiser trait
pub trait WeightsOptimiser: Send + Sync {
    /// Weights for the coreset `y` approximating the data `x`
    fn solve(&self, x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Result<Array1<f64>>;
}

impl<W: WeightsOptimiser + ?Sized> WeightsOptimiser for Box<W> {
    fn solve(&self, x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        (**self).solve(x, y)
    }
}

/// Regularised coreset Gramian and data/coreset kernel means
fn kernel_system<K: Kernel + ?Sized>(
    kernel: &K,
    x: ArrayView2<'_, f64>,
    y: ArrayView2<'_, f64>,
    regularisation: f64,
    block_size: usize,
) -> Result<(Array2<f64>, Array1<f64>)> {
    if x.nrows() == 0 || y.nrows() == 0 {
        return Err(CoresetError::EmptyDataset);
    }
    if x.ncols() != y.ncols() {
        return Err(CoresetError::DimensionMismatch {
            expected: x.ncols(),
            actual: y.ncols(),
        });
    }

    // Validates both point sets before any direct evaluation
    let kernel_means = cross_row_mean(kernel, y, x, block_size)?;
    let mut gramian = kernel.compute_block(y, y);
    gramian.diag_mut().mapv_inplace(|v| v + regularisation);
    Ok((gramian, kernel_means))
}

/// Simplex-constrained MMD weights: non-negative and summing to one
#[derive(Debug, Clone)]
pub struct MMDWeights<K: Kernel> {
    kernel: K,
    config: SolverConfig,
    block_size: usize,
}

impl<K: Kernel> MMDWeights<K> {
    pub fn new(kernel: K) -> Self {
        Self::with_config(kernel, SolverConfig::default())
    }

    pub fn with_config(kernel: K, config: SolverConfig) -> Self {
        Self {
            kernel,
            config,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }
}

impl<K: Kernel> WeightsOptimiser for MMDWeights<K> {
    fn solve(&self, x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let (gramian, kernel_means) = kernel_system(
            &self.kernel,
            x,
            y,
            self.config.regularisation,
            self.block_size,
        )?;
        let solution = SimplexQpSolver::new(self.config.clone())
            .solve(gramian.view(), kernel_means.view())?;
        debug!(
            "MMD weights solved for {} points in {} iterations (converged: {})",
            y.nrows(),
            solution.iterations,
            solution.converged
        );
        Ok(solution.weights)
    }
}

/// Sequential Bayesian quadrature weights: unconstrained, may be negative
#[derive(Debug, Clone)]
pub struct SBQWeights<K: Kernel> {
    kernel: K,
    regularisation: f64,
    block_size: usize,
}

impl<K: Kernel> SBQWeights<K> {
    pub fn new(kernel: K) -> Self {
        Self {
            kernel,
            regularisation: SolverConfig::default().regularisation,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    /// Diagonal jitter added to the coreset Gramian before factorising
    pub fn with_regularisation(mut self, regularisation: f64) -> Self {
        self.regularisation = regularisation;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }
}

impl<K: Kernel> WeightsOptimiser for SBQWeights<K> {
    fn solve(&self, x: ArrayView2<'_, f64>, y: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        let (gramian, kernel_means) =
            kernel_system(&self.kernel, x, y, self.regularisation, self.block_size)?;
        cholesky_solve(gramian.view(), kernel_means.view())
    }
}
