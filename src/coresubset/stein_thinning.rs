//! Stein thinning
//!
//! Greedy minimisation of the kernel Stein discrepancy. Step t picks the point
//! minimising ½k_p(x, x) + Σ_{s ∈ S} k_p(x_s, x), optionally minus
//! λ(t + 1) log p̂(x) where p̂ is a Gaussian density estimate over the block.
//! The log-density term steers selection away from low-density regions where
//! the Stein kernel alone would favour near-duplicates of spurious modes.

use crate::core::{Block, CoresetError, Result};
use crate::coresubset::herding::DEFAULT_BLOCK_SIZE;
use crate::coresubset::traits::check_unique_size;
use crate::coresubset::CoresetMethod;
use crate::kernel::gramian::GramianRows;
use crate::kernel::{
    median_heuristic_sampled, DifferentiableKernel, Kernel, SquaredExponentialKernel, SteinKernel,
};
use crate::utils::argmin;
use log::{debug, warn};
use ndarray::{Array1, ArrayView2};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;

/// Rows sampled when estimating the KDE bandwidth
const BANDWIDTH_SAMPLES: usize = 1_000;

/// Stein thinning constructor over a Stein kernel
#[derive(Clone)]
pub struct SteinThinning<B: DifferentiableKernel> {
    kernel: SteinKernel<B>,
    unique: bool,
    regularise: bool,
    kde_bandwidth: Option<f64>,
    block_size: usize,
}

impl<B: DifferentiableKernel> SteinThinning<B> {
    pub fn new(kernel: SteinKernel<B>) -> Self {
        Self {
            kernel,
            unique: true,
            regularise: true,
            kde_bandwidth: None,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Enable or disable the log-density regulariser
    pub fn with_regularise(mut self, regularise: bool) -> Self {
        self.regularise = regularise;
        self
    }

    /// Fix the KDE bandwidth instead of estimating it per block
    pub fn with_kde_bandwidth(mut self, bandwidth: f64) -> Self {
        self.kde_bandwidth = Some(bandwidth);
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn stein_kernel(&self) -> &SteinKernel<B> {
        &self.kernel
    }

    fn bandwidth(&self, points: ArrayView2<'_, f64>, rng: &mut ChaCha8Rng) -> Result<f64> {
        match self.kde_bandwidth {
            Some(h) if h > 0.0 && h.is_finite() => Ok(h),
            Some(h) => Err(CoresetError::InvalidParameter(format!(
                "kde_bandwidth must be positive, got: {}",
                h
            ))),
            None => {
                let h = median_heuristic_sampled(points, BANDWIDTH_SAMPLES, rng);
                if h > 0.0 {
                    Ok(h)
                } else {
                    warn!("Median heuristic is zero, using KDE bandwidth 1.0");
                    Ok(1.0)
                }
            }
        }
    }

    /// log p̂(x_i) under an isotropic Gaussian KDE over the block
    fn log_density(&self, points: ArrayView2<'_, f64>, bandwidth: f64) -> Result<Array1<f64>> {
        // log (2πh²)^(-d/2)
        let log_normaliser = -0.5 * points.ncols() as f64 * (2.0 * PI * bandwidth * bandwidth).ln();
        let kde = SquaredExponentialKernel::with_length_scale(bandwidth);
        let density = kde.gramian_row_mean(points, self.block_size)?;
        Ok(density.mapv(|p| p.max(f64::MIN_POSITIVE).ln() + log_normaliser))
    }
}

impl<B: DifferentiableKernel> CoresetMethod for SteinThinning<B> {
    fn name(&self) -> &'static str {
        "stein_thinning"
    }

    fn validate_coreset_size(&self, coreset_size: i64) -> Result<usize> {
        if coreset_size <= 0 {
            return Err(CoresetError::InvalidCoresetSize(
                "coreset_size must be a positive integer".to_string(),
            ));
        }
        Ok(coreset_size as usize)
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

        let points = block.points.view();
        let rows = GramianRows::new(&self.kernel, points)?;

        let half_diagonal = rows.diagonal() * 0.5;
        let log_density = if self.regularise {
            let bandwidth = self.bandwidth(points, rng)?;
            Some(self.log_density(points, bandwidth)?)
        } else {
            None
        };
        let strength = 1.0 / coreset_size as f64;

        let mut accumulated = Array1::<f64>::zeros(n);
        let mut indices = Vec::with_capacity(coreset_size);
        for step in 0..coreset_size {
            let mut objective = &half_diagonal + &accumulated;
            if let Some(log_density) = &log_density {
                objective.scaled_add(-strength * (step + 1) as f64, log_density);
            }
            if self.unique {
                for &i in &indices {
                    objective[i] = f64::INFINITY;
                }
            }

            let selected = argmin(objective.view()).ok_or_else(|| {
                CoresetError::OptimizationError(format!(
                    "no finite Stein objective at step {}",
                    step
                ))
            })?;
            accumulated += &rows.row(selected);
            indices.push(selected);
        }

        debug!(
            "Stein thinning selected {} of {} points (regularised: {})",
            coreset_size, n, self.regularise
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
