//! High-level API for coreset construction
//!
//! [`Coresubset`] ties a coreset constructor to the optional refinement and
//! weighting collaborators and keeps the fitted result.
//!
//! # Quick Start
//!
//! ```rust
//! use ndarray::Array2;
//! use rcoreset::api::Coresubset;
//! use rcoreset::core::ArrayData;
//! use rcoreset::coresubset::KernelHerding;
//! use rcoreset::kernel::SquaredExponentialKernel;
//! use rcoreset::metrics::MMD;
//! use rcoreset::reduction::SizeReduce;
//! use rcoreset::refine::RefineRegular;
//! use rcoreset::weights::MMDWeights;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let points = Array2::from_shape_fn((200, 2), |(i, j)| ((i * 7 + j * 13) % 29) as f64 / 29.0);
//! let data = ArrayData::load(points)?;
//! let kernel = SquaredExponentialKernel::new(0.5, 1.0);
//!
//! let mut solver = Coresubset::new(KernelHerding::new(kernel), 0)
//!     .with_refine_method(RefineRegular::new())
//!     .with_weights_optimiser(MMDWeights::new(kernel));
//!
//! solver.fit(&data, &SizeReduce::new(10))?;
//! solver.refine()?;
//! let weights = solver.solve_weights()?;
//! let mmd = solver.compute_metric(&MMD::new(kernel))?;
//!
//! assert_eq!(weights.len(), 10);
//! assert!(mmd >= 0.0);
//! # Ok(())
//! # }
//! ```

use crate::core::{CoresetError, Dataset, FittedCoreset, RefineOutcome, Result};
use crate::coresubset::CoresetMethod;
use crate::metrics::Metric;
use crate::reduction::ReductionStrategy;
use crate::refine::{Refine, RefineProblem};
use crate::weights::WeightsOptimiser;
use log::info;
use ndarray::{Array1, ArrayView1};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Coreset solver with builder-style collaborators
///
/// The dataset passed to [`fit`](Self::fit) is borrowed for as long as the
/// solver keeps the fitted coreset, since refinement and weighting read it
/// again.
pub struct Coresubset<'d, M: CoresetMethod> {
    method: M,
    random_key: u64,
    refine_method: Option<Box<dyn Refine>>,
    weights_optimiser: Option<Box<dyn WeightsOptimiser>>,
    data: Option<&'d dyn Dataset>,
    coreset: Option<FittedCoreset>,
}

impl<'d, M: CoresetMethod> Coresubset<'d, M> {
    /// Create a solver; every random draw derives from `random_key`
    pub fn new(method: M, random_key: u64) -> Self {
        Self {
            method,
            random_key,
            refine_method: None,
            weights_optimiser: None,
            data: None,
            coreset: None,
        }
    }

    /// Set the strategy used by [`refine`](Self::refine)
    pub fn with_refine_method<R: Refine + 'static>(mut self, refine_method: R) -> Self {
        self.refine_method = Some(Box::new(refine_method));
        self
    }

    /// Set the optimiser used by [`solve_weights`](Self::solve_weights)
    pub fn with_weights_optimiser<W: WeightsOptimiser + 'static>(mut self, optimiser: W) -> Self {
        self.weights_optimiser = Some(Box::new(optimiser));
        self
    }

    pub fn method(&self) -> &M {
        &self.method
    }

    pub fn random_key(&self) -> u64 {
        self.random_key
    }

    pub fn is_fitted(&self) -> bool {
        self.coreset.is_some()
    }

    /// Reduce `data` with `strategy` and keep the resulting coreset
    ///
    /// Any previous coreset and weights are discarded.
    pub fn fit(
        &mut self,
        data: &'d dyn Dataset,
        strategy: &dyn ReductionStrategy,
    ) -> Result<&FittedCoreset> {
        if data.is_empty() {
            return Err(CoresetError::EmptyDataset);
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_key);
        let indices = strategy.reduce(&self.method, data.pre_coreset_array(), &mut rng)?;
        info!(
            "Fitted {} coreset of {} points from {} points",
            self.method.name(),
            indices.len(),
            data.len()
        );

        self.data = Some(data);
        Ok(&*self
            .coreset
            .insert(FittedCoreset::from_indices(data, Array1::from(indices))))
    }

    /// The fitted coreset
    pub fn coreset(&self) -> Result<&FittedCoreset> {
        self.coreset.as_ref().ok_or(CoresetError::NotFitted)
    }

    /// Indices of the fitted coreset in the original data
    pub fn coreset_indices(&self) -> Result<ArrayView1<'_, usize>> {
        Ok(self.coreset()?.indices())
    }

    /// Weights from the last [`solve_weights`](Self::solve_weights), if still valid
    pub fn weights(&self) -> Option<ArrayView1<'_, f64>> {
        self.coreset.as_ref().and_then(|c| c.weights())
    }

    /// Solve and store weights for the fitted coreset
    pub fn solve_weights(&mut self) -> Result<Array1<f64>> {
        let optimiser = self
            .weights_optimiser
            .as_ref()
            .ok_or_else(|| CoresetError::missing("weights optimiser", "solve_weights"))?;
        let data = self.data.ok_or(CoresetError::NotFitted)?;
        let coreset = self.coreset.as_mut().ok_or(CoresetError::NotFitted)?;

        let weights = optimiser.solve(data.pre_coreset_array(), coreset.points())?;
        coreset.set_weights(weights.clone());
        Ok(weights)
    }

    /// Refine the fitted coreset in place
    ///
    /// The coreset points are rematerialised from the new indices and any
    /// solved weights are discarded.
    pub fn refine(&mut self) -> Result<RefineOutcome> {
        let refine_method = self
            .refine_method
            .as_ref()
            .ok_or_else(|| CoresetError::missing("refine strategy", "refine"))?;
        let kernel = self
            .method
            .kernel()
            .ok_or_else(|| CoresetError::missing("kernel", "refine"))?;
        let data = self.data.ok_or(CoresetError::NotFitted)?;
        let coreset = self.coreset.as_mut().ok_or(CoresetError::NotFitted)?;

        // Separate stream so refinement draws never overlap the fit's
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_key);
        rng.set_stream(1);

        let problem =
            RefineProblem::new(kernel, data.pre_coreset_array()).with_unique(self.method.unique());
        let mut indices = coreset.indices().to_vec();
        let outcome = refine_method.refine(&problem, &mut indices, &mut rng)?;
        coreset.replace_indices(data, Array1::from(indices));
        Ok(outcome)
    }

    /// Evaluate `metric` between the data and the fitted coreset, using the
    /// dataset's supplementary weights and any solved coreset weights
    pub fn compute_metric(&self, metric: &dyn Metric) -> Result<f64> {
        let data = self.data.ok_or(CoresetError::NotFitted)?;
        let coreset = self.coreset()?;
        metric.evaluate(
            data.pre_coreset_array(),
            coreset.points(),
            data.weights(),
            coreset.weights(),
        )
    }
}
