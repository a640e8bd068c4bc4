//! Kernel-based coreset construction
//!
//! Selects a small subset of a dataset whose kernel mean embedding stays close
//! to that of the full data, measured by the maximum mean discrepancy.
//! Constructors (kernel herding, random sampling, randomly pivoted Cholesky,
//! Stein thinning) run once over the data or inside a map-reduce scheme for
//! large inputs, and fitted coresets can be refined and weighted afterwards.
//!
//! ```rust
//! use ndarray::Array2;
//! use rcoreset::{KernelHerding, SquaredExponentialKernel};
//! use rcoreset::core::{Block, ArrayData};
//! use rcoreset::coresubset::CoresetMethod;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let points = Array2::from_shape_fn((100, 2), |(i, j)| ((3 * i + j) % 17) as f64);
//! let herding = KernelHerding::new(SquaredExponentialKernel::new(2.0, 1.0));
//! let mut rng = ChaCha8Rng::seed_from_u64(0);
//! let indices = herding.select(&Block::full(points.view()), 5, &mut rng).unwrap();
//! assert_eq!(indices.len(), 5);
//! ```

pub mod api;
pub mod config;
pub mod core;
pub mod coresubset;
pub mod kernel;
pub mod metrics;
pub mod reduction;
pub mod refine;
pub mod solver;
pub mod utils;
pub mod weights;

// Re-export main types for convenience
pub use crate::api::Coresubset;
pub use crate::config::CoresetConfig;
pub use crate::core::error::{CoresetError, Result};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::coresubset::{CoresetMethod, KernelHerding, RPCholesky, RandomSample, SteinThinning};
pub use crate::kernel::{
    DifferentiableKernel, Kernel, LaplacianKernel, LinearKernel, PCIMQKernel,
    SquaredExponentialKernel, SteinKernel,
};
pub use crate::metrics::{Metric, MMD};
pub use crate::reduction::{MapReduce, ReductionStrategy, SizeReduce};
pub use crate::refine::{Refine, RefineRandom, RefineRegular, RefineReverse};
pub use crate::weights::{MMDWeights, SBQWeights, WeightsOptimiser};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
