//! Serializable pipeline configuration
//!
//! A [`CoresetConfig`] describes a complete run as JSON: kernel, constructor,
//! reduction strategy, seed and the optional refinement and weighting steps.
//!
//! ```json
//! {
//!   "kernel": { "type": "squared-exponential" },
//!   "method": { "type": "kernel-herding" },
//!   "reduction": { "type": "map", "coreset_size": 50, "leaf_size": 2000 },
//!   "random_key": 7,
//!   "refine": { "type": "regular" },
//!   "weights": { "type": "mmd" }
//! }
//! ```
//!
//! Stein thinning is not available here because it needs a score function.

use crate::api::Coresubset;
use crate::core::{ArrayData, CoresetError, Dataset, FittedCoreset, Result, SolverConfig};
use crate::coresubset::{self, CoresetMethod, KernelHerding, RPCholesky, RandomSample};
use crate::kernel::{
    median_heuristic_sampled, Kernel, LaplacianKernel, LinearKernel, PCIMQKernel,
    SquaredExponentialKernel,
};
use crate::reduction::{MapReduce, ReductionStrategy, SizeReduce};
use crate::refine::{Refine, RefineRandom, RefineRegular, RefineReverse};
use crate::weights::{MMDWeights, SBQWeights, WeightsOptimiser};
use log::{info, warn};
use ndarray::ArrayView2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Rows sampled when estimating a length scale by the median heuristic
const HEURISTIC_SAMPLES: usize = 1_000;

fn default_true() -> bool {
    true
}

fn default_scale() -> f64 {
    1.0
}

fn default_block_size() -> usize {
    coresubset::herding::DEFAULT_BLOCK_SIZE
}

fn default_passes() -> usize {
    1
}

fn default_proportion() -> f64 {
    0.5
}

fn default_regularisation() -> f64 {
    SolverConfig::default().regularisation
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CoresetError::InvalidParameter(format!(
            "{} must be positive and finite, got {}",
            name, value
        )))
    }
}

fn check_nonzero(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(CoresetError::InvalidParameter(format!(
            "{} must be a positive integer",
            name
        )));
    }
    Ok(())
}

/// Kernel choice; a missing length scale is estimated from the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum KernelConfig {
    SquaredExponential {
        #[serde(default)]
        length_scale: Option<f64>,
        #[serde(default = "default_scale")]
        output_scale: f64,
    },
    Laplacian {
        #[serde(default)]
        length_scale: Option<f64>,
        #[serde(default = "default_scale")]
        output_scale: f64,
    },
    Pcimq {
        #[serde(default)]
        length_scale: Option<f64>,
        #[serde(default = "default_scale")]
        output_scale: f64,
    },
    Linear {
        #[serde(default = "default_scale")]
        output_scale: f64,
        #[serde(default)]
        constant: f64,
    },
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig::SquaredExponential {
            length_scale: None,
            output_scale: 1.0,
        }
    }
}

impl KernelConfig {
    fn validate(&self) -> Result<()> {
        match self {
            KernelConfig::SquaredExponential {
                length_scale,
                output_scale,
            }
            | KernelConfig::Laplacian {
                length_scale,
                output_scale,
            }
            | KernelConfig::Pcimq {
                length_scale,
                output_scale,
            } => {
                if let Some(length_scale) = length_scale {
                    check_positive("length_scale", *length_scale)?;
                }
                check_positive("output_scale", *output_scale)
            }
            KernelConfig::Linear {
                output_scale,
                constant,
            } => {
                check_positive("output_scale", *output_scale)?;
                if !constant.is_finite() {
                    return Err(CoresetError::InvalidParameter(
                        "constant must be finite".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Length scale to build the kernel with; `None` for the linear kernel
    fn resolve_length_scale(&self, data: ArrayView2<'_, f64>, random_key: u64) -> Option<f64> {
        let configured = match self {
            KernelConfig::SquaredExponential { length_scale, .. }
            | KernelConfig::Laplacian { length_scale, .. }
            | KernelConfig::Pcimq { length_scale, .. } => *length_scale,
            KernelConfig::Linear { .. } => return None,
        };
        configured.or_else(|| {
            let mut rng = ChaCha8Rng::seed_from_u64(random_key);
            rng.set_stream(2);
            let estimate = median_heuristic_sampled(data, HEURISTIC_SAMPLES, &mut rng);
            if estimate > 0.0 {
                info!("Median heuristic length scale: {:.6}", estimate);
                Some(estimate)
            } else {
                warn!("Median heuristic is zero, using length scale 1.0");
                Some(1.0)
            }
        })
    }

    fn build(&self, length_scale: Option<f64>) -> Box<dyn Kernel> {
        let length_scale = length_scale.unwrap_or(1.0);
        match *self {
            KernelConfig::SquaredExponential { output_scale, .. } => {
                Box::new(SquaredExponentialKernel::new(length_scale, output_scale))
            }
            KernelConfig::Laplacian { output_scale, .. } => {
                Box::new(LaplacianKernel::new(length_scale, output_scale))
            }
            KernelConfig::Pcimq { output_scale, .. } => {
                Box::new(PCIMQKernel::new(length_scale, output_scale))
            }
            KernelConfig::Linear {
                output_scale,
                constant,
            } => Box::new(LinearKernel::new(output_scale, constant)),
        }
    }
}

/// Coreset constructor choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MethodConfig {
    KernelHerding {
        #[serde(default = "default_true")]
        unique: bool,
        #[serde(default = "default_block_size")]
        block_size: usize,
    },
    RandomSample {
        #[serde(default = "default_true")]
        unique: bool,
    },
    RpCholesky {
        #[serde(default = "default_true")]
        unique: bool,
    },
}

impl MethodConfig {
    fn validate(&self) -> Result<()> {
        match self {
            MethodConfig::KernelHerding { block_size, .. } => check_nonzero("block_size", *block_size),
            MethodConfig::RandomSample { .. } | MethodConfig::RpCholesky { .. } => Ok(()),
        }
    }

    fn build(&self, kernel: Box<dyn Kernel>) -> Box<dyn CoresetMethod> {
        match *self {
            MethodConfig::KernelHerding { unique, block_size } => Box::new(
                KernelHerding::new(kernel)
                    .with_unique(unique)
                    .with_block_size(block_size),
            ),
            MethodConfig::RandomSample { unique } => {
                Box::new(RandomSample::new(unique).with_kernel(kernel))
            }
            MethodConfig::RpCholesky { unique } => {
                Box::new(RPCholesky::new(kernel).with_unique(unique))
            }
        }
    }
}

/// Reduction strategy choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReductionConfig {
    Size {
        coreset_size: i64,
    },
    Map {
        coreset_size: i64,
        leaf_size: usize,
        #[serde(default = "default_true")]
        shuffle: bool,
    },
}

impl ReductionConfig {
    fn validate(&self) -> Result<()> {
        match self {
            ReductionConfig::Size { .. } => Ok(()),
            ReductionConfig::Map { leaf_size, .. } => check_nonzero("leaf_size", *leaf_size),
        }
    }

    fn build(&self) -> Box<dyn ReductionStrategy> {
        match *self {
            ReductionConfig::Size { coreset_size } => Box::new(SizeReduce::new(coreset_size)),
            ReductionConfig::Map {
                coreset_size,
                leaf_size,
                shuffle,
            } => Box::new(MapReduce::new(coreset_size, leaf_size).with_shuffle(shuffle)),
        }
    }
}

/// Refinement strategy choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RefineConfig {
    Regular {
        #[serde(default = "default_passes")]
        max_passes: usize,
    },
    Random {
        #[serde(default = "default_proportion")]
        proportion: f64,
        #[serde(default = "default_passes")]
        max_passes: usize,
    },
    Reverse {
        #[serde(default = "default_passes")]
        max_passes: usize,
    },
}

impl RefineConfig {
    fn validate(&self) -> Result<()> {
        match self {
            RefineConfig::Regular { max_passes } | RefineConfig::Reverse { max_passes } => {
                check_nonzero("max_passes", *max_passes)
            }
            RefineConfig::Random {
                proportion,
                max_passes,
            } => {
                if !(*proportion > 0.0 && *proportion <= 1.0) {
                    return Err(CoresetError::InvalidParameter(format!(
                        "proportion must be in (0, 1], got {}",
                        proportion
                    )));
                }
                check_nonzero("max_passes", *max_passes)
            }
        }
    }

    fn build(&self) -> Box<dyn Refine> {
        match *self {
            RefineConfig::Regular { max_passes } => {
                Box::new(RefineRegular::new().with_max_passes(max_passes))
            }
            RefineConfig::Random {
                proportion,
                max_passes,
            } => Box::new(RefineRandom::new(proportion).with_max_passes(max_passes)),
            RefineConfig::Reverse { max_passes } => {
                Box::new(RefineReverse::new().with_max_passes(max_passes))
            }
        }
    }
}

/// Weights optimiser choice
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WeightsConfig {
    Mmd {
        #[serde(default)]
        solver: SolverConfig,
    },
    Sbq {
        #[serde(default = "default_regularisation")]
        regularisation: f64,
    },
}

impl WeightsConfig {
    fn validate(&self) -> Result<()> {
        let regularisation = match self {
            WeightsConfig::Mmd { solver } => {
                check_positive("epsilon", solver.epsilon)?;
                solver.regularisation
            }
            WeightsConfig::Sbq { regularisation } => *regularisation,
        };
        if !(regularisation.is_finite() && regularisation >= 0.0) {
            return Err(CoresetError::InvalidParameter(format!(
                "regularisation must be non-negative and finite, got {}",
                regularisation
            )));
        }
        Ok(())
    }

    fn build(&self, kernel: Box<dyn Kernel>) -> Box<dyn WeightsOptimiser> {
        match self {
            WeightsConfig::Mmd { solver } => Box::new(MMDWeights::with_config(kernel, solver.clone())),
            WeightsConfig::Sbq { regularisation } => {
                Box::new(SBQWeights::new(kernel).with_regularisation(*regularisation))
            }
        }
    }
}

/// Complete coreset pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoresetConfig {
    #[serde(default)]
    pub kernel: KernelConfig,
    pub method: MethodConfig,
    pub reduction: ReductionConfig,
    #[serde(default)]
    pub random_key: u64,
    #[serde(default)]
    pub refine: Option<RefineConfig>,
    #[serde(default)]
    pub weights: Option<WeightsConfig>,
}

impl CoresetConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Check every parameter that can be checked without data
    ///
    /// Coreset sizes are left to the constructor, which owns their messages.
    pub fn validate(&self) -> Result<()> {
        self.kernel.validate()?;
        self.method.validate()?;
        self.reduction.validate()?;
        if let Some(refine) = &self.refine {
            refine.validate()?;
        }
        if let Some(weights) = &self.weights {
            weights.validate()?;
        }
        Ok(())
    }

    /// Run the configured pipeline: fit, then refine and solve weights when
    /// configured
    pub fn run(&self, data: &ArrayData) -> Result<FittedCoreset> {
        self.validate()?;

        let length_scale = self
            .kernel
            .resolve_length_scale(data.pre_coreset_array(), self.random_key);
        let mut solver = Coresubset::new(self.method.build(self.kernel.build(length_scale)), self.random_key);
        if let Some(refine) = &self.refine {
            solver = solver.with_refine_method(refine.build());
        }
        if let Some(weights) = &self.weights {
            solver = solver.with_weights_optimiser(weights.build(self.kernel.build(length_scale)));
        }

        let strategy = self.reduction.build();
        solver.fit(data, strategy.as_ref())?;
        if self.refine.is_some() {
            solver.refine()?;
        }
        if self.weights.is_some() {
            solver.solve_weights()?;
        }
        Ok(solver.coreset()?.clone())
    }
}
