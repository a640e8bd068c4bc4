//! Reduction strategies: how a coreset constructor is applied to the data

pub mod map_reduce;
pub mod size_reduce;

pub use self::map_reduce::MapReduce;
pub use self::size_reduce::SizeReduce;

use crate::core::Result;
use crate::coresubset::CoresetMethod;
use ndarray::ArrayView2;
use rand_chacha::ChaCha8Rng;

/// Reduction strategy trait
pub trait ReductionStrategy: Send + Sync {
    /// Requested coreset size, validated by the constructor at reduce time
    fn coreset_size(&self) -> i64;

    /// Indices into `data` of the reduced coreset
    fn reduce(
        &self,
        method: &dyn CoresetMethod,
        data: ArrayView2<'_, f64>,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<usize>>;
}
