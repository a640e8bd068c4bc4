//! Single-shot reduction over the whole dataset

use crate::core::{Block, Result};
use crate::coresubset::CoresetMethod;
use crate::reduction::ReductionStrategy;
use ndarray::ArrayView2;
use rand_chacha::ChaCha8Rng;

/// Apply the constructor once to the full dataset
///
/// Suitable when the constructor's working memory for n points fits.
#[derive(Debug, Clone, Copy)]
pub struct SizeReduce {
    coreset_size: i64,
}

impl SizeReduce {
    pub fn new(coreset_size: i64) -> Self {
        Self { coreset_size }
    }
}

impl ReductionStrategy for SizeReduce {
    fn coreset_size(&self) -> i64 {
        self.coreset_size
    }

    fn reduce(
        &self,
        method: &dyn CoresetMethod,
        data: ArrayView2<'_, f64>,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<usize>> {
        let coreset_size = method.validate_coreset_size(self.coreset_size)?;
        method.select(&Block::full(data), coreset_size, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CoresetError;
    use crate::coresubset::{KernelHerding, RPCholesky, RandomSample};
    use crate::kernel::{tests::random_points, SquaredExponentialKernel};
    use rand::SeedableRng;

    #[test]
    fn test_size_reduce_returns_requested_size() {
        let x = random_points(30, 2, 0);
        let method = KernelHerding::new(SquaredExponentialKernel::default());
        let indices = SizeReduce::new(6)
            .reduce(&method, x.view(), &mut ChaCha8Rng::seed_from_u64(0))
            .unwrap();
        assert_eq!(indices.len(), 6);
    }

    #[test]
    fn test_size_validation_is_per_constructor() {
        let x = random_points(10, 2, 0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let herding = KernelHerding::new(SquaredExponentialKernel::default());
        match SizeReduce::new(-1).reduce(&herding, x.view(), &mut rng) {
            Err(CoresetError::InvalidCoresetSize(msg)) => {
                assert_eq!(msg, "coreset_size must be a positive integer")
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let cholesky = RPCholesky::new(SquaredExponentialKernel::default());
        match SizeReduce::new(-1).reduce(&cholesky, x.view(), &mut rng) {
            Err(CoresetError::InvalidCoresetSize(msg)) => {
                assert_eq!(msg, "coreset_size must not be negative")
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let sampler = RandomSample::new(true);
        let empty = SizeReduce::new(0).reduce(&sampler, x.view(), &mut rng).unwrap();
        assert!(empty.is_empty());
    }
}
