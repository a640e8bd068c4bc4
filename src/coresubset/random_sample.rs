//! Uniform random sampling

use crate::core::{Block, CoresetError, Result};
use crate::coresubset::traits::check_unique_size;
use crate::coresubset::CoresetMethod;
use crate::kernel::Kernel;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::fmt;

/// Uniform sampling of points, with or without replacement
///
/// Needs no kernel to select; one can be attached so the result can be
/// refined against the data afterwards.
pub struct RandomSample {
    unique: bool,
    kernel: Option<Box<dyn Kernel>>,
}

impl RandomSample {
    /// `unique` samples without replacement
    pub fn new(unique: bool) -> Self {
        Self {
            unique,
            kernel: None,
        }
    }

    /// Attach a kernel for refinement
    pub fn with_kernel<K: Kernel + 'static>(mut self, kernel: K) -> Self {
        self.kernel = Some(Box::new(kernel));
        self
    }
}

impl Default for RandomSample {
    fn default() -> Self {
        Self::new(true)
    }
}

impl fmt::Debug for RandomSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomSample")
            .field("unique", &self.unique)
            .field("has_kernel", &self.kernel.is_some())
            .finish()
    }
}

impl CoresetMethod for RandomSample {
    fn name(&self) -> &'static str {
        "random_sample"
    }

    /// Zero is accepted and yields an empty coreset
    fn validate_coreset_size(&self, coreset_size: i64) -> Result<usize> {
        if coreset_size < 0 {
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
        if coreset_size == 0 {
            return Ok(Vec::new());
        }
        if n == 0 {
            return Err(CoresetError::EmptyDataset);
        }
        check_unique_size(self.unique, coreset_size, n)?;

        if self.unique {
            Ok(rand::seq::index::sample(rng, n, coreset_size).into_vec())
        } else {
            Ok((0..coreset_size).map(|_| rng.gen_range(0..n)).collect())
        }
    }

    fn unique(&self) -> bool {
        self.unique
    }

    fn kernel(&self) -> Option<&dyn Kernel> {
        self.kernel.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::SquaredExponentialKernel;
    use ndarray::Array2;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_unique_has_no_repeats() {
        let x = Array2::<f64>::zeros((50, 2));
        let sampler = RandomSample::new(true);
        let mut rng = ChaCha8Rng::seed_from_u64(1_989);

        let indices = sampler.select(&Block::full(x.view()), 50, &mut rng).unwrap();
        let distinct: HashSet<usize> = indices.iter().copied().collect();
        assert_eq!(distinct.len(), 50);
    }

    #[test]
    fn test_with_replacement_repeats() {
        let x = Array2::<f64>::zeros((10, 1));
        let with_replacement = RandomSample::new(false);
        let without_replacement = RandomSample::new(true);

        // Ten draws from ten points repeat with probability 1 - 10!/10^10
        let mut repeated = 0;
        for seed in 0..50 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let indices = with_replacement.select(&Block::full(x.view()), 10, &mut rng).unwrap();
            assert_eq!(indices.len(), 10);
            assert!(indices.iter().all(|&i| i < 10));
            let distinct: HashSet<usize> = indices.iter().copied().collect();
            if distinct.len() < indices.len() {
                repeated += 1;
            }

            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let indices = without_replacement.select(&Block::full(x.view()), 10, &mut rng).unwrap();
            let distinct: HashSet<usize> = indices.iter().copied().collect();
            assert_eq!(distinct.len(), 10);
        }
        assert!(repeated >= 45, "only {} of 50 draws repeated a point", repeated);
    }

    #[test]
    fn test_seed_determinism() {
        let x = Array2::<f64>::zeros((100, 1));
        let sampler = RandomSample::new(true);
        let a = sampler
            .select(&Block::full(x.view()), 10, &mut ChaCha8Rng::seed_from_u64(3))
            .unwrap();
        let b = sampler
            .select(&Block::full(x.view()), 10, &mut ChaCha8Rng::seed_from_u64(3))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_size_validation() {
        let sampler = RandomSample::default();
        assert_eq!(sampler.validate_coreset_size(0).unwrap(), 0);
        let err = sampler.validate_coreset_size(-1).unwrap_err();
        assert_eq!(err.to_string(), "coreset_size must be a positive integer");
    }

    #[test]
    fn test_zero_size_is_empty() {
        let x = Array2::<f64>::zeros((5, 1));
        let indices = RandomSample::new(true)
            .select(&Block::full(x.view()), 0, &mut ChaCha8Rng::seed_from_u64(0))
            .unwrap();
        assert!(indices.is_empty());
    }

    #[test]
    fn test_optional_kernel() {
        assert!(RandomSample::new(false).kernel().is_none());
        let sampler = RandomSample::new(false).with_kernel(SquaredExponentialKernel::default());
        assert!(sampler.kernel().is_some());
    }
}
