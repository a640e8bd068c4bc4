//! Divide-and-conquer reduction for datasets too large for one Gramian
//!
//! Each round shuffles the surviving candidates, splits them into partitions
//! of exactly `leaf_size` points with a shorter remainder last, reduces every partition
//! independently and concatenates the results in partition order. Rounds
//! repeat until the candidates fit in one leaf, which is then reduced to the
//! requested size.

use crate::core::{Block, CoresetError, Result};
use crate::coresubset::CoresetMethod;
use crate::reduction::ReductionStrategy;
use crate::utils::partition::leaf_ranges;
use log::{debug, warn};
use ndarray::{ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Partition-and-merge reduction
#[derive(Debug, Clone, Copy)]
pub struct MapReduce {
    coreset_size: i64,
    leaf_size: usize,
    shuffle: bool,
}

impl MapReduce {
    pub fn new(coreset_size: i64, leaf_size: usize) -> Self {
        Self {
            coreset_size,
            leaf_size,
            shuffle: true,
        }
    }

    /// Partition candidates in their current order instead of a seeded
    /// random permutation
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Leaf size actually used
    ///
    /// A full leaf must hold more than `coreset_size` points for a round to
    /// shrink the candidates. A leaf of at most `coreset_size` is raised to
    /// `2 * coreset_size`, so partitions may then exceed the requested leaf.
    fn effective_leaf_size(&self, coreset_size: usize) -> usize {
        if self.leaf_size <= coreset_size {
            let raised = coreset_size.saturating_mul(2).max(1);
            warn!(
                "leaf_size {} does not exceed the coreset size {}; using {}",
                self.leaf_size, coreset_size, raised
            );
            raised
        } else {
            self.leaf_size
        }
    }

    /// One round: reduce each partition of `candidates` in parallel
    fn reduce_round(
        &self,
        method: &dyn CoresetMethod,
        data: ArrayView2<'_, f64>,
        mut candidates: Vec<usize>,
        coreset_size: usize,
        leaf_size: usize,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<usize>> {
        if self.shuffle {
            candidates.shuffle(rng);
        }
        let ranges = leaf_ranges(candidates.len(), leaf_size);

        // Seeds are drawn up front, in partition order, so the result does not
        // depend on how rayon schedules the partitions
        let seeds: Vec<u64> = ranges.iter().map(|_| rng.next_u64()).collect();

        let partial: Vec<Vec<usize>> = ranges
            .par_iter()
            .zip(seeds.par_iter())
            .map(|(range, &seed)| -> Result<Vec<usize>> {
                let members = &candidates[range.clone()];
                let points = data.select(Axis(0), members);
                let mut local_rng = ChaCha8Rng::seed_from_u64(seed);
                let local_size = coreset_size.min(members.len());
                let selected =
                    method.select(&Block::partition(points.view()), local_size, &mut local_rng)?;
                Ok(selected.into_iter().map(|i| members[i]).collect())
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Map-reduce round: {} candidates in {} partitions -> {}",
            candidates.len(),
            ranges.len(),
            partial.iter().map(Vec::len).sum::<usize>()
        );
        Ok(partial.concat())
    }
}

impl ReductionStrategy for MapReduce {
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
        if self.leaf_size == 0 {
            return Err(CoresetError::InvalidParameter(
                "leaf_size must be a positive integer".to_string(),
            ));
        }

        let n = data.nrows();
        let leaf_size = self.effective_leaf_size(coreset_size);
        if leaf_size >= n {
            // Same call, same RNG state as a size reduction
            return method.select(&Block::full(data), coreset_size, rng);
        }

        let mut candidates: Vec<usize> = (0..n).collect();
        let mut rounds = 0;
        while candidates.len() > leaf_size {
            candidates =
                self.reduce_round(method, data, candidates, coreset_size, leaf_size, rng)?;
            rounds += 1;
        }

        let points = data.select(Axis(0), &candidates);
        let selected = method.select(&Block::partition(points.view()), coreset_size, rng)?;
        debug!(
            "Map-reduce finished after {} rounds and a final reduction of {} candidates",
            rounds,
            candidates.len()
        );
        Ok(selected.into_iter().map(|i| candidates[i]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coresubset::{KernelHerding, RandomSample};
    use crate::kernel::{tests::random_points, SquaredExponentialKernel};
    use crate::kernel::Kernel;
    use crate::reduction::SizeReduce;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Herding that remembers the length of every block it was given
    struct RecordingHerding {
        inner: KernelHerding<SquaredExponentialKernel>,
        block_lens: Mutex<Vec<usize>>,
    }

    impl RecordingHerding {
        fn new() -> Self {
            Self {
                inner: herding(),
                block_lens: Mutex::new(Vec::new()),
            }
        }

        fn largest_block(&self) -> usize {
            self.block_lens.lock().unwrap().iter().copied().max().unwrap_or(0)
        }
    }

    impl CoresetMethod for RecordingHerding {
        fn name(&self) -> &'static str {
            "recording herding"
        }

        fn validate_coreset_size(&self, coreset_size: i64) -> Result<usize> {
            self.inner.validate_coreset_size(coreset_size)
        }

        fn select(
            &self,
            block: &Block<'_>,
            coreset_size: usize,
            rng: &mut ChaCha8Rng,
        ) -> Result<Vec<usize>> {
            self.block_lens.lock().unwrap().push(block.len());
            self.inner.select(block, coreset_size, rng)
        }

        fn unique(&self) -> bool {
            self.inner.unique()
        }

        fn kernel(&self) -> Option<&dyn Kernel> {
            self.inner.kernel()
        }
    }

    fn herding() -> KernelHerding<SquaredExponentialKernel> {
        KernelHerding::new(SquaredExponentialKernel::new(0.3, 1.0))
    }

    #[test]
    fn test_large_leaf_matches_size_reduce() {
        let x = random_points(50, 2, 3);
        for leaf_size in [50, 80] {
            let mapped = MapReduce::new(7, leaf_size)
                .reduce(&herding(), x.view(), &mut ChaCha8Rng::seed_from_u64(9))
                .unwrap();
            let direct = SizeReduce::new(7)
                .reduce(&herding(), x.view(), &mut ChaCha8Rng::seed_from_u64(9))
                .unwrap();
            assert_eq!(mapped, direct);
        }

        // Randomised constructors see the same RNG state too
        let sampler = RandomSample::new(false);
        let mapped = MapReduce::new(7, 100)
            .reduce(&sampler, x.view(), &mut ChaCha8Rng::seed_from_u64(1))
            .unwrap();
        let direct = SizeReduce::new(7)
            .reduce(&sampler, x.view(), &mut ChaCha8Rng::seed_from_u64(1))
            .unwrap();
        assert_eq!(mapped, direct);
    }

    #[test]
    fn test_multiple_rounds() {
        let x = random_points(500, 2, 10);
        let indices = MapReduce::new(10, 40)
            .reduce(&herding(), x.view(), &mut ChaCha8Rng::seed_from_u64(0))
            .unwrap();

        assert_eq!(indices.len(), 10);
        assert!(indices.iter().all(|&i| i < 500));
        let distinct: HashSet<usize> = indices.iter().copied().collect();
        assert_eq!(distinct.len(), 10);
    }

    #[test]
    fn test_partitions_respect_leaf_between_size_and_twice_size() {
        let x = random_points(100, 2, 12);
        let method = RecordingHerding::new();
        let indices = MapReduce::new(8, 10)
            .reduce(&method, x.view(), &mut ChaCha8Rng::seed_from_u64(3))
            .unwrap();

        assert_eq!(indices.len(), 8);
        assert!(method.largest_block() <= 10);
        let distinct: HashSet<usize> = indices.iter().copied().collect();
        assert_eq!(distinct.len(), 8);
    }

    #[test]
    fn test_small_leaf_still_terminates() {
        let x = random_points(120, 2, 2);
        let indices = MapReduce::new(8, 3)
            .reduce(&herding(), x.view(), &mut ChaCha8Rng::seed_from_u64(4))
            .unwrap();
        assert_eq!(indices.len(), 8);
    }

    #[test]
    fn test_seed_determinism() {
        let x = random_points(300, 2, 5);
        let strategy = MapReduce::new(5, 30);
        let a = strategy
            .reduce(&herding(), x.view(), &mut ChaCha8Rng::seed_from_u64(77))
            .unwrap();
        let b = strategy
            .reduce(&herding(), x.view(), &mut ChaCha8Rng::seed_from_u64(77))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_without_shuffle() {
        let x = random_points(200, 2, 6);
        let indices = MapReduce::new(4, 25)
            .with_shuffle(false)
            .reduce(&herding(), x.view(), &mut ChaCha8Rng::seed_from_u64(0))
            .unwrap();
        assert_eq!(indices.len(), 4);
    }

    #[test]
    fn test_zero_leaf_size() {
        let x = random_points(20, 2, 0);
        let result = MapReduce::new(4, 0).reduce(&herding(), x.view(), &mut ChaCha8Rng::seed_from_u64(0));
        assert!(matches!(result, Err(CoresetError::InvalidParameter(_))));
    }

    #[test]
    fn test_invalid_size_reported_before_leaf() {
        let x = random_points(20, 2, 0);
        let result = MapReduce::new(0, 0).reduce(&herding(), x.view(), &mut ChaCha8Rng::seed_from_u64(0));
        assert!(matches!(result, Err(CoresetError::InvalidCoresetSize(_))));
    }
}
