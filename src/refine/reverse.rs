//! Reverse refinement: every data point looks for the coreset slot it would
//! improve most

use crate::core::{RefineOutcome, Result};
use crate::refine::{run_passes, Refine, RefineProblem, SwapState, IMPROVEMENT_THRESHOLD};
use rand_chacha::ChaCha8Rng;

/// Walk the data in index order; each point replaces the coreset position
/// whose swap lowers MMD² the most, if that decrease is strict
#[derive(Debug, Clone, Copy)]
pub struct RefineReverse {
    max_passes: usize,
}

impl RefineReverse {
    pub fn new() -> Self {
        Self { max_passes: 1 }
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }
}

impl Default for RefineReverse {
    fn default() -> Self {
        Self::new()
    }
}

impl Refine for RefineReverse {
    fn refine(
        &self,
        problem: &RefineProblem<'_>,
        indices: &mut [usize],
        _rng: &mut ChaCha8Rng,
    ) -> Result<RefineOutcome> {
        let mut state = SwapState::new(problem, indices)?;
        run_passes(self.max_passes, || {
            let mut swaps = 0;
            for candidate in 0..state.n() {
                let mut best: Option<(usize, f64)> = None;
                for position in 0..indices.len() {
                    if !state.allowed(indices, position, candidate) {
                        continue;
                    }
                    let delta = state.delta(indices, position, candidate);
                    if best.map_or(true, |(_, b)| delta < b) {
                        best = Some((position, delta));
                    }
                }
                if let Some((position, delta)) = best {
                    if delta < -IMPROVEMENT_THRESHOLD {
                        state.apply(indices, position, candidate);
                        swaps += 1;
                    }
                }
            }
            Ok(swaps)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{tests::random_points, SquaredExponentialKernel};
    use crate::refine::tests::coreset_mmd;
    use rand::SeedableRng;

    #[test]
    fn test_refine_reverse_never_increases_mmd() {
        let data = random_points(45, 2, 8);
        let kernel = SquaredExponentialKernel::new(0.3, 1.0);
        let mut indices = vec![40, 41, 42, 43, 44];
        let before = coreset_mmd(kernel, &data, &indices);

        let problem = RefineProblem::new(&kernel, data.view());
        let outcome = RefineReverse::new()
            .with_max_passes(4)
            .refine(&problem, &mut indices, &mut ChaCha8Rng::seed_from_u64(0))
            .unwrap();

        assert!(coreset_mmd(kernel, &data, &indices) <= before + 1e-12);
        assert!(outcome.passes >= 1 && outcome.passes <= 4);
    }

    #[test]
    fn test_optimal_single_point_is_kept() {
        // The densest point is the best single-point coreset
        let data = ndarray::array![[0.0], [1.0], [2.0]];
        let kernel = SquaredExponentialKernel::default();
        let mut indices = vec![1];
        let problem = RefineProblem::new(&kernel, data.view());

        let outcome = RefineReverse::new()
            .refine(&problem, &mut indices, &mut ChaCha8Rng::seed_from_u64(0))
            .unwrap();
        assert_eq!(indices, vec![1]);
        assert_eq!(outcome.swaps, 0);
    }
}
