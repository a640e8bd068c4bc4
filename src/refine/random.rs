//! Randomised refinement over a sampled subset of candidates

use crate::core::{CoresetError, RefineOutcome, Result};
use crate::refine::{run_passes, Refine, RefineProblem, SwapState};
use rand_chacha::ChaCha8Rng;

/// Like [`RefineRegular`](crate::refine::RefineRegular), but each position
/// only considers a fresh random sample of max(1, ⌈p·n⌉) data points
#[derive(Debug, Clone, Copy)]
pub struct RefineRandom {
    proportion: f64,
    max_passes: usize,
}

impl RefineRandom {
    /// `proportion` of the data sampled per position, in (0, 1]
    pub fn new(proportion: f64) -> Self {
        Self {
            proportion,
            max_passes: 1,
        }
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    fn sample_size(&self, n: usize) -> Result<usize> {
        if !(self.proportion > 0.0 && self.proportion <= 1.0) {
            return Err(CoresetError::InvalidParameter(format!(
                "proportion must be in (0, 1], got: {}",
                self.proportion
            )));
        }
        Ok(((self.proportion * n as f64).ceil() as usize).clamp(1, n))
    }
}

impl Default for RefineRandom {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl Refine for RefineRandom {
    fn refine(
        &self,
        problem: &RefineProblem<'_>,
        indices: &mut [usize],
        rng: &mut ChaCha8Rng,
    ) -> Result<RefineOutcome> {
        let mut state = SwapState::new(problem, indices)?;
        let sample_size = self.sample_size(state.n())?;
        run_passes(self.max_passes, || {
            let mut swaps = 0;
            for position in 0..indices.len() {
                let candidates = rand::seq::index::sample(rng, state.n(), sample_size);
                if let Some(candidate) = state.best_candidate(indices, position, candidates) {
                    state.apply(indices, position, candidate);
                    swaps += 1;
                }
            }
            Ok(swaps)
        })
    }
}
