//! Exhaustive refinement: every coreset position against every data point

use crate::core::{RefineOutcome, Result};
use crate::refine::{run_passes, Refine, RefineProblem, SwapState};
use rand_chacha::ChaCha8Rng;

/// For each coreset position in order, apply the best strictly improving
/// replacement among all n data points
#[derive(Debug, Clone, Copy)]
pub struct RefineRegular {
    max_passes: usize,
}

impl RefineRegular {
    pub fn new() -> Self {
        Self { max_passes: 1 }
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }
}

impl Default for RefineRegular {
    fn default() -> Self {
        Self::new()
    }
}

impl Refine for RefineRegular {
    fn refine(
        &self,
        problem: &RefineProblem<'_>,
        indices: &mut [usize],
        _rng: &mut ChaCha8Rng,
    ) -> Result<RefineOutcome> {
        let mut state = SwapState::new(problem, indices)?;
        run_passes(self.max_passes, || {
            let mut swaps = 0;
            for position in 0..indices.len() {
                if let Some(candidate) = state.best_candidate(indices, position, 0..state.n()) {
                    state.apply(indices, position, candidate);
                    swaps += 1;
                }
            }
            Ok(swaps)
        })
    }
}
