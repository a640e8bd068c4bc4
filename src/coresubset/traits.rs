//! Coreset constructor trait

use crate::core::{Block, CoresetError, Result};
use crate::kernel::Kernel;
use rand_chacha::ChaCha8Rng;

/// A coreset constructor selects points from a block of data
///
/// Reduction strategies call `select` one or more times; indices returned are
/// local to the block. Constructors are configuration values and are never
/// mutated by selection.
pub trait CoresetMethod: Send + Sync {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    /// Validate a requested coreset size
    ///
    /// Each constructor words its rejection differently and the messages are
    /// part of the public contract.
    fn validate_coreset_size(&self, coreset_size: i64) -> Result<usize>;

    /// Select `coreset_size` row indices from `block`
    fn select(
        &self,
        block: &Block<'_>,
        coreset_size: usize,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<usize>>;

    /// Whether selected indices are distinct
    fn unique(&self) -> bool;

    /// Kernel defining the discrepancy this constructor targets, if any
    fn kernel(&self) -> Option<&dyn Kernel>;
}

impl<M: CoresetMethod + ?Sized> CoresetMethod for Box<M> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn validate_coreset_size(&self, coreset_size: i64) -> Result<usize> {
        (**self).validate_coreset_size(coreset_size)
    }

    fn select(
        &self,
        block: &Block<'_>,
        coreset_size: usize,
        rng: &mut ChaCha8Rng,
    ) -> Result<Vec<usize>> {
        (**self).select(block, coreset_size, rng)
    }

    fn unique(&self) -> bool {
        (**self).unique()
    }

    fn kernel(&self) -> Option<&dyn Kernel> {
        (**self).kernel()
    }
}

/// Reject sizes a block cannot satisfy without repeats
pub(crate) fn check_unique_size(unique: bool, coreset_size: usize, n: usize) -> Result<()> {
    if unique && coreset_size > n {
        return Err(CoresetError::InvalidParameter(format!(
            "coreset_size {} exceeds the {} available points while unique is set",
            coreset_size, n
        )));
    }
    Ok(())
}
