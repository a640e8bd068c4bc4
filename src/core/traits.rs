//! Core traits for coreset construction

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

/// Dataset abstraction: an ordered, immutable collection of feature vectors
pub trait Dataset: Send + Sync {
    /// Feature matrix the coreset is selected from (rows are points)
    fn pre_coreset_array(&self) -> ArrayView2<'_, f64>;

    /// Optional per-point supplementary weights
    fn weights(&self) -> Option<ArrayView1<'_, f64>> {
        None
    }

    /// Number of points in the dataset
    fn len(&self) -> usize {
        self.pre_coreset_array().nrows()
    }

    /// Number of features (dimensionality)
    fn dim(&self) -> usize {
        self.pre_coreset_array().ncols()
    }

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialise the rows at the given indices
    ///
    /// # Panics
    /// Panics if any index >= len()
    fn select(&self, indices: &[usize]) -> Array2<f64> {
        self.pre_coreset_array().select(Axis(0), indices)
    }
}
