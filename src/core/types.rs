//! Core type definitions for coreset construction

use crate::core::{CoresetError, Dataset, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// In-memory dataset backed by a dense feature matrix
#[derive(Debug, Clone)]
pub struct ArrayData {
    data: Array2<f64>,
    weights: Option<Array1<f64>>,
}

impl ArrayData {
    /// Load a dataset from a feature matrix (rows are points)
    ///
    /// Rejects matrices with no rows, no columns, or non-finite entries.
    pub fn load(data: Array2<f64>) -> Result<Self> {
        validate_points(&data)?;
        Ok(Self {
            data,
            weights: None,
        })
    }

    /// Load a dataset with per-point supplementary weights
    pub fn with_weights(data: Array2<f64>, weights: Array1<f64>) -> Result<Self> {
        validate_points(&data)?;
        if weights.len() != data.nrows() {
            return Err(CoresetError::DimensionMismatch {
                expected: data.nrows(),
                actual: weights.len(),
            });
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(CoresetError::InvalidDataset(
                "weights must be finite and non-negative".to_string(),
            ));
        }
        if weights.sum() <= 0.0 {
            return Err(CoresetError::InvalidDataset(
                "weights must have a positive sum".to_string(),
            ));
        }
        Ok(Self {
            data,
            weights: Some(weights),
        })
    }

    /// Consume the dataset and return the feature matrix
    pub fn into_inner(self) -> Array2<f64> {
        self.data
    }
}

fn validate_points(data: &Array2<f64>) -> Result<()> {
    if data.nrows() == 0 {
        return Err(CoresetError::EmptyDataset);
    }
    if data.ncols() == 0 {
        return Err(CoresetError::InvalidDataset(
            "points must have at least one feature".to_string(),
        ));
    }
    if let Some(pos) = data.iter().position(|v| !v.is_finite()) {
        return Err(CoresetError::InvalidDataset(format!(
            "non-finite value in row {}",
            pos / data.ncols()
        )));
    }
    Ok(())
}

impl Dataset for ArrayData {
    fn pre_coreset_array(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    fn weights(&self) -> Option<ArrayView1<'_, f64>> {
        self.weights.as_ref().map(|w| w.view())
    }
}

/// A block of points handed to a coreset constructor by a reduction strategy
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    /// Points in this block, rows indexed locally from 0
    pub points: ArrayView2<'a, f64>,
    /// Whether the block is the complete original dataset, in original order
    pub spans_dataset: bool,
}

impl<'a> Block<'a> {
    /// Block covering the whole dataset
    pub fn full(points: ArrayView2<'a, f64>) -> Self {
        Self {
            points,
            spans_dataset: true,
        }
    }

    /// Block covering a partition (or a merged candidate set) of the dataset
    pub fn partition(points: ArrayView2<'a, f64>) -> Self {
        Self {
            points,
            spans_dataset: false,
        }
    }

    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }
}

/// Result of fitting a coreset: indices into the original data and the
/// rows they point at.
#[derive(Debug, Clone)]
pub struct FittedCoreset {
    indices: Array1<usize>,
    points: Array2<f64>,
    weights: Option<Array1<f64>>,
}

impl FittedCoreset {
    /// Build a fitted coreset by materialising `indices` from `data`
    pub(crate) fn from_indices<D: Dataset + ?Sized>(data: &D, indices: Array1<usize>) -> Self {
        let points = data.select(&indices.to_vec());
        Self {
            indices,
            points,
            weights: None,
        }
    }

    /// Indices of the coreset points in the original dataset
    pub fn indices(&self) -> ArrayView1<'_, usize> {
        self.indices.view()
    }

    /// Coreset points, always equal to `data[indices]`
    pub fn points(&self) -> ArrayView2<'_, f64> {
        self.points.view()
    }

    /// Solved weights, if any
    pub fn weights(&self) -> Option<ArrayView1<'_, f64>> {
        self.weights.as_ref().map(|w| w.view())
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub(crate) fn set_weights(&mut self, weights: Array1<f64>) {
        self.weights = Some(weights);
    }

    /// Replace the indices (after refinement) and rematerialise the points
    pub(crate) fn replace_indices<D: Dataset + ?Sized>(&mut self, data: &D, indices: Array1<usize>) {
        *self = Self::from_indices(data, indices);
    }
}

/// Result of a weights QP solve
#[derive(Debug, Clone)]
pub struct QpSolution {
    /// Weights on the probability simplex
    pub weights: Array1<f64>,
    /// Number of pairwise updates performed
    pub iterations: usize,
    /// Final value of ½wᵀQw − wᵀc
    pub objective_value: f64,
    /// Whether the optimality gap fell below epsilon
    pub converged: bool,
}

/// Result of a refinement run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefineOutcome {
    /// Passes performed, including the final pass without swaps
    pub passes: usize,
    /// Swaps applied across all passes
    pub swaps: usize,
}

/// Configuration for the weights solvers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Tolerance on the optimality gap
    pub epsilon: f64,
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Diagonal regularisation added to the coreset Gramian
    pub regularisation: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-9,
            max_iterations: 10_000,
            regularisation: 1e-10,
        }
    }
}
