//! Error types for coreset construction

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoresetError {
    /// Coreset size rejected by a constructor. The message is kept verbatim
    /// because each constructor words its validation differently.
    #[error("{0}")]
    InvalidCoresetSize(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing capability: no {collaborator} providing `{operation}` was supplied")]
    MissingCapability {
        collaborator: &'static str,
        operation: &'static str,
    },

    #[error("Coreset not fitted")]
    NotFitted,

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Optimization failed: {0}")]
    OptimizationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    ParseError(#[from] serde_json::Error),
}

impl CoresetError {
    pub(crate) fn missing(collaborator: &'static str, operation: &'static str) -> Self {
        CoresetError::MissingCapability {
            collaborator,
            operation,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoresetError>;
