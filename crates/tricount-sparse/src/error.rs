//! Error types for the sparse engine

use crate::engine::Primitive;
use thiserror::Error;

/// Errors surfaced by engine primitives
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Index ({row}, {col}) out of bounds for {nrows}x{ncols} matrix")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        nrows: usize,
        ncols: usize,
    },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Failure raised on purpose by a [`crate::FaultPlan`]
    #[error("Injected failure in {0}")]
    Injected(Primitive),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<std::collections::TryReserveError> for EngineError {
    fn from(err: std::collections::TryReserveError) -> Self {
        EngineError::OutOfMemory(err.to_string())
    }
}
