//! Error types for triangle counting

use crate::method::{Method, Operand};
use thiserror::Error;
use tricount_sparse::EngineError;

/// Errors that can occur while counting triangles
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TriCountError {
    /// Method selector outside the six known formulations
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// A sparse engine primitive failed
    #[error("Engine failure while {context}: {source}")]
    Engine {
        context: &'static str,
        #[source]
        source: EngineError,
    },

    /// Internal invariant breach: a method plan referenced a triangular half
    /// the decomposer did not build. Not produced by `TriangleCounter`,
    /// which always builds the halves its plan needs.
    #[error("Triangular part {0} was not constructed")]
    MissingOperand(Operand),

    /// Raw sum not a multiple of the divisor; only returned in strict mode
    #[error("{method} produced raw sum {raw}, which is not a nonnegative multiple of {divisor}")]
    PreconditionViolated {
        method: Method,
        raw: i64,
        divisor: i64,
    },
}

pub type TriCountResult<T> = Result<T, TriCountError>;

/// Attach what the counter was doing to an engine failure
pub(crate) trait EngineResultExt<T> {
    fn context(self, context: &'static str) -> TriCountResult<T>;
}

impl<T> EngineResultExt<T> for Result<T, EngineError> {
    fn context(self, context: &'static str) -> TriCountResult<T> {
        self.map_err(|source| match source {
            EngineError::OutOfMemory(detail) => {
                TriCountError::OutOfMemory(format!("{}: {}", context, detail))
            }
            source => TriCountError::Engine { context, source },
        })
    }
}
