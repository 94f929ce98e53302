//! Sparse linear algebra engine for the tricount triangle counter
//!
//! Provides the capability-typed [`SparseEngine`] interface consumed by the
//! counting core, plus [`CsrEngine`], an in-memory Compressed Sparse Row
//! implementation whose optional primitives (the structural pair operator and
//! region select) can be switched off to exercise fallback paths.

pub mod csr;
pub mod engine;
pub mod error;
pub mod matrix;
pub mod ops;

pub use csr::{CsrEngine, FaultPlan};
pub use engine::{EngineCapabilities, Primitive, SparseEngine};
pub use error::{EngineError, EngineResult};
pub use matrix::SparseMatrix;
pub use ops::{
    BinaryOp, Descriptor, ElementType, MaskMode, Monoid, OutputMode, SelectOp, Semiring, Thunk,
    UnaryOp,
};
