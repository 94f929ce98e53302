//! The engine interface consumed by the triangle counter

use crate::error::EngineResult;
use crate::ops::{BinaryOp, Descriptor, ElementType, Monoid, SelectOp, Semiring, Thunk, UnaryOp};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Optional primitives an engine may or may not offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineCapabilities {
    /// `BinaryOp::Pair` may be used as a semiring multiplier
    pub pair_operator: bool,
    /// `select` is implemented
    pub select: bool,
}

impl EngineCapabilities {
    pub const FULL: Self = Self {
        pair_operator: true,
        select: true,
    };

    pub const BASIC: Self = Self {
        pair_operator: false,
        select: false,
    };
}

impl Default for EngineCapabilities {
    fn default() -> Self {
        Self::FULL
    }
}

/// Engine primitive, used to name failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    NewMatrix,
    ExtractTuples,
    Build,
    Select,
    Mxm,
    Apply,
    Reduce,
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Primitive::NewMatrix => "new_matrix",
            Primitive::ExtractTuples => "extract_tuples",
            Primitive::Build => "build",
            Primitive::Select => "select",
            Primitive::Mxm => "mxm",
            Primitive::Apply => "apply",
            Primitive::Reduce => "reduce",
        };
        write!(f, "{}", name)
    }
}

/// Sparse matrix engine.
///
/// Matrices are owned handles; dropping a handle releases it. Output
/// arguments (`&mut Self::Matrix`) must already have the right dimensions and
/// have their contents replaced unless the descriptor says otherwise.
pub trait SparseEngine: Send + Sync {
    type Matrix: Send + Sync;

    fn capabilities(&self) -> EngineCapabilities;

    /// Create an empty `nrows x ncols` matrix
    fn new_matrix(&self, dtype: ElementType, nrows: usize, ncols: usize)
        -> EngineResult<Self::Matrix>;

    fn nrows(&self, m: &Self::Matrix) -> usize;

    fn ncols(&self, m: &Self::Matrix) -> usize;

    /// Number of stored entries
    fn nvals(&self, m: &Self::Matrix) -> usize;

    /// Append every (row, col, value) triple of `m` to the given buffers
    fn extract_tuples(
        &self,
        m: &Self::Matrix,
        rows: &mut Vec<usize>,
        cols: &mut Vec<usize>,
        values: &mut Vec<i64>,
    ) -> EngineResult<()>;

    /// Replace the contents of `m` with the given triples, combining
    /// duplicate coordinates with `dup`
    fn build(
        &self,
        m: &mut Self::Matrix,
        rows: &[usize],
        cols: &[usize],
        values: &[i64],
        dup: BinaryOp,
    ) -> EngineResult<()>;

    /// `out = entries of a satisfying op(row, col, thunk)`.
    /// Only available when `capabilities().select` is set.
    fn select(
        &self,
        out: &mut Self::Matrix,
        op: SelectOp,
        a: &Self::Matrix,
        thunk: &Thunk,
    ) -> EngineResult<()>;

    /// `c<mask> = a * b` over `semiring`
    fn mxm(
        &self,
        c: &mut Self::Matrix,
        mask: Option<&Self::Matrix>,
        semiring: &Semiring,
        a: &Self::Matrix,
        b: &Self::Matrix,
        desc: &Descriptor,
    ) -> EngineResult<()>;

    /// `c = op(a)` elementwise
    fn apply(&self, c: &mut Self::Matrix, op: UnaryOp, a: &Self::Matrix) -> EngineResult<()>;

    /// Reduce every entry of `a` to a scalar
    fn reduce(&self, monoid: &Monoid, a: &Self::Matrix) -> EngineResult<i64>;
}
