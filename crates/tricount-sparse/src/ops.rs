//! Operators, monoids, semirings and descriptors
//!
//! All values travel through the engine as `i64`; [`ElementType`] decides how
//! they are stored when written into a matrix.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Element type of a matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ElementType {
    /// Stored as 0 or 1
    Bool,
    Int64,
}

impl ElementType {
    /// Convert a value into this type's storage representation
    pub fn cast(self, value: i64) -> i64 {
        match self {
            ElementType::Bool => (value != 0) as i64,
            ElementType::Int64 => value,
        }
    }
}

/// Binary operator f(x, y)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// f(x, y) = 1, ignores both values (structural existence)
    Pair,
    Times,
    /// Wrapping addition
    Plus,
    First,
    Second,
    /// Logical OR on nonzero-ness
    Lor,
}

impl BinaryOp {
    pub fn eval(self, x: i64, y: i64) -> i64 {
        match self {
            BinaryOp::Pair => 1,
            BinaryOp::Times => x.wrapping_mul(y),
            BinaryOp::Plus => x.wrapping_add(y),
            BinaryOp::First => x,
            BinaryOp::Second => y,
            BinaryOp::Lor => (x != 0 || y != 0) as i64,
        }
    }
}

/// Unary operator used by `apply`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Identity,
    /// f(x) = 1
    One,
    IsNonZero,
}

impl UnaryOp {
    pub fn eval(self, x: i64) -> i64 {
        match self {
            UnaryOp::Identity => x,
            UnaryOp::One => 1,
            UnaryOp::IsNonZero => (x != 0) as i64,
        }
    }
}

/// Associative operator with identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Monoid {
    pub op: BinaryOp,
    pub identity: i64,
}

impl Monoid {
    pub const fn new(op: BinaryOp, identity: i64) -> Self {
        Self { op, identity }
    }
}

/// Additive monoid plus multiplicative operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Semiring {
    pub add: Monoid,
    pub multiply: BinaryOp,
}

impl Semiring {
    pub const fn new(add: Monoid, multiply: BinaryOp) -> Self {
        Self { add, multiply }
    }
}

/// Diagonal-offset predicate for region select.
///
/// With offset `k`, `Tril` keeps entries with `col - row <= k` and `Triu`
/// keeps entries with `col - row >= k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectOp {
    Tril,
    Triu,
}

impl SelectOp {
    pub fn keeps(self, row: usize, col: usize, thunk: &Thunk) -> bool {
        let diagonal = col as i64 - row as i64;
        match self {
            SelectOp::Tril => diagonal <= thunk.value(),
            SelectOp::Triu => diagonal >= thunk.value(),
        }
    }
}

/// Scalar parameter handed to `select`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thunk {
    value: i64,
}

impl Thunk {
    pub fn new(value: i64) -> Self {
        Self { value }
    }

    pub fn value(&self) -> i64 {
        self.value
    }
}

/// How a mask admits output positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskMode {
    /// Entry admitted when the mask stores a nonzero value there
    Value,
    /// Entry admitted when the mask has any entry there
    Structure,
}

/// How a result is written into the output matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputMode {
    /// Output is cleared and overwritten with the result
    Replace,
    /// Result is merged into existing output with the semiring's add monoid
    Accumulate,
}

/// Options for `mxm`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub mask: MaskMode,
    pub transpose_first: bool,
    pub transpose_second: bool,
    pub output: OutputMode,
}

impl Descriptor {
    /// Value mask, no transposes, replace output
    pub const fn new() -> Self {
        Self {
            mask: MaskMode::Value,
            transpose_first: false,
            transpose_second: false,
            output: OutputMode::Replace,
        }
    }

    pub const fn structural(mut self) -> Self {
        self.mask = MaskMode::Structure;
        self
    }

    pub const fn transpose_second(mut self) -> Self {
        self.transpose_second = true;
        self
    }

    pub const fn transpose_first(mut self) -> Self {
        self.transpose_first = true;
        self
    }

    pub const fn accumulate(mut self) -> Self {
        self.output = OutputMode::Accumulate;
        self
    }
}

impl Default for Descriptor {
    fn default() -> Self {
        Self::new()
    }
}
