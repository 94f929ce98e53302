//! Operator registry and semiring negotiation
//!
//! When the engine offers the pair operator `f(x, y) = 1`, counting only looks
//! at the structure of `A`, so its values may be anything. Otherwise the
//! arithmetic `plus.times` semiring is used and `A` must hold only 0 and 1.

use crate::method::FormulaKind;
use std::sync::LazyLock;
use tricount_sparse::{BinaryOp, Descriptor, EngineCapabilities, Monoid, Semiring};

/// Operators, semirings and descriptors shared by every count
#[derive(Debug)]
pub struct OperatorRegistry {
    pub plus_int64: Monoid,
    pub plus_pair_int64: Semiring,
    pub plus_times_int64: Semiring,
    /// Duplicate combiner for building boolean matrices
    pub lor: BinaryOp,
    /// Structural mask
    pub desc_s: Descriptor,
    /// Value mask
    pub desc_default: Descriptor,
    /// Value mask, second operand transposed
    pub desc_t1: Descriptor,
}

impl OperatorRegistry {
    fn build() -> Self {
        let plus_int64 = Monoid::new(BinaryOp::Plus, 0);
        OperatorRegistry {
            plus_int64,
            plus_pair_int64: Semiring::new(plus_int64, BinaryOp::Pair),
            plus_times_int64: Semiring::new(plus_int64, BinaryOp::Times),
            lor: BinaryOp::Lor,
            desc_s: Descriptor::new().structural(),
            desc_default: Descriptor::new(),
            desc_t1: Descriptor::new().transpose_second(),
        }
    }
}

static OPERATORS: LazyLock<OperatorRegistry> = LazyLock::new(OperatorRegistry::build);

/// The process-wide registry, built on first use
pub fn operators() -> &'static OperatorRegistry {
    &OPERATORS
}

/// Semiring and descriptor choice for one engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemiringSelector {
    structural: bool,
}

impl SemiringSelector {
    pub fn negotiate(capabilities: &EngineCapabilities) -> Self {
        SemiringSelector {
            structural: capabilities.pair_operator,
        }
    }

    /// True when counting ignores the values of `A`
    pub fn is_structural(&self) -> bool {
        self.structural
    }

    pub fn semiring(&self) -> &'static Semiring {
        if self.structural {
            &operators().plus_pair_int64
        } else {
            &operators().plus_times_int64
        }
    }

    pub fn reduction_monoid(&self) -> &'static Monoid {
        &operators().plus_int64
    }

    /// Whether the right operand must be explicitly transposed.
    ///
    /// Under the pair operator `(L * U) .* L` and `(U * L) .* U` count every
    /// triangle exactly once as written, so no transpose is requested.
    pub fn needs_transpose_descriptor(&self, kind: FormulaKind) -> bool {
        match kind {
            FormulaKind::Saxpy => false,
            FormulaKind::Dot => !self.structural,
        }
    }

    pub fn descriptor(&self, kind: FormulaKind) -> &'static Descriptor {
        let ops = operators();
        if self.structural {
            &ops.desc_s
        } else if self.needs_transpose_descriptor(kind) {
            &ops.desc_t1
        } else {
            &ops.desc_default
        }
    }
}
