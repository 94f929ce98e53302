//! The six triangle-counting formulations
//!
//! With `L` and `U` the strictly lower and upper triangular parts of the
//! symmetric adjacency matrix `A`, every method computes the same count:
//!
//! | Method     | Formula                          |
//! |------------|----------------------------------|
//! | Burkhardt  | `sum((A * A) .* A) / 6`          |
//! | Cohen      | `sum((L * U) .* A) / 2`          |
//! | Sandia     | `sum((L * L) .* L)`              |
//! | Sandia2    | `sum((U * U) .* U)`              |
//! | SandiaDot  | `sum((L * U') .* L)`, `U' = L`   |
//! | SandiaDot2 | `sum((U * L') .* U)`, `L' = U`   |
//!
//! Burkhardt and Cohen are slower and need more memory than the Sandia
//! variants. Sandia and SandiaDot build the same intermediate product; the
//! first uses a saxpy (Gustavson) kernel, the second dot products.

use crate::error::{TriCountError, TriCountResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Triangle-counting formulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Burkhardt,
    Cohen,
    Sandia,
    Sandia2,
    SandiaDot,
    SandiaDot2,
}

/// Matrix playing a role in a method's product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    /// The input matrix `A`
    Adjacency,
    /// Strictly lower triangular part `L`
    Lower,
    /// Strictly upper triangular part `U`
    Upper,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operand::Adjacency => "A",
            Operand::Lower => "L",
            Operand::Upper => "U",
        };
        write!(f, "{}", name)
    }
}

/// Shape of the multiplication kernel a method relies on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormulaKind {
    /// Row-by-row outer product
    Saxpy,
    /// Dot products against a transposed right operand
    Dot,
}

/// `C<mask> = left * right`, then `sum(C) / divisor`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodPlan {
    pub mask: Operand,
    pub left: Operand,
    pub right: Operand,
    pub transpose_right: bool,
    pub divisor: i64,
}

impl MethodPlan {
    fn uses(&self, operand: Operand) -> bool {
        self.mask == operand || self.left == operand || self.right == operand
    }

    pub fn needs_lower(&self) -> bool {
        self.uses(Operand::Lower)
    }

    pub fn needs_upper(&self) -> bool {
        self.uses(Operand::Upper)
    }

    pub fn kind(&self) -> FormulaKind {
        if self.transpose_right {
            FormulaKind::Dot
        } else {
            FormulaKind::Saxpy
        }
    }
}

impl Method {
    pub const ALL: [Method; 6] = [
        Method::Burkhardt,
        Method::Cohen,
        Method::Sandia,
        Method::Sandia2,
        Method::SandiaDot,
        Method::SandiaDot2,
    ];

    /// Numeric selector, 1 through 6
    pub fn id(self) -> i64 {
        match self {
            Method::Burkhardt => 1,
            Method::Cohen => 2,
            Method::Sandia => 3,
            Method::Sandia2 => 4,
            Method::SandiaDot => 5,
            Method::SandiaDot2 => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Method::Burkhardt => "Burkhardt",
            Method::Cohen => "Cohen",
            Method::Sandia => "Sandia",
            Method::Sandia2 => "Sandia2",
            Method::SandiaDot => "SandiaDot",
            Method::SandiaDot2 => "SandiaDot2",
        }
    }

    pub fn plan(self) -> MethodPlan {
        use Operand::{Adjacency as A, Lower as L, Upper as U};

        let (mask, left, right, transpose_right, divisor) = match self {
            Method::Burkhardt => (A, A, A, false, 6),
            Method::Cohen => (A, L, U, false, 2),
            Method::Sandia => (L, L, L, false, 1),
            Method::Sandia2 => (U, U, U, false, 1),
            Method::SandiaDot => (L, L, U, true, 1),
            Method::SandiaDot2 => (U, U, L, true, 1),
        };
        MethodPlan {
            mask,
            left,
            right,
            transpose_right,
            divisor,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<i64> for Method {
    type Error = TriCountError;

    fn try_from(id: i64) -> TriCountResult<Self> {
        Method::ALL
            .into_iter()
            .find(|m| m.id() == id)
            .ok_or_else(|| {
                TriCountError::InvalidArgument(format!("unknown triangle counting method {}", id))
            })
    }
}

impl FromStr for Method {
    type Err = TriCountError;

    /// Accepts a numeric id or a method name, ignoring case, `-` and `_`
    fn from_str(s: &str) -> TriCountResult<Self> {
        let s = s.trim();
        if let Ok(id) = s.parse::<i64>() {
            return Method::try_from(id);
        }
        let wanted: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        Method::ALL
            .into_iter()
            .find(|m| m.name().to_ascii_lowercase() == wanted)
            .ok_or_else(|| {
                TriCountError::InvalidArgument(format!("unknown triangle counting method '{}'", s))
            })
    }
}
