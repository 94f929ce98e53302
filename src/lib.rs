//! Exact triangle counting over sparse adjacency matrices
//!
//! Given a symmetric adjacency matrix `A` with no self edges, counts the
//! triangles (3-cliques) of the undirected graph it represents using one of
//! six algebraically equivalent formulations (see [`Method`]). Each one is a
//! masked sparse matrix product followed by a sum and an exact division.
//!
//! The sparse matrix engine is a collaborator behind the
//! [`tricount_sparse::SparseEngine`] trait. Two optional engine primitives are
//! negotiated once per [`TriangleCounter`]:
//!
//! - the structural pair operator, which makes counting independent of the
//!   stored values (without it, `A` must be binary), and
//! - region select, used to split `A` into `L` and `U` (without it, the
//!   halves are rebuilt from extracted triples).
//!
//! ## Example Usage
//!
//! ```rust
//! use tricount::{Method, TriangleCounter};
//! use tricount_sparse::CsrEngine;
//!
//! let engine = CsrEngine::new();
//! // Two triangles sharing the edge 1-2
//! let a = engine
//!     .symmetric_adjacency(4, &[(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)])
//!     .unwrap();
//!
//! let counter = TriangleCounter::new(&engine);
//! for method in Method::ALL {
//!     assert_eq!(counter.count(&a, method).unwrap(), 2);
//! }
//! ```

pub mod counter;
pub mod decompose;
pub mod error;
pub mod method;
pub mod semiring;

pub use counter::{count_triangles, CountProduct, TriCountConfig, TriangleCounter};
pub use decompose::{
    extract_triangular_parts, DecomposeStrategy, TriangularDecomposer, TriangularParts,
};
pub use error::{TriCountError, TriCountResult};
pub use method::{FormulaKind, Method, MethodPlan, Operand};
pub use semiring::{operators, OperatorRegistry, SemiringSelector};
