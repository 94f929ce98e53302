//! Strictly lower / upper triangular decomposition of the adjacency matrix

use crate::error::{EngineResultExt, TriCountError, TriCountResult};
use crate::method::Operand;
use crate::semiring::operators;
use tracing::debug;
use tricount_sparse::{ElementType, EngineCapabilities, SelectOp, SparseEngine, Thunk};

/// How `L` and `U` are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecomposeStrategy {
    /// Engine region select, `tril(A, -1)` and `triu(A, 1)`
    Select,
    /// Extract all triples, keep row > col, rebuild
    Tuples,
}

impl DecomposeStrategy {
    pub fn negotiate(capabilities: &EngineCapabilities) -> Self {
        if capabilities.select {
            DecomposeStrategy::Select
        } else {
            DecomposeStrategy::Tuples
        }
    }
}

/// Requested halves of `A`; an unrequested half is `None`
#[derive(Debug)]
pub struct TriangularParts<M> {
    pub lower: Option<M>,
    pub upper: Option<M>,
}

impl<M> TriangularParts<M> {
    pub fn none() -> Self {
        TriangularParts {
            lower: None,
            upper: None,
        }
    }

    /// The half named by `operand`; always `None` for `Operand::Adjacency`
    pub fn get(&self, operand: Operand) -> Option<&M> {
        match operand {
            Operand::Adjacency => None,
            Operand::Lower => self.lower.as_ref(),
            Operand::Upper => self.upper.as_ref(),
        }
    }
}

/// Row, column and value buffers for the tuple strategy
#[derive(Debug)]
pub(crate) struct TupleBuffers {
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<i64>,
}

impl TupleBuffers {
    /// Reserve room for `nvals` triples in all three buffers or none
    pub(crate) fn reserve(nvals: usize) -> TriCountResult<Self> {
        let mut rows = Vec::new();
        let mut cols = Vec::new();
        let mut values = Vec::new();
        rows.try_reserve_exact(nvals)
            .and_then(|()| cols.try_reserve_exact(nvals))
            .and_then(|()| values.try_reserve_exact(nvals))
            .map_err(|err| {
                TriCountError::OutOfMemory(format!("tuple buffers for {} entries: {}", nvals, err))
            })?;
        Ok(TupleBuffers { rows, cols, values })
    }

    /// Compact in place to the entries with row > col
    fn retain_strictly_lower(&mut self) {
        let mut kept = 0;
        for k in 0..self.rows.len() {
            if self.rows[k] > self.cols[k] {
                self.rows[kept] = self.rows[k];
                self.cols[kept] = self.cols[k];
                self.values[kept] = self.values[k];
                kept += 1;
            }
        }
        self.rows.truncate(kept);
        self.cols.truncate(kept);
        self.values.truncate(kept);
    }
}

/// Builds `L` and/or `U` with the strategy negotiated for an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriangularDecomposer {
    strategy: DecomposeStrategy,
}

impl TriangularDecomposer {
    pub fn new(strategy: DecomposeStrategy) -> Self {
        TriangularDecomposer { strategy }
    }

    pub fn negotiate(capabilities: &EngineCapabilities) -> Self {
        Self::new(DecomposeStrategy::negotiate(capabilities))
    }

    pub fn strategy(&self) -> DecomposeStrategy {
        self.strategy
    }

    /// Build the requested halves of `a` as boolean matrices.
    ///
    /// `L` holds exactly the entries of `a` below the diagonal and `U` those
    /// above it. If a step fails, halves built so far are dropped before the
    /// error is returned.
    pub fn extract<E: SparseEngine>(
        &self,
        engine: &E,
        a: &E::Matrix,
        want_lower: bool,
        want_upper: bool,
    ) -> TriCountResult<TriangularParts<E::Matrix>> {
        if !want_lower && !want_upper {
            return Ok(TriangularParts::none());
        }
        debug!(
            "Extracting triangular parts with {:?} strategy (lower: {}, upper: {})",
            self.strategy, want_lower, want_upper
        );
        match self.strategy {
            DecomposeStrategy::Select => select_parts(engine, a, want_lower, want_upper),
            DecomposeStrategy::Tuples => tuple_parts(engine, a, want_lower, want_upper),
        }
    }
}

/// Build the requested halves of `a` with the strategy `engine` supports
pub fn extract_triangular_parts<E: SparseEngine>(
    engine: &E,
    a: &E::Matrix,
    want_lower: bool,
    want_upper: bool,
) -> TriCountResult<TriangularParts<E::Matrix>> {
    TriangularDecomposer::negotiate(&engine.capabilities())
        .extract(engine, a, want_lower, want_upper)
}

fn select_parts<E: SparseEngine>(
    engine: &E,
    a: &E::Matrix,
    want_lower: bool,
    want_upper: bool,
) -> TriCountResult<TriangularParts<E::Matrix>> {
    let n = engine.nrows(a);
    let lower = if want_lower {
        Some(select_half(engine, a, n, SelectOp::Tril, -1)?)
    } else {
        None
    };
    let upper = if want_upper {
        Some(select_half(engine, a, n, SelectOp::Triu, 1)?)
    } else {
        None
    };
    Ok(TriangularParts { lower, upper })
}

fn select_half<E: SparseEngine>(
    engine: &E,
    a: &E::Matrix,
    n: usize,
    op: SelectOp,
    offset: i64,
) -> TriCountResult<E::Matrix> {
    let thunk = Thunk::new(offset);
    let mut half = engine
        .new_matrix(ElementType::Bool, n, n)
        .context("allocating triangular part")?;
    engine
        .select(&mut half, op, a, &thunk)
        .context("selecting triangular part")?;
    Ok(half)
}

fn tuple_parts<E: SparseEngine>(
    engine: &E,
    a: &E::Matrix,
    want_lower: bool,
    want_upper: bool,
) -> TriCountResult<TriangularParts<E::Matrix>> {
    let n = engine.nrows(a);
    let mut buffers = TupleBuffers::reserve(engine.nvals(a))?;
    engine
        .extract_tuples(a, &mut buffers.rows, &mut buffers.cols, &mut buffers.values)
        .context("extracting tuples")?;
    buffers.retain_strictly_lower();

    // U is L transposed: same triples with rows and columns swapped
    let lower = if want_lower {
        Some(build_half(engine, n, &buffers.rows, &buffers.cols, &buffers.values)?)
    } else {
        None
    };
    let upper = if want_upper {
        Some(build_half(engine, n, &buffers.cols, &buffers.rows, &buffers.values)?)
    } else {
        None
    };
    Ok(TriangularParts { lower, upper })
}

fn build_half<E: SparseEngine>(
    engine: &E,
    n: usize,
    rows: &[usize],
    cols: &[usize],
    values: &[i64],
) -> TriCountResult<E::Matrix> {
    let mut half = engine
        .new_matrix(ElementType::Bool, n, n)
        .context("allocating triangular part")?;
    engine
        .build(&mut half, rows, cols, values, operators().lor)
        .context("building triangular part")?;
    Ok(half)
}
