//! In-memory CSR implementation of [`SparseEngine`]
//!
//! Masked products are computed row by row in parallel with rayon. Without a
//! transposed second operand the kernel is Gustavson's saxpy method with a
//! per-thread dense accumulator; with `transpose_second` every admitted
//! output entry is a sorted-merge dot product of two rows.

use crate::engine::{EngineCapabilities, Primitive, SparseEngine};
use crate::error::{EngineError, EngineResult};
use crate::matrix::{LiveToken, SparseMatrix};
use crate::ops::{
    BinaryOp, Descriptor, ElementType, MaskMode, Monoid, OutputMode, SelectOp, Semiring, Thunk,
    UnaryOp,
};
use rayon::prelude::*;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

/// One output row: sorted column indices and aligned values
type Row = (Vec<usize>, Vec<i64>);

/// Makes one engine primitive fail, for exercising error paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultPlan {
    pub primitive: Primitive,
    /// Number of calls to let through before failing
    pub skip: usize,
    /// Report `OutOfMemory` instead of `Injected`
    pub out_of_memory: bool,
}

impl FaultPlan {
    pub fn fail(primitive: Primitive) -> Self {
        Self {
            primitive,
            skip: 0,
            out_of_memory: false,
        }
    }

    pub fn after(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn out_of_memory(mut self) -> Self {
        self.out_of_memory = true;
        self
    }
}

/// Compressed Sparse Row engine
#[derive(Debug)]
pub struct CsrEngine {
    capabilities: EngineCapabilities,
    live: Arc<AtomicUsize>,
    fault: Option<FaultPlan>,
    fault_calls: AtomicUsize,
}

impl Default for CsrEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CsrEngine {
    /// Engine offering every optional primitive
    pub fn new() -> Self {
        Self::with_capabilities(EngineCapabilities::FULL)
    }

    pub fn with_capabilities(capabilities: EngineCapabilities) -> Self {
        CsrEngine {
            capabilities,
            live: Arc::new(AtomicUsize::new(0)),
            fault: None,
            fault_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_fault_plan(mut self, plan: FaultPlan) -> Self {
        self.fault = Some(plan);
        self
    }

    /// Number of matrices created by this engine that have not been dropped
    pub fn live_matrices(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Build a matrix from triples. Not subject to the fault plan.
    #[allow(clippy::too_many_arguments)]
    pub fn from_tuples(
        &self,
        dtype: ElementType,
        nrows: usize,
        ncols: usize,
        rows: &[usize],
        cols: &[usize],
        values: &[i64],
        dup: BinaryOp,
    ) -> EngineResult<SparseMatrix> {
        let mut m = self.allocate(dtype, nrows, ncols)?;
        self.build_into(&mut m, rows, cols, values, dup)?;
        Ok(m)
    }

    /// Symmetric `Int64` adjacency matrix with value 1 for every undirected
    /// edge. Self loops are skipped and repeated edges collapse.
    pub fn symmetric_adjacency(
        &self,
        n: usize,
        edges: &[(usize, usize)],
    ) -> EngineResult<SparseMatrix> {
        let mut rows = Vec::with_capacity(edges.len() * 2);
        let mut cols = Vec::with_capacity(edges.len() * 2);
        for &(u, v) in edges {
            if u == v {
                continue;
            }
            rows.push(u);
            cols.push(v);
            rows.push(v);
            cols.push(u);
        }
        let values = vec![1; rows.len()];
        self.from_tuples(ElementType::Int64, n, n, &rows, &cols, &values, BinaryOp::First)
    }

    /// Structural and value transpose. Not subject to the fault plan.
    pub fn transpose(&self, a: &SparseMatrix) -> EngineResult<SparseMatrix> {
        let nvals = a.nvals();
        let mut offsets = vec![0usize; a.ncols() + 1];
        for &j in a.col_idx() {
            offsets[j + 1] += 1;
        }
        for j in 0..a.ncols() {
            offsets[j + 1] += offsets[j];
        }

        let row_ptr = offsets.clone();
        let mut next = offsets;
        let mut col_idx = vec![0usize; nvals];
        let mut values = vec![0i64; nvals];
        for (i, j, v) in a.iter() {
            let slot = next[j];
            col_idx[slot] = i;
            values[slot] = v;
            next[j] += 1;
        }

        let mut t = self.allocate(a.dtype(), a.ncols(), a.nrows())?;
        t.set_contents(row_ptr, col_idx, values);
        Ok(t)
    }

    fn check(&self, primitive: Primitive) -> EngineResult<()> {
        let Some(plan) = self.fault else {
            return Ok(());
        };
        if plan.primitive != primitive {
            return Ok(());
        }
        let call = self.fault_calls.fetch_add(1, Ordering::SeqCst);
        if call < plan.skip {
            return Ok(());
        }
        trace!("Injecting failure into {} (call {})", primitive, call);
        if plan.out_of_memory {
            Err(EngineError::OutOfMemory(format!("injected in {}", primitive)))
        } else {
            Err(EngineError::Injected(primitive))
        }
    }

    fn allocate(
        &self,
        dtype: ElementType,
        nrows: usize,
        ncols: usize,
    ) -> EngineResult<SparseMatrix> {
        let len = nrows
            .checked_add(1)
            .ok_or_else(|| EngineError::OutOfMemory(format!("{} rows", nrows)))?;
        let mut row_ptr = Vec::new();
        row_ptr.try_reserve_exact(len)?;
        row_ptr.resize(len, 0);
        Ok(SparseMatrix::empty(
            dtype,
            nrows,
            ncols,
            row_ptr,
            LiveToken::acquire(&self.live),
        ))
    }

    fn build_into(
        &self,
        m: &mut SparseMatrix,
        rows: &[usize],
        cols: &[usize],
        values: &[i64],
        dup: BinaryOp,
    ) -> EngineResult<()> {
        let n = rows.len();
        if cols.len() != n || values.len() != n {
            return Err(EngineError::InvalidValue(format!(
                "tuple buffers differ in length: {} rows, {} cols, {} values",
                n,
                cols.len(),
                values.len()
            )));
        }
        for (&row, &col) in rows.iter().zip(cols) {
            if row >= m.nrows() || col >= m.ncols() {
                return Err(EngineError::IndexOutOfBounds {
                    row,
                    col,
                    nrows: m.nrows(),
                    ncols: m.ncols(),
                });
            }
        }

        let mut order: Vec<usize> = Vec::new();
        order.try_reserve_exact(n)?;
        order.extend(0..n);
        // Stable, so duplicates reach `dup` in input order
        order.sort_by_key(|&k| (rows[k], cols[k]));

        let mut row_ptr = vec![0usize; m.nrows() + 1];
        let mut col_idx = Vec::with_capacity(n);
        let mut vals: Vec<i64> = Vec::with_capacity(n);
        let mut last = None;
        for k in order {
            let key = (rows[k], cols[k]);
            if last == Some(key) {
                if let Some(v) = vals.last_mut() {
                    *v = dup.eval(*v, values[k]);
                }
                continue;
            }
            col_idx.push(key.1);
            vals.push(values[k]);
            row_ptr[key.0 + 1] += 1;
            last = Some(key);
        }
        for i in 0..m.nrows() {
            row_ptr[i + 1] += row_ptr[i];
        }

        m.set_contents(row_ptr, col_idx, vals);
        Ok(())
    }
}

impl SparseEngine for CsrEngine {
    type Matrix = SparseMatrix;

    fn capabilities(&self) -> EngineCapabilities {
        self.capabilities
    }

    fn new_matrix(
        &self,
        dtype: ElementType,
        nrows: usize,
        ncols: usize,
    ) -> EngineResult<SparseMatrix> {
        self.check(Primitive::NewMatrix)?;
        self.allocate(dtype, nrows, ncols)
    }

    fn nrows(&self, m: &SparseMatrix) -> usize {
        m.nrows()
    }

    fn ncols(&self, m: &SparseMatrix) -> usize {
        m.ncols()
    }

    fn nvals(&self, m: &SparseMatrix) -> usize {
        m.nvals()
    }

    fn extract_tuples(
        &self,
        m: &SparseMatrix,
        rows: &mut Vec<usize>,
        cols: &mut Vec<usize>,
        values: &mut Vec<i64>,
    ) -> EngineResult<()> {
        self.check(Primitive::ExtractTuples)?;
        let n = m.nvals();
        rows.try_reserve(n)?;
        cols.try_reserve(n)?;
        values.try_reserve(n)?;
        for (i, j, v) in m.iter() {
            rows.push(i);
            cols.push(j);
            values.push(v);
        }
        Ok(())
    }

    fn build(
        &self,
        m: &mut SparseMatrix,
        rows: &[usize],
        cols: &[usize],
        values: &[i64],
        dup: BinaryOp,
    ) -> EngineResult<()> {
        self.check(Primitive::Build)?;
        self.build_into(m, rows, cols, values, dup)
    }

    fn select(
        &self,
        out: &mut SparseMatrix,
        op: SelectOp,
        a: &SparseMatrix,
        thunk: &Thunk,
    ) -> EngineResult<()> {
        self.check(Primitive::Select)?;
        if !self.capabilities.select {
            return Err(EngineError::Unsupported("select".to_string()));
        }
        ensure_shape("select output", out, a.nrows(), a.ncols())?;

        let mut row_ptr = Vec::with_capacity(a.nrows() + 1);
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        row_ptr.push(0);
        for i in 0..a.nrows() {
            let (cols, vals) = a.row(i);
            for (&j, &v) in cols.iter().zip(vals) {
                if op.keeps(i, j, thunk) {
                    col_idx.push(j);
                    values.push(v);
                }
            }
            row_ptr.push(col_idx.len());
        }
        trace!(
            "select {:?} (k = {}) kept {} of {} entries",
            op,
            thunk.value(),
            col_idx.len(),
            a.nvals()
        );

        out.set_contents(row_ptr, col_idx, values);
        Ok(())
    }

    fn mxm(
        &self,
        c: &mut SparseMatrix,
        mask: Option<&SparseMatrix>,
        semiring: &Semiring,
        a: &SparseMatrix,
        b: &SparseMatrix,
        desc: &Descriptor,
    ) -> EngineResult<()> {
        self.check(Primitive::Mxm)?;
        if semiring.multiply == BinaryOp::Pair && !self.capabilities.pair_operator {
            return Err(EngineError::Unsupported("pair operator".to_string()));
        }

        let transposed;
        let a = if desc.transpose_first {
            transposed = self.transpose(a)?;
            &transposed
        } else {
            a
        };
        let (inner, out_cols) = if desc.transpose_second {
            (b.ncols(), b.nrows())
        } else {
            (b.nrows(), b.ncols())
        };
        if a.ncols() != inner {
            return Err(EngineError::DimensionMismatch(format!(
                "inner dimensions {} and {}",
                a.ncols(),
                inner
            )));
        }
        ensure_shape("mxm output", c, a.nrows(), out_cols)?;
        if let Some(m) = mask {
            ensure_shape("mxm mask", m, a.nrows(), out_cols)?;
        }

        let rows = if desc.transpose_second {
            dot_rows(a, b, mask, desc.mask, semiring, out_cols)
        } else {
            saxpy_rows(a, b, mask, desc.mask, semiring, out_cols)
        };
        let rows: Vec<Row> = match desc.output {
            OutputMode::Replace => rows,
            OutputMode::Accumulate => rows
                .into_iter()
                .enumerate()
                .map(|(i, row)| merge_row(c.row(i), row, semiring.add.op))
                .collect(),
        };

        let (row_ptr, col_idx, values) = assemble(rows);
        trace!("mxm produced {} entries ({}x{})", col_idx.len(), a.nrows(), out_cols);
        c.set_contents(row_ptr, col_idx, values);
        Ok(())
    }

    fn apply(&self, c: &mut SparseMatrix, op: UnaryOp, a: &SparseMatrix) -> EngineResult<()> {
        self.check(Primitive::Apply)?;
        ensure_shape("apply output", c, a.nrows(), a.ncols())?;
        let values = a.values().iter().map(|&v| op.eval(v)).collect();
        c.set_contents(a.row_ptr().to_vec(), a.col_idx().to_vec(), values);
        Ok(())
    }

    fn reduce(&self, monoid: &Monoid, a: &SparseMatrix) -> EngineResult<i64> {
        self.check(Primitive::Reduce)?;
        Ok(a
            .values()
            .par_iter()
            .copied()
            .reduce(|| monoid.identity, |x, y| monoid.op.eval(x, y)))
    }
}

fn ensure_shape(what: &str, m: &SparseMatrix, nrows: usize, ncols: usize) -> EngineResult<()> {
    if m.nrows() != nrows || m.ncols() != ncols {
        return Err(EngineError::DimensionMismatch(format!(
            "{} is {}x{}, expected {}x{}",
            what,
            m.nrows(),
            m.ncols(),
            nrows,
            ncols
        )));
    }
    Ok(())
}

/// Columns of row `i` admitted by the mask
fn allowed_columns(
    mask: &SparseMatrix,
    i: usize,
    mode: MaskMode,
) -> impl Iterator<Item = usize> + '_ {
    let (cols, vals) = mask.row(i);
    cols.iter()
        .zip(vals)
        .filter(move |(_, &v)| mode == MaskMode::Structure || v != 0)
        .map(|(&j, _)| j)
}

/// Dense accumulator reused across the rows a rayon worker handles
struct RowWorkspace {
    allowed: Vec<bool>,
    sums: Vec<Option<i64>>,
    touched: Vec<usize>,
}

impl RowWorkspace {
    fn new(ncols: usize) -> Self {
        RowWorkspace {
            allowed: vec![false; ncols],
            sums: vec![None; ncols],
            touched: Vec::new(),
        }
    }

    fn product_row(
        &mut self,
        a: &SparseMatrix,
        b: &SparseMatrix,
        mask: Option<&SparseMatrix>,
        mode: MaskMode,
        semiring: &Semiring,
        i: usize,
    ) -> Row {
        if let Some(m) = mask {
            for j in allowed_columns(m, i, mode) {
                self.allowed[j] = true;
            }
        }

        let (a_cols, a_vals) = a.row(i);
        for (&k, &a_ik) in a_cols.iter().zip(a_vals) {
            let (b_cols, b_vals) = b.row(k);
            for (&j, &b_kj) in b_cols.iter().zip(b_vals) {
                if mask.is_some() && !self.allowed[j] {
                    continue;
                }
                let t = semiring.multiply.eval(a_ik, b_kj);
                match self.sums[j] {
                    Some(s) => self.sums[j] = Some(semiring.add.op.eval(s, t)),
                    None => {
                        self.sums[j] = Some(t);
                        self.touched.push(j);
                    }
                }
            }
        }

        self.touched.sort_unstable();
        let mut cols = Vec::with_capacity(self.touched.len());
        let mut vals = Vec::with_capacity(self.touched.len());
        for &j in &self.touched {
            if let Some(v) = self.sums[j].take() {
                cols.push(j);
                vals.push(v);
            }
        }
        self.touched.clear();

        if let Some(m) = mask {
            for j in allowed_columns(m, i, mode) {
                self.allowed[j] = false;
            }
        }
        (cols, vals)
    }
}

fn saxpy_rows(
    a: &SparseMatrix,
    b: &SparseMatrix,
    mask: Option<&SparseMatrix>,
    mode: MaskMode,
    semiring: &Semiring,
    out_cols: usize,
) -> Vec<Row> {
    (0..a.nrows())
        .into_par_iter()
        .map_init(
            || RowWorkspace::new(out_cols),
            |ws, i| ws.product_row(a, b, mask, mode, semiring, i),
        )
        .collect()
}

/// `c(i, j) = a(i, :) . b(j, :)` for every admitted (i, j)
fn dot_rows(
    a: &SparseMatrix,
    b: &SparseMatrix,
    mask: Option<&SparseMatrix>,
    mode: MaskMode,
    semiring: &Semiring,
    out_cols: usize,
) -> Vec<Row> {
    (0..a.nrows())
        .into_par_iter()
        .map(|i| {
            let (a_cols, a_vals) = a.row(i);
            let mut cols = Vec::new();
            let mut vals = Vec::new();
            if a_cols.is_empty() {
                return (cols, vals);
            }
            let candidates: Vec<usize> = match mask {
                Some(m) => allowed_columns(m, i, mode).collect(),
                None => (0..out_cols).collect(),
            };
            for j in candidates {
                let (b_cols, b_vals) = b.row(j);
                if let Some(v) = dot(semiring, a_cols, a_vals, b_cols, b_vals) {
                    cols.push(j);
                    vals.push(v);
                }
            }
            (cols, vals)
        })
        .collect()
}

/// Sorted-merge dot product; `None` when the rows share no column
fn dot(
    semiring: &Semiring,
    a_cols: &[usize],
    a_vals: &[i64],
    b_cols: &[usize],
    b_vals: &[i64],
) -> Option<i64> {
    let (mut p, mut q) = (0, 0);
    let mut acc = None;
    while p < a_cols.len() && q < b_cols.len() {
        match a_cols[p].cmp(&b_cols[q]) {
            CmpOrdering::Less => p += 1,
            CmpOrdering::Greater => q += 1,
            CmpOrdering::Equal => {
                let t = semiring.multiply.eval(a_vals[p], b_vals[q]);
                acc = Some(match acc {
                    Some(s) => semiring.add.op.eval(s, t),
                    None => t,
                });
                p += 1;
                q += 1;
            }
        }
    }
    acc
}

/// Union of an existing row and a new one, combining shared columns with `add`
fn merge_row(existing: (&[usize], &[i64]), new: Row, add: BinaryOp) -> Row {
    let (old_cols, old_vals) = existing;
    let (new_cols, new_vals) = new;
    let mut cols = Vec::with_capacity(old_cols.len() + new_cols.len());
    let mut vals = Vec::with_capacity(old_cols.len() + new_cols.len());
    let (mut p, mut q) = (0, 0);
    while p < old_cols.len() || q < new_cols.len() {
        let take_old = q >= new_cols.len() || (p < old_cols.len() && old_cols[p] < new_cols[q]);
        let take_new = p >= old_cols.len() || (q < new_cols.len() && new_cols[q] < old_cols[p]);
        if take_old {
            cols.push(old_cols[p]);
            vals.push(old_vals[p]);
            p += 1;
        } else if take_new {
            cols.push(new_cols[q]);
            vals.push(new_vals[q]);
            q += 1;
        } else {
            cols.push(old_cols[p]);
            vals.push(add.eval(old_vals[p], new_vals[q]));
            p += 1;
            q += 1;
        }
    }
    (cols, vals)
}

fn assemble(rows: Vec<Row>) -> (Vec<usize>, Vec<usize>, Vec<i64>) {
    let nnz = rows.iter().map(|(cols, _)| cols.len()).sum();
    let mut row_ptr = Vec::with_capacity(rows.len() + 1);
    let mut col_idx = Vec::with_capacity(nnz);
    let mut values = Vec::with_capacity(nnz);
    row_ptr.push(0);
    for (cols, vals) in rows {
        col_idx.extend(cols);
        values.extend(vals);
        row_ptr.push(col_idx.len());
    }
    (row_ptr, col_idx, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLUS: Monoid = Monoid::new(BinaryOp::Plus, 0);
    const PLUS_TIMES: Semiring = Semiring::new(PLUS, BinaryOp::Times);
    const PLUS_PAIR: Semiring = Semiring::new(PLUS, BinaryOp::Pair);

    fn dense(engine: &CsrEngine, n: usize, entries: &[(usize, usize, i64)]) -> SparseMatrix {
        let rows: Vec<usize> = entries.iter().map(|e| e.0).collect();
        let cols: Vec<usize> = entries.iter().map(|e| e.1).collect();
        let vals: Vec<i64> = entries.iter().map(|e| e.2).collect();
        engine
            .from_tuples(ElementType::Int64, n, n, &rows, &cols, &vals, BinaryOp::Plus)
            .unwrap()
    }

    #[test]
    fn test_build_sorts_and_combines_duplicates() {
        let engine = CsrEngine::new();
        let m = dense(&engine, 3, &[(2, 0, 1), (0, 2, 4), (0, 1, 2), (0, 2, 5)]);

        assert_eq!(m.nvals(), 3);
        assert_eq!(m.get(0, 2), Some(9));
        let entries: Vec<_> = m.iter().collect();
        assert_eq!(entries, vec![(0, 1, 2), (0, 2, 9), (2, 0, 1)]);
    }

    #[test]
    fn test_build_keeps_input_order_of_duplicates() {
        // 77 keys, each written three times, interleaved across the input
        let keys: Vec<(usize, usize)> = (0..77).map(|k| (k % 11, (k * 7) % 13)).collect();
        let mut rows = Vec::new();
        let mut cols = Vec::new();
        let mut vals = Vec::new();
        for round in 0..3i64 {
            for (k, &(i, j)) in keys.iter().enumerate().rev() {
                rows.push(i);
                cols.push(j);
                vals.push(round * 1000 + k as i64);
            }
        }

        let engine = CsrEngine::new();
        let first = engine
            .from_tuples(ElementType::Int64, 11, 13, &rows, &cols, &vals, BinaryOp::First)
            .unwrap();
        let second = engine
            .from_tuples(ElementType::Int64, 11, 13, &rows, &cols, &vals, BinaryOp::Second)
            .unwrap();

        assert_eq!(first.nvals(), keys.len());
        for (k, &(i, j)) in keys.iter().enumerate() {
            assert_eq!(first.get(i, j), Some(k as i64), "First at ({}, {})", i, j);
            assert_eq!(second.get(i, j), Some(2000 + k as i64), "Second at ({}, {})", i, j);
        }
    }

    #[test]
    fn test_build_bool_with_lor() {
        let engine = CsrEngine::new();
        let m = engine
            .from_tuples(ElementType::Bool, 2, 2, &[1, 1], &[0, 0], &[0, 7], BinaryOp::Lor)
            .unwrap();
        assert_eq!(m.get(1, 0), Some(1));
    }

    #[test]
    fn test_build_rejects_out_of_bounds() {
        let engine = CsrEngine::new();
        let err = engine
            .from_tuples(ElementType::Int64, 2, 2, &[0], &[5], &[1], BinaryOp::First)
            .unwrap_err();
        assert!(matches!(err, EngineError::IndexOutOfBounds { col: 5, .. }));
    }

    #[test]
    fn test_transpose() {
        let engine = CsrEngine::new();
        let m = dense(&engine, 3, &[(0, 1, 2), (0, 2, 3), (2, 1, 4)]);
        let t = engine.transpose(&m).unwrap();

        assert_eq!(t.get(1, 0), Some(2));
        assert_eq!(t.get(2, 0), Some(3));
        assert_eq!(t.get(1, 2), Some(4));
        assert_eq!(t.nvals(), 3);
        let back = engine.transpose(&t).unwrap();
        assert!(back.same_structure(&m));
    }

    #[test]
    fn test_select_strict_triangles() {
        let engine = CsrEngine::new();
        let a = dense(
            &engine,
            3,
            &[(0, 0, 1), (0, 1, 1), (1, 0, 1), (1, 2, 1), (2, 1, 1), (2, 2, 1)],
        );
        let mut lower = engine.new_matrix(ElementType::Bool, 3, 3).unwrap();
        engine.select(&mut lower, SelectOp::Tril, &a, &Thunk::new(-1)).unwrap();

        let entries: Vec<_> = lower.iter().map(|(i, j, _)| (i, j)).collect();
        assert_eq!(entries, vec![(1, 0), (2, 1)]);
    }

    #[test]
    fn test_select_unsupported() {
        let engine = CsrEngine::with_capabilities(EngineCapabilities::BASIC);
        let a = dense(&engine, 2, &[(0, 1, 1)]);
        let mut out = engine.new_matrix(ElementType::Bool, 2, 2).unwrap();
        let err = engine.select(&mut out, SelectOp::Triu, &a, &Thunk::new(1)).unwrap_err();
        assert!(matches!(err, EngineError::Unsupported(_)));
    }

    #[test]
    fn test_mxm_unmasked_matches_hand_product() {
        let engine = CsrEngine::new();
        // [1 2]   [5 0]   [5 14]
        // [0 3] * [0 7] = [0 21]
        let a = dense(&engine, 2, &[(0, 0, 1), (0, 1, 2), (1, 1, 3)]);
        let b = dense(&engine, 2, &[(0, 0, 5), (1, 1, 7)]);
        let mut c = engine.new_matrix(ElementType::Int64, 2, 2).unwrap();
        engine.mxm(&mut c, None, &PLUS_TIMES, &a, &b, &Descriptor::new()).unwrap();

        assert_eq!(c.get(0, 0), Some(5));
        assert_eq!(c.get(0, 1), Some(14));
        assert_eq!(c.get(1, 1), Some(21));
        assert_eq!(c.get(1, 0), None);
    }

    #[test]
    fn test_mxm_dot_and_saxpy_agree() {
        let engine = CsrEngine::new();
        let a = dense(
            &engine,
            4,
            &[(0, 1, 2), (0, 3, 1), (1, 2, 4), (2, 0, 3), (3, 1, 5), (3, 2, 1)],
        );
        let b = dense(&engine, 4, &[(1, 0, 1), (1, 3, 2), (2, 2, 6), (3, 0, 7), (0, 1, 1)]);
        let bt = engine.transpose(&b).unwrap();
        let mask = dense(&engine, 4, &[(0, 0, 1), (0, 3, 1), (1, 2, 1), (3, 0, 1), (3, 2, 0)]);

        for mode in [Descriptor::new(), Descriptor::new().structural()] {
            let mut saxpy = engine.new_matrix(ElementType::Int64, 4, 4).unwrap();
            engine.mxm(&mut saxpy, Some(&mask), &PLUS_TIMES, &a, &b, &mode).unwrap();

            let mut dot = engine.new_matrix(ElementType::Int64, 4, 4).unwrap();
            engine
                .mxm(&mut dot, Some(&mask), &PLUS_TIMES, &a, &bt, &mode.transpose_second())
                .unwrap();

            assert!(saxpy.same_structure(&dot));
            assert_eq!(saxpy.iter().collect::<Vec<_>>(), dot.iter().collect::<Vec<_>>());
            for (i, j, _) in saxpy.iter() {
                assert!(mask.contains(i, j));
            }
        }
    }

    #[test]
    fn test_mxm_value_mask_skips_explicit_zero() {
        let engine = CsrEngine::new();
        let a = dense(&engine, 2, &[(0, 0, 1), (1, 1, 1)]);
        let mask = dense(&engine, 2, &[(0, 0, 0), (1, 1, 1)]);
        let mut c = engine.new_matrix(ElementType::Int64, 2, 2).unwrap();

        engine.mxm(&mut c, Some(&mask), &PLUS_TIMES, &a, &a, &Descriptor::new()).unwrap();
        assert_eq!(c.get(0, 0), None);
        assert_eq!(c.get(1, 1), Some(1));

        engine
            .mxm(&mut c, Some(&mask), &PLUS_TIMES, &a, &a, &Descriptor::new().structural())
            .unwrap();
        assert_eq!(c.get(0, 0), Some(1));
    }

    #[test]
    fn test_mxm_pair_ignores_values() {
        let engine = CsrEngine::new();
        let a = dense(&engine, 2, &[(0, 1, -9), (1, 0, 42)]);
        let mut c = engine.new_matrix(ElementType::Int64, 2, 2).unwrap();
        engine.mxm(&mut c, None, &PLUS_PAIR, &a, &a, &Descriptor::new()).unwrap();
        assert_eq!(c.get(0, 0), Some(1));
        assert_eq!(c.get(1, 1), Some(1));
    }

    #[test]
    fn test_mxm_pair_unsupported_without_capability() {
        let engine = CsrEngine::with_capabilities(EngineCapabilities::BASIC);
        let a = dense(&engine, 2, &[(0, 1, 1)]);
        let mut c = engine.new_matrix(ElementType::Int64, 2, 2).unwrap();
        let err = engine.mxm(&mut c, None, &PLUS_PAIR, &a, &a, &Descriptor::new()).unwrap_err();
        assert!(matches!(err, EngineError::Unsupported(_)));
    }

    #[test]
    fn test_mxm_replace_versus_accumulate() {
        let engine = CsrEngine::new();
        let a = dense(&engine, 2, &[(0, 0, 2)]);
        let mut c = dense(&engine, 2, &[(0, 0, 10), (1, 1, 3)]);

        engine
            .mxm(&mut c, None, &PLUS_TIMES, &a, &a, &Descriptor::new().accumulate())
            .unwrap();
        assert_eq!(c.get(0, 0), Some(14));
        assert_eq!(c.get(1, 1), Some(3));

        engine.mxm(&mut c, None, &PLUS_TIMES, &a, &a, &Descriptor::new()).unwrap();
        assert_eq!(c.get(0, 0), Some(4));
        assert_eq!(c.get(1, 1), None);
    }

    #[test]
    fn test_mxm_transpose_first() {
        let engine = CsrEngine::new();
        let a = dense(&engine, 2, &[(0, 1, 3)]);
        let b = dense(&engine, 2, &[(0, 0, 2)]);
        let mut c = engine.new_matrix(ElementType::Int64, 2, 2).unwrap();
        // a' = [[0 0] [3 0]], a' * b = [[0 0] [6 0]]
        engine
            .mxm(&mut c, None, &PLUS_TIMES, &a, &b, &Descriptor::new().transpose_first())
            .unwrap();
        assert_eq!(c.get(1, 0), Some(6));
        assert_eq!(c.nvals(), 1);
    }

    #[test]
    fn test_mxm_dimension_mismatch() {
        let engine = CsrEngine::new();
        let a = engine.new_matrix(ElementType::Int64, 2, 3).unwrap();
        let b = engine.new_matrix(ElementType::Int64, 2, 2).unwrap();
        let mut c = engine.new_matrix(ElementType::Int64, 2, 2).unwrap();
        let err = engine.mxm(&mut c, None, &PLUS_TIMES, &a, &b, &Descriptor::new()).unwrap_err();
        assert!(matches!(err, EngineError::DimensionMismatch(_)));
    }

    #[test]
    fn test_apply_and_reduce() {
        let engine = CsrEngine::new();
        let a = dense(&engine, 3, &[(0, 1, 5), (1, 2, -2), (2, 0, 0)]);
        assert_eq!(engine.reduce(&PLUS, &a).unwrap(), 3);

        let mut ones = engine.new_matrix(ElementType::Int64, 3, 3).unwrap();
        engine.apply(&mut ones, UnaryOp::One, &a).unwrap();
        assert_eq!(engine.reduce(&PLUS, &ones).unwrap(), 3);

        let mut nonzero = engine.new_matrix(ElementType::Int64, 3, 3).unwrap();
        engine.apply(&mut nonzero, UnaryOp::IsNonZero, &a).unwrap();
        assert_eq!(engine.reduce(&PLUS, &nonzero).unwrap(), 2);
        assert!(nonzero.same_structure(&a));
    }

    #[test]
    fn test_extract_tuples_row_major() {
        let engine = CsrEngine::new();
        let a = dense(&engine, 3, &[(2, 1, 7), (0, 2, 1)]);
        let (mut rows, mut cols, mut vals) = (Vec::new(), Vec::new(), Vec::new());
        engine.extract_tuples(&a, &mut rows, &mut cols, &mut vals).unwrap();
        assert_eq!(rows, vec![0, 2]);
        assert_eq!(cols, vec![2, 1]);
        assert_eq!(vals, vec![1, 7]);
    }

    #[test]
    fn test_symmetric_adjacency_skips_loops() {
        let engine = CsrEngine::new();
        let a = engine.symmetric_adjacency(3, &[(0, 1), (1, 0), (2, 2), (1, 2)]).unwrap();
        assert_eq!(a.nvals(), 4);
        assert_eq!(a.get(1, 0), Some(1));
        assert!(!a.contains(2, 2));
    }

    #[test]
    fn test_live_matrix_tracking() {
        let engine = CsrEngine::new();
        assert_eq!(engine.live_matrices(), 0);
        let a = engine.new_matrix(ElementType::Bool, 4, 4).unwrap();
        let t = engine.transpose(&a).unwrap();
        assert_eq!(engine.live_matrices(), 2);
        drop(a);
        drop(t);
        assert_eq!(engine.live_matrices(), 0);
    }

    #[test]
    fn test_fault_plan() {
        let engine =
            CsrEngine::new().with_fault_plan(FaultPlan::fail(Primitive::NewMatrix).after(1));
        let first = engine.new_matrix(ElementType::Bool, 2, 2);
        assert!(first.is_ok());
        let err = engine.new_matrix(ElementType::Bool, 2, 2).unwrap_err();
        assert_eq!(err, EngineError::Injected(Primitive::NewMatrix));

        let oom =
            CsrEngine::new().with_fault_plan(FaultPlan::fail(Primitive::Reduce).out_of_memory());
        let a = oom.symmetric_adjacency(2, &[(0, 1)]).unwrap();
        assert!(matches!(oom.reduce(&PLUS, &a), Err(EngineError::OutOfMemory(_))));
    }
}
