//! Compressed Sparse Row matrix storage

use crate::ops::ElementType;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Registers a matrix with its engine's live counter for as long as it exists
#[derive(Debug)]
pub(crate) struct LiveToken(Arc<AtomicUsize>);

impl LiveToken {
    pub(crate) fn acquire(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        LiveToken(Arc::clone(counter))
    }
}

impl Drop for LiveToken {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A sparse matrix in Compressed Sparse Row (CSR) format.
///
/// Column indices are sorted and unique within each row. Values are stored
/// in the representation of the matrix's [`ElementType`].
#[derive(Debug)]
pub struct SparseMatrix {
    dtype: ElementType,
    nrows: usize,
    ncols: usize,
    /// Offsets into `col_idx`. Size = nrows + 1
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<i64>,
    _live: LiveToken,
}

impl SparseMatrix {
    pub(crate) fn empty(
        dtype: ElementType,
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        live: LiveToken,
    ) -> Self {
        SparseMatrix {
            dtype,
            nrows,
            ncols,
            row_ptr,
            col_idx: Vec::new(),
            values: Vec::new(),
            _live: live,
        }
    }

    /// Replace the stored entries, casting values to this matrix's type
    pub(crate) fn set_contents(
        &mut self,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        mut values: Vec<i64>,
    ) {
        debug_assert_eq!(row_ptr.len(), self.nrows + 1);
        debug_assert_eq!(col_idx.len(), values.len());
        for v in values.iter_mut() {
            *v = self.dtype.cast(*v);
        }
        self.row_ptr = row_ptr;
        self.col_idx = col_idx;
        self.values = values;
    }

    pub fn dtype(&self) -> ElementType {
        self.dtype
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of stored entries
    pub fn nvals(&self) -> usize {
        self.col_idx.len()
    }

    pub(crate) fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    pub(crate) fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    pub(crate) fn values(&self) -> &[i64] {
        &self.values
    }

    /// Column indices and values of row `i`
    pub fn row(&self, i: usize) -> (&[usize], &[i64]) {
        let start = self.row_ptr[i];
        let end = self.row_ptr[i + 1];
        (&self.col_idx[start..end], &self.values[start..end])
    }

    /// Stored value at (i, j), if any
    pub fn get(&self, i: usize, j: usize) -> Option<i64> {
        if i >= self.nrows {
            return None;
        }
        let (cols, vals) = self.row(i);
        cols.binary_search(&j).ok().map(|k| vals[k])
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.get(i, j).is_some()
    }

    /// Iterate over (row, col, value) in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, i64)> + '_ {
        (0..self.nrows).flat_map(move |i| {
            let (cols, vals) = self.row(i);
            cols.iter().zip(vals.iter()).map(move |(&j, &v)| (i, j, v))
        })
    }

    /// True if both matrices have the same dimensions and entry positions
    pub fn same_structure(&self, other: &SparseMatrix) -> bool {
        self.nrows == other.nrows
            && self.ncols == other.ncols
            && self.row_ptr == other.row_ptr
            && self.col_idx == other.col_idx
    }
}
