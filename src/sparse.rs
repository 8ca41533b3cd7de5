//! Compressed sparse row matrix.
//!
//! Just enough CSR to hold a design matrix: build from dense per-trial
//! blocks, stack vertically, read back entries or dense row ranges, and
//! multiply by a weight vector.
use std::ops::Range;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::error::{GlmError, Result};

/// CSR matrix of `f64`.
///
/// Row `r` holds the entries `data[indptr[r]..indptr[r + 1]]` at columns
/// `indices[indptr[r]..indptr[r + 1]]`, columns ascending within a row.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl CsrMatrix {
    /// All-zero matrix.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            indptr: vec![0; nrows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Compress a dense matrix, dropping exact zeros.
    pub fn from_dense(a: ArrayView2<'_, f64>) -> Self {
        let (nrows, ncols) = a.dim();
        let mut indptr = Vec::with_capacity(nrows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for row in a.rows() {
            for (c, &v) in row.iter().enumerate() {
                if v != 0.0 {
                    indices.push(c);
                    data.push(v);
                }
            }
            indptr.push(indices.len());
        }
        Self { nrows, ncols, indptr, indices, data }
    }

    /// Stack `blocks` on top of each other. Every block must have `ncols` columns.
    pub fn vstack(ncols: usize, blocks: &[CsrMatrix]) -> Result<Self> {
        let mut out = Self::zeros(0, ncols);
        let nnz = blocks.iter().map(|b| b.nnz()).sum();
        out.indices.reserve(nnz);
        out.data.reserve(nnz);
        for b in blocks {
            if b.ncols != ncols {
                return Err(GlmError::ShapeMismatch {
                    expected: vec![b.nrows, ncols],
                    actual: vec![b.nrows, b.ncols],
                });
            }
            let base = out.indices.len();
            out.indptr.extend(b.indptr[1..].iter().map(|p| p + base));
            out.indices.extend_from_slice(&b.indices);
            out.data.extend_from_slice(&b.data);
            out.nrows += b.nrows;
        }
        Ok(out)
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Number of stored (non-zero) entries.
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Column indices and values of row `r`.
    pub fn row(&self, r: usize) -> (&[usize], &[f64]) {
        let span = self.indptr[r]..self.indptr[r + 1];
        (&self.indices[span.clone()], &self.data[span])
    }

    /// Entry `(r, c)`; zero when not stored.
    pub fn get(&self, r: usize, c: usize) -> f64 {
        let (cols, vals) = self.row(r);
        cols.binary_search(&c).map_or(0.0, |i| vals[i])
    }

    /// Dense copy of rows `rows`.
    pub fn dense_rows(&self, rows: Range<usize>) -> Array2<f64> {
        let mut out = Array2::<f64>::zeros((rows.len(), self.ncols));
        for (i, r) in rows.enumerate() {
            let (cols, vals) = self.row(r);
            for (&c, &v) in cols.iter().zip(vals) {
                out[[i, c]] = v;
            }
        }
        out
    }

    /// Dense copy of the whole matrix.
    pub fn to_dense(&self) -> Array2<f64> {
        self.dense_rows(0..self.nrows)
    }

    /// Matrix-vector product `self · w`.
    pub fn dot(&self, w: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        if w.len() != self.ncols {
            return Err(GlmError::ShapeMismatch {
                expected: vec![self.ncols],
                actual: vec![w.len()],
            });
        }
        Ok(Array1::from_shape_fn(self.nrows, |r| {
            let (cols, vals) = self.row(r);
            cols.iter().zip(vals).map(|(&c, &v)| v * w[c]).sum()
        }))
    }
}
