//! Compressed sparse row matrices.
//!
//! Tree adjacency has one non-zero per non-root row, so a CSR layout keeps
//! matrix-vector products linear in the number of nodes.

use nalgebra::DVector;

/// Compressed Sparse Row (CSR) matrix.
///
/// Stores a sparse matrix in CSR format for efficient matrix-vector multiplication.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    /// Number of rows.
    rows: usize,
    /// Number of columns.
    cols: usize,
    /// Row pointers: row_ptr[i] is the index in col_idx/values where row i starts.
    /// Length is rows + 1, with row_ptr[rows] = nnz.
    row_ptr: Vec<usize>,
    /// Column indices for each non-zero value.
    col_idx: Vec<usize>,
    /// Non-zero values.
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Create a CSR matrix from triplets (row, col, value).
    ///
    /// Duplicate entries at the same (row, col) are summed.
    pub fn from_triplets(rows: usize, cols: usize, mut triplets: Vec<(usize, usize, f64)>) -> Self {
        triplets.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut row_ptr = vec![0usize; rows + 1];
        let mut col_idx: Vec<usize> = Vec::with_capacity(triplets.len());
        let mut values: Vec<f64> = Vec::with_capacity(triplets.len());
        let mut last: Option<(usize, usize)> = None;

        for (row, col, val) in triplets {
            debug_assert!(row < rows && col < cols, "triplet ({}, {}) out of bounds", row, col);
            if last == Some((row, col)) {
                // Same position: accumulate value
                if let Some(acc) = values.last_mut() {
                    *acc += val;
                }
                continue;
            }
            col_idx.push(col);
            values.push(val);
            row_ptr[row + 1] += 1;
            last = Some((row, col));
        }

        // Prefix sum turns per-row counts into offsets
        for r in 0..rows {
            row_ptr[r + 1] += row_ptr[r];
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Get the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Get the number of non-zero entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored entries of one row as `(col, value)` pairs.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        self.col_idx[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Value at (row, col), zero when not stored.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.row(row)
            .find(|&(c, _)| c == col)
            .map_or(0.0, |(_, v)| v)
    }

    /// Return `self * diag(scale)`: column j multiplied by `scale[j]`.
    pub fn scale_columns(&self, scale: &[f64]) -> CsrMatrix {
        assert_eq!(scale.len(), self.cols, "Scale dimension mismatch");

        let values = self
            .col_idx
            .iter()
            .zip(&self.values)
            .map(|(&c, &v)| v * scale[c])
            .collect();

        Self {
            values,
            ..self.clone()
        }
    }

    /// Multiply matrix by vector: y = A * x.
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        assert_eq!(x.len(), self.cols, "Vector dimension mismatch");

        let mut y = DVector::zeros(self.rows);

        for i in 0..self.rows {
            let start = self.row_ptr[i];
            let end = self.row_ptr[i + 1];

            let mut sum = 0.0;
            for k in start..end {
                sum += self.values[k] * x[self.col_idx[k]];
            }
            y[i] = sum;
        }

        y
    }
}
