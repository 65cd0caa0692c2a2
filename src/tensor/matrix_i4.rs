use core::fmt;

use crate::arc::quantization::is_int4;
use crate::error::{TpuError, TpuResult};

/// A row-major int4 weight matrix, one value per `i8`.
///
/// Every element is guaranteed to lie in [-8, 7]; construction fails otherwise.
/// The matrix is immutable once built.
#[derive(Clone, PartialEq, Eq)]
pub struct MatrixI4 {
    rows: usize,
    cols: usize,
    data: Vec<i8>,
}

impl MatrixI4 {
    /// Build from row-major values. `name` identifies the tensor in errors.
    pub fn new(name: &str, rows: usize, cols: usize, data: Vec<i8>) -> TpuResult<Self> {
        if data.len() != rows * cols {
            return Err(TpuError::shape(name, vec![rows, cols], vec![data.len()]));
        }
        if let Some((index, &value)) = data.iter().enumerate().find(|(_, &v)| !is_int4(v as i64)) {
            return Err(TpuError::Range { name: name.to_string(), index, value: value as i64 });
        }
        Ok(MatrixI4 { rows, cols, data })
    }

    /// Build from wide integers, range-checking before narrowing.
    pub fn from_i64(name: &str, rows: usize, cols: usize, values: &[i64]) -> TpuResult<Self> {
        if values.len() != rows * cols {
            return Err(TpuError::shape(name, vec![rows, cols], vec![values.len()]));
        }
        if let Some((index, &value)) = values.iter().enumerate().find(|(_, &v)| !is_int4(v)) {
            return Err(TpuError::Range { name: name.to_string(), index, value });
        }
        let data = values.iter().map(|&v| v as i8).collect();
        Ok(MatrixI4 { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    pub fn row(&self, row: usize) -> &[i8] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Row-major flat view.
    pub fn as_slice(&self) -> &[i8] {
        &self.data
    }

    pub fn num_elements(&self) -> usize {
        self.data.len()
    }

    pub fn min(&self) -> i8 {
        self.data.iter().copied().min().unwrap_or(0)
    }

    pub fn max(&self) -> i8 {
        self.data.iter().copied().max().unwrap_or(0)
    }
}

impl fmt::Debug for MatrixI4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MatrixI4({}x{})", self.rows, self.cols)
    }
}

impl fmt::Display for MatrixI4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} (i4)", self.rows, self.cols)
    }
}
