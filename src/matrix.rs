//! Dense row-major matrices.
//!
//! Batches are laid out `features × batch_size`: each example is a column.
//! Weight matrices are `(fan_in + 1) × fan_out`, row 0 holding the bias.

use crate::matmul::View;
use crate::{Error, Result};

/// A dense `rows × cols` matrix of `f64` stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// All-zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    /// Matrix with every entry set to `value`.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Wrap a row-major buffer.
    ///
    /// Returns `Error::Shape` if either dimension is zero or `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::Shape(format!(
                "matrix dims must be > 0, got {rows}x{cols}"
            )));
        }
        let expected = rows
            .checked_mul(cols)
            .ok_or_else(|| Error::Shape("matrix shape overflow".to_owned()))?;
        if data.len() != expected {
            return Err(Error::Shape(format!(
                "buffer length {} does not match {rows}x{cols}",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build a `features × batch` matrix from per-example columns.
    pub fn from_columns(columns: &[Vec<f64>]) -> Result<Self> {
        let Some(first) = columns.first() else {
            return Err(Error::Shape("at least one column is required".to_owned()));
        };
        let rows = first.len();
        if rows == 0 {
            return Err(Error::Shape("columns must not be empty".to_owned()));
        }
        for (j, col) in columns.iter().enumerate() {
            if col.len() != rows {
                return Err(Error::Shape(format!(
                    "column {j} has len {}, expected {rows}",
                    col.len()
                )));
            }
        }

        let cols = columns.len();
        let mut m = Self::zeros(rows, cols);
        for (j, col) in columns.iter().enumerate() {
            for (i, &v) in col.iter().enumerate() {
                m.data[i * cols + j] = v;
            }
        }
        Ok(m)
    }

    /// One-hot label matrix: `num_classes × labels.len()`.
    pub fn one_hot(labels: &[usize], num_classes: usize) -> Result<Self> {
        if labels.is_empty() || num_classes == 0 {
            return Err(Error::Shape(
                "one_hot needs at least one label and one class".to_owned(),
            ));
        }
        let mut m = Self::zeros(num_classes, labels.len());
        for (j, &class) in labels.iter().enumerate() {
            if class >= num_classes {
                return Err(Error::Shape(format!(
                    "label {class} at column {j} is out of range for {num_classes} classes"
                )));
            }
            m.data[class * labels.len() + j] = 1.0;
        }
        Ok(m)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    #[inline]
    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut f64> {
        if row < self.rows && col < self.cols {
            Some(&mut self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Copy of column `col`.
    ///
    /// Panics if `col >= cols`.
    pub fn column(&self, col: usize) -> Vec<f64> {
        assert!(col < self.cols, "column {col} out of range");
        (0..self.rows)
            .map(|r| self.data[r * self.cols + col])
            .collect()
    }

    /// Index of the largest entry in each column.
    pub fn argmax_columns(&self) -> Vec<usize> {
        (0..self.cols)
            .map(|c| {
                let mut best = 0;
                for r in 1..self.rows {
                    if self.data[r * self.cols + c] > self.data[best * self.cols + c] {
                        best = r;
                    }
                }
                best
            })
            .collect()
    }

    /// New matrix with a row of ones prepended (the bias trick).
    pub fn with_bias_row(&self) -> Self {
        let mut data = Vec::with_capacity((self.rows + 1) * self.cols);
        data.resize(self.cols, 1.0);
        data.extend_from_slice(&self.data);
        Self {
            rows: self.rows + 1,
            cols: self.cols,
            data,
        }
    }

    /// Elementwise `self *= other`.
    pub fn hadamard_in_place(&mut self, other: &Matrix) {
        debug_assert_eq!(self.shape(), other.shape());
        for (a, &b) in self.data.iter_mut().zip(&other.data) {
            *a *= b;
        }
    }

    pub fn map_in_place(&mut self, f: impl Fn(f64) -> f64) {
        for v in &mut self.data {
            *v = f(*v);
        }
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        let mut out = self.clone();
        out.map_in_place(f);
        out
    }

    /// Elementwise `self - other`.
    pub fn sub(&self, other: &Matrix) -> Result<Self> {
        if self.shape() != other.shape() {
            return Err(Error::Shape(format!(
                "cannot subtract {}x{} from {}x{}",
                other.rows, other.cols, self.rows, self.cols
            )));
        }
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a - b)
            .collect();
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn frobenius_norm(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    #[inline]
    pub(crate) fn view(&self) -> View<'_> {
        View {
            rows: self.rows,
            cols: self.cols,
            data: &self.data,
        }
    }

    /// View of rows `start..`. Used to drop the bias row of a weight matrix.
    #[inline]
    pub(crate) fn rows_from(&self, start: usize) -> View<'_> {
        debug_assert!(start <= self.rows);
        View {
            rows: self.rows - start,
            cols: self.cols,
            data: &self.data[start * self.cols..],
        }
    }
}
