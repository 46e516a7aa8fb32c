//! Labelled row-major view over a grid of real-valued points.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::errors::{AdoError, ErrorInfo};

/// Matrix of grid points where each row is one point and each column is a
/// named variable. Models read columns by label so parameter order is never
/// implied by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridFrame {
    labels: Vec<String>,
    values: DMatrix<f64>,
}

impl GridFrame {
    /// Creates a frame; `values` must have one column per label.
    pub fn new(labels: Vec<String>, values: DMatrix<f64>) -> Result<Self, AdoError> {
        if labels.len() != values.ncols() {
            return Err(AdoError::Config(
                ErrorInfo::new("frame-shape", "label count does not match column count")
                    .with_context("labels", labels.len().to_string())
                    .with_context("columns", values.ncols().to_string()),
            ));
        }
        Ok(Self { labels, values })
    }

    /// Builds a frame from row vectors.
    pub fn from_rows(labels: Vec<String>, rows: &[Vec<f64>]) -> Result<Self, AdoError> {
        let width = labels.len();
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != width) {
            return Err(AdoError::Config(
                ErrorInfo::new("frame-row-width", "row width does not match label count")
                    .with_context("row", idx.to_string())
                    .with_context("width", row.len().to_string())
                    .with_context("expected", width.to_string()),
            ));
        }
        let values = DMatrix::from_fn(rows.len(), width, |i, j| rows[i][j]);
        Self::new(labels, values)
    }

    /// Number of points (rows).
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    /// Returns true when the frame holds no points.
    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    /// Number of variables (columns).
    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    /// Column labels in order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Underlying `len × width` matrix.
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Position of the column called `label`.
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// Contiguous slice holding the column called `label`.
    pub fn column(&self, label: &str) -> Result<&[f64], AdoError> {
        let idx = self.column_index(label).ok_or_else(|| {
            AdoError::Config(
                ErrorInfo::new("frame-missing-column", "grid has no column with this label")
                    .with_context("label", label)
                    .with_context("available", self.labels.join(",")),
            )
        })?;
        let rows = self.values.nrows();
        // DMatrix storage is column-major.
        Ok(&self.values.as_slice()[idx * rows..(idx + 1) * rows])
    }

    /// Copies row `index` into a vector.
    pub fn row(&self, index: usize) -> Vec<f64> {
        self.values.row(index).iter().copied().collect()
    }

    /// Iterates over rows as owned vectors.
    pub fn rows(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        (0..self.len()).map(move |idx| self.row(idx))
    }
}

/// Evaluates `cell(design_row, param_row)` over every pair of rows, producing
/// the `N_D × N_Θ` matrix a likelihood slice is made of.
pub fn broadcast<F>(designs: &GridFrame, params: &GridFrame, cell: F) -> DMatrix<f64>
where
    F: Fn(usize, usize) -> f64,
{
    DMatrix::from_fn(designs.len(), params.len(), cell)
}
