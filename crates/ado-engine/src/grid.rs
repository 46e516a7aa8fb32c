use ado_core::errors::ErrorInfo;
use ado_core::{AdoError, GridFrame, ModelDescriptor, Task};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::numerics;

/// Cartesian grid of candidate designs. Rows follow the task's design order
/// with the first variable varying slowest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignGrid {
    frame: GridFrame,
    axes: Vec<Vec<f64>>,
}

impl DesignGrid {
    /// Builds the design grid declared by `task` from per-variable values.
    pub fn build(task: &Task, values: &IndexMap<String, Vec<f64>>) -> Result<Self, AdoError> {
        let axes = collect_axes("design", task.designs(), values)?;
        let slices: Vec<&[f64]> = axes.iter().map(Vec::as_slice).collect();
        let frame = GridFrame::new(
            task.designs().to_vec(),
            numerics::cartesian_product(&slices),
        )?;
        Ok(Self { frame, axes })
    }

    /// Labelled matrix of design rows.
    pub fn frame(&self) -> &GridFrame {
        &self.frame
    }

    /// Number of design rows.
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    /// Always false for a constructed grid; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Values of each design variable in declaration order.
    pub fn axes(&self) -> &[Vec<f64>] {
        &self.axes
    }

    /// Length of each axis.
    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(Vec::len).collect()
    }

    /// Copies design row `index`.
    pub fn row(&self, index: usize) -> Vec<f64> {
        self.frame.row(index)
    }

    /// Grid row nearest to `point` in Euclidean distance.
    pub fn nearest(&self, point: &[f64]) -> Result<usize, AdoError> {
        if point.len() != self.frame.width() {
            return Err(AdoError::Domain(
                ErrorInfo::new("design-dimension", "design vector has the wrong length")
                    .with_context("expected", self.frame.width().to_string())
                    .with_context("actual", point.len().to_string()),
            ));
        }
        if let Some((idx, value)) = point.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(AdoError::Domain(
                ErrorInfo::new("design-non-finite", "design coordinate is not finite")
                    .with_context("variable", self.frame.labels()[idx].clone())
                    .with_context("value", value.to_string()),
            ));
        }
        numerics::nearest_row(self.frame.values(), point).ok_or_else(|| {
            AdoError::Config(ErrorInfo::new("design-grid-empty", "design grid is empty"))
        })
    }
}

/// Cartesian grid of parameter vectors, restricted to admissible rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    frame: GridFrame,
    dropped: usize,
}

impl ParamGrid {
    /// Builds the parameter grid declared by `model`, dropping inadmissible rows.
    pub fn build(
        model: &ModelDescriptor,
        values: &IndexMap<String, Vec<f64>>,
    ) -> Result<Self, AdoError> {
        let axes = collect_axes("parameter", model.params(), values)?;
        let slices: Vec<&[f64]> = axes.iter().map(Vec::as_slice).collect();
        let full = numerics::cartesian_product(&slices);

        let mut kept = Vec::with_capacity(full.nrows());
        let mut first_rejection: Option<String> = None;
        for row in full.row_iter() {
            let row: Vec<f64> = row.iter().copied().collect();
            match model.first_violation(&row) {
                None => kept.push(row),
                Some(name) => {
                    first_rejection.get_or_insert_with(|| name.to_string());
                }
            }
        }
        let dropped = full.nrows() - kept.len();
        if kept.is_empty() {
            let mut info = ErrorInfo::new(
                "param-grid-empty",
                "no parameter row satisfies the admissibility predicates",
            )
            .with_context("model", model.name());
            if let Some(name) = first_rejection {
                info = info.with_context("variable", name);
            }
            return Err(AdoError::Config(info));
        }
        let frame = GridFrame::from_rows(model.params().to_vec(), &kept)?;
        Ok(Self { frame, dropped })
    }

    /// Labelled matrix of parameter rows.
    pub fn frame(&self) -> &GridFrame {
        &self.frame
    }

    /// Number of admissible parameter rows.
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    /// Always false for a constructed grid; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Number of Cartesian rows removed by admissibility filtering.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Copies parameter row `index`.
    pub fn row(&self, index: usize) -> Vec<f64> {
        self.frame.row(index)
    }

    /// Index of the row equal to `values` (within `1e-12` per coordinate).
    pub fn position(&self, values: &[f64]) -> Option<usize> {
        if values.len() != self.frame.width() {
            return None;
        }
        self.frame.rows().position(|row| {
            row.iter()
                .zip(values.iter())
                .all(|(a, b)| (a - b).abs() <= 1e-12)
        })
    }
}

fn collect_axes(
    kind: &str,
    names: &[String],
    values: &IndexMap<String, Vec<f64>>,
) -> Result<Vec<Vec<f64>>, AdoError> {
    if let Some(unknown) = values.keys().find(|key| !names.contains(*key)) {
        return Err(AdoError::Config(
            ErrorInfo::new("grid-unknown-variable", format!("grid names an undeclared {kind}"))
                .with_context("variable", unknown.clone())
                .with_context("declared", names.join(",")),
        ));
    }
    let mut axes = Vec::with_capacity(names.len());
    for name in names {
        let axis = values.get(name).ok_or_else(|| {
            AdoError::Config(
                ErrorInfo::new("grid-missing-variable", format!("no grid values for {kind}"))
                    .with_context("variable", name.clone()),
            )
        })?;
        if axis.is_empty() {
            return Err(AdoError::Config(
                ErrorInfo::new("grid-empty", format!("{kind} grid has no values"))
                    .with_context("variable", name.clone()),
            ));
        }
        if let Some(bad) = axis.iter().find(|v| !v.is_finite()) {
            return Err(AdoError::Config(
                ErrorInfo::new("grid-non-finite", format!("{kind} grid value is not finite"))
                    .with_context("variable", name.clone())
                    .with_context("value", bad.to_string()),
            ));
        }
        axes.push(axis.clone());
    }
    Ok(axes)
}
