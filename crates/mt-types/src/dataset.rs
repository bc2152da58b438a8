//! Tabular datasets and problem types.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::errors::{DataError, MtError, MtResult};

/// Whether the tuned model predicts class labels or continuous values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProblemType {
    Classification,
    Regression,
}

impl ProblemType {
    /// Check that `target` is usable for this problem type.
    ///
    /// Classification labels must be finite, integer-valued floats; regression
    /// targets only need to be finite.
    pub fn check_target(&self, target: ArrayView1<'_, f64>) -> MtResult<()> {
        for &value in target.iter() {
            let valid = match self {
                Self::Classification => value.is_finite() && value.fract() == 0.0,
                Self::Regression => value.is_finite(),
            };
            if !valid {
                return Err(DataError::InvalidLabel { value }.into());
            }
        }
        Ok(())
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classification => write!(f, "Classification"),
            Self::Regression => write!(f, "Regression"),
        }
    }
}

impl FromStr for ProblemType {
    type Err = MtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classification" => Ok(Self::Classification),
            "regression" => Ok(Self::Regression),
            other => Err(crate::validation_error!("unknown problem type: {other}")),
        }
    }
}

/// A dense numeric table with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    data: Array2<f64>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, data: Array2<f64>) -> MtResult<Self> {
        if columns.len() != data.ncols() {
            return Err(DataError::ShapeMismatch {
                message: format!(
                    "{} column names for {} data columns",
                    columns.len(),
                    data.ncols()
                ),
            }
            .into());
        }

        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(crate::validation_error!("duplicate column name: {name}"));
            }
        }

        Ok(Self { columns, data })
    }

    /// Build a dataset from row-major values.
    pub fn from_rows(columns: Vec<String>, rows: &[Vec<f64>]) -> MtResult<Self> {
        let width = columns.len();
        let mut flat = Vec::with_capacity(rows.len() * width);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(DataError::ShapeMismatch {
                    message: format!("row {i} has {} values, expected {width}", row.len()),
                }
                .into());
            }
            flat.extend_from_slice(row);
        }

        let data = Array2::from_shape_vec((rows.len(), width), flat).map_err(|e| {
            DataError::ShapeMismatch {
                message: e.to_string(),
            }
        })?;
        Self::new(columns, data)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.data.ncols()
    }

    pub fn column_index(&self, name: &str) -> MtResult<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| {
                DataError::ColumnNotFound {
                    column: name.to_string(),
                }
                .into()
            })
    }

    /// Separate the feature matrix from the `target` column.
    pub fn split_target(&self, target: &str) -> MtResult<(Array2<f64>, Array1<f64>)> {
        let target_idx = self.column_index(target)?;
        let feature_idx: Vec<usize> = (0..self.n_columns()).filter(|&i| i != target_idx).collect();

        if feature_idx.is_empty() {
            return Err(DataError::InsufficientData {
                message: format!("dataset has no feature columns besides {target}"),
            }
            .into());
        }

        let features = self.data.select(Axis(1), &feature_idx);
        let labels = self.data.column(target_idx).to_owned();
        Ok((features, labels))
    }
}
