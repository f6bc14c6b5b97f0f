//! Named numeric matrix used between transform stages.

use std::collections::{HashMap, HashSet};

use nalgebra::DMatrix;

use crate::error::TransformError;

/// Column names plus a row-major view over an `nrows × ncols` matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    pub columns: Vec<String>,
    pub data: DMatrix<f64>,
}

impl FeatureFrame {
    /// Build from row vectors; every row must have `columns.len()` values.
    pub fn from_rows(columns: Vec<String>, rows: &[Vec<f64>]) -> Result<Self, TransformError> {
        let ncols = columns.len();
        let mut flat = Vec::with_capacity(rows.len() * ncols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != ncols {
                return Err(TransformError::ColumnMismatch(format!(
                    "row {i} has {} values, expected {ncols}",
                    row.len()
                )));
            }
            flat.extend_from_slice(row);
        }
        Ok(Self {
            columns,
            data: DMatrix::from_row_slice(rows.len(), ncols, &flat),
        })
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn column_values(&self, j: usize) -> Vec<f64> {
        self.data.column(j).iter().copied().collect()
    }

    /// Keep only the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            data: self.data.select_rows(rows.iter()),
        }
    }
}

/// Align a named vector to `canonical`: missing names become `0`, extra names are dropped.
pub fn reindex(values: &[(String, f64)], canonical: &[String]) -> Result<Vec<f64>, TransformError> {
    validate_order(canonical)?;
    let lookup: HashMap<&str, f64> = values.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    let out: Vec<f64> = canonical
        .iter()
        .map(|name| lookup.get(name.as_str()).copied().unwrap_or(0.0))
        .collect();
    if out.len() != canonical.len() {
        return Err(TransformError::ColumnMismatch(format!(
            "reindexed width {} != canonical width {}",
            out.len(),
            canonical.len()
        )));
    }
    Ok(out)
}

/// A canonical order must be non-empty and free of duplicates.
pub fn validate_order(canonical: &[String]) -> Result<(), TransformError> {
    if canonical.is_empty() {
        return Err(TransformError::ColumnMismatch("canonical column order is empty".to_string()));
    }
    let mut seen = HashSet::with_capacity(canonical.len());
    for name in canonical {
        if !seen.insert(name.as_str()) {
            return Err(TransformError::ColumnMismatch(format!("duplicate column `{name}`")));
        }
    }
    Ok(())
}
