//! Per-column standardisation: `(x - mean) / std`.
//!
//! Fitted once on the regression feature matrix, then read-only: `transform`
//! takes `&self`, so applying it can never move the parameters.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::TransformError;
use crate::math::mean_std;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScaler {
    pub means: Vec<f64>,
    /// Population standard deviations as fitted (zero for constant columns).
    pub stds: Vec<f64>,
}

impl FittedScaler {
    pub fn fit(x: &DMatrix<f64>) -> Result<Self, TransformError> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(TransformError::ColumnMismatch(
                "cannot fit a scaler on an empty matrix".to_string(),
            ));
        }
        let mut means = Vec::with_capacity(x.ncols());
        let mut stds = Vec::with_capacity(x.ncols());
        for col in x.column_iter() {
            let values: Vec<f64> = col.iter().copied().collect();
            let (m, s) = mean_std(&values).unwrap_or((0.0, 0.0));
            means.push(m);
            stds.push(s);
        }
        Ok(Self { means, stds })
    }

    pub fn width(&self) -> usize {
        self.means.len()
    }

    /// Divisor used for column `j`; constant columns are only centred.
    fn scale(&self, j: usize) -> f64 {
        let s = self.stds[j];
        if s > 0.0 && s.is_finite() { s } else { 1.0 }
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, TransformError> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .enumerate()
            .map(|(j, v)| (v - self.means[j]) / self.scale(j))
            .collect())
    }

    pub fn transform(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>, TransformError> {
        self.check_width(x.ncols())?;
        let mut out = x.clone();
        for (j, mut col) in out.column_iter_mut().enumerate() {
            let (m, s) = (self.means[j], self.scale(j));
            col.apply(|v| *v = (*v - m) / s);
        }
        Ok(out)
    }

    fn check_width(&self, n: usize) -> Result<(), TransformError> {
        if n != self.width() {
            return Err(TransformError::ColumnMismatch(format!(
                "scaler fitted on {} columns, got {n}",
                self.width()
            )));
        }
        Ok(())
    }
}
