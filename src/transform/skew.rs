//! Skewness correction.
//!
//! A column whose sample skewness exceeds `SKEW_THRESHOLD` is mapped through
//! `ln(1 + x + shift)`, where `shift = 1 - min` when the fitted column holds
//! any non-positive value and `0` otherwise. The table is fitted once and
//! replayed verbatim at inference; skewness of a single record is undefined.

use serde::{Deserialize, Serialize};

use crate::error::TransformError;
use crate::math::skewness;
use crate::transform::features::is_indicator;
use crate::transform::frame::FeatureFrame;

pub const SKEW_THRESHOLD: f64 = 1.0;

/// Correction parameters for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkewEntry {
    pub column: String,
    /// Skewness observed at fit time (diagnostic only).
    pub skewness: f64,
    pub corrected: bool,
    pub shift: f64,
}

impl SkewEntry {
    /// Decide whether and how to correct a column from its fit-time values.
    pub fn fit(column: impl Into<String>, values: &[f64]) -> Self {
        let column = column.into();
        let skew = skewness(values);
        if skew <= SKEW_THRESHOLD {
            return Self::identity(column, skew);
        }
        let min = values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(f64::INFINITY, f64::min);
        let shift = if min <= 0.0 { 1.0 - min } else { 0.0 };
        Self {
            column,
            skewness: skew,
            corrected: true,
            shift,
        }
    }

    pub fn identity(column: impl Into<String>, skewness: f64) -> Self {
        Self {
            column: column.into(),
            skewness,
            corrected: false,
            shift: 0.0,
        }
    }

    /// Forward transform. Values below the fitted floor clamp to `ln(1) = 0`.
    pub fn apply(&self, x: f64) -> f64 {
        if !self.corrected {
            return x;
        }
        (x + self.shift).max(0.0).ln_1p()
    }

    /// Inverse of `apply` for values that were not clamped.
    pub fn invert(&self, y: f64) -> f64 {
        if !self.corrected {
            return y;
        }
        y.exp_m1() - self.shift
    }
}

/// Per-column corrections, positionally aligned to the canonical column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkewCorrectionTable {
    pub entries: Vec<SkewEntry>,
}

impl SkewCorrectionTable {
    /// Fit on every non-indicator column of `frame`.
    pub fn fit(frame: &FeatureFrame) -> Self {
        let entries = frame
            .columns
            .iter()
            .enumerate()
            .map(|(j, name)| {
                if is_indicator(name) {
                    SkewEntry::identity(name.clone(), 0.0)
                } else {
                    SkewEntry::fit(name.clone(), &frame.column_values(j))
                }
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn corrected_columns(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.corrected)
            .map(|e| e.column.as_str())
            .collect()
    }

    /// Apply in place to one canonical-order row.
    pub fn apply_row(&self, row: &mut [f64]) -> Result<(), TransformError> {
        if row.len() != self.entries.len() {
            return Err(TransformError::ColumnMismatch(format!(
                "skew table covers {} columns, row has {}",
                self.entries.len(),
                row.len()
            )));
        }
        for (v, e) in row.iter_mut().zip(&self.entries) {
            *v = e.apply(*v);
        }
        Ok(())
    }

    /// Apply to every row of a frame with the same column order.
    pub fn apply_frame(&self, frame: &FeatureFrame) -> Result<FeatureFrame, TransformError> {
        let names_match = frame.columns.len() == self.entries.len()
            && frame.columns.iter().zip(&self.entries).all(|(c, e)| *c == e.column);
        if !names_match {
            return Err(TransformError::ColumnMismatch(
                "frame columns differ from the skew table".to_string(),
            ));
        }
        let mut out = frame.clone();
        for (j, e) in self.entries.iter().enumerate() {
            if e.corrected {
                out.data.column_mut(j).apply(|v| *v = e.apply(*v));
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_applies_only_with_non_positive_values() {
        let with_neg = [-3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 50.0];
        let e = SkewEntry::fit("q", &with_neg);
        assert!(e.corrected);
        assert!((e.shift - 4.0).abs() < 1e-12);

        let positive = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 80.0];
        let e = SkewEntry::fit("q", &positive);
        assert!(e.corrected);
        assert_eq!(e.shift, 0.0);
        assert!((e.apply(1.0) - 2.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn mildly_skewed_column_is_left_alone() {
        let e = SkewEntry::fit("w", &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(!e.corrected);
        assert_eq!(e.apply(7.5), 7.5);
    }

    #[test]
    fn correction_round_trips() {
        let values = [-2.0, 0.5, 0.5, 0.5, 0.5, 0.5, 1.0, 120.0];
        let min = -2.0;
        let e = SkewEntry::fit("p", &values);
        assert!(e.corrected);
        for &x in &values {
            let y = e.apply(x);
            // ln(1 + x - min + 1), inverted as exp(y) - 1 + min - 1.
            assert!((y - (x - min + 1.0).ln_1p()).abs() < 1e-12);
            let back = y.exp() - 1.0 + min - 1.0;
            assert!((back - x).abs() < 1e-9);
            assert!((e.invert(y) - x).abs() < 1e-9);
        }
    }

    #[test]
    fn below_floor_clamps() {
        let e = SkewEntry {
            column: "q".to_string(),
            skewness: 3.0,
            corrected: true,
            shift: 0.0,
        };
        assert_eq!(e.apply(-5.0), 0.0);
    }

    #[test]
    fn indicators_are_never_corrected() {
        let frame = FeatureFrame::from_rows(
            vec!["quantity".to_string(), "status_Offered".to_string()],
            &[
                vec![1.0, 0.0],
                vec![1.0, 0.0],
                vec![1.0, 0.0],
                vec![1.0, 0.0],
                vec![90.0, 1.0],
            ],
        )
        .unwrap();
        let table = SkewCorrectionTable::fit(&frame);
        assert_eq!(table.corrected_columns(), vec!["quantity"]);
        let out = table.apply_frame(&frame).unwrap();
        assert_eq!(out.column_values(1), vec![0.0, 0.0, 0.0, 0.0, 1.0]);
        assert!((out.data[(0, 0)] - 2.0f64.ln()).abs() < 1e-12);
    }
}
