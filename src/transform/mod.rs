//! Feature transform: one set of derivation rules, two modes.
//!
//! - fit mode (`FittedTransform::fit`) runs over cleaned training records,
//!   records the skew table, fits the scaler and fixes the canonical column order
//! - apply mode (`FittedTransform::apply*`) replays those parameters on records
//!   supplied at inference; it never re-fits anything
//!
//! Cleaning (imputation, outliers) lives in `clean` and only runs in fit mode.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{OrderRecord, RawOrderRecord};
use crate::error::{AppError, TransformError};

pub mod clean;
pub mod features;
pub mod frame;
pub mod scaler;
pub mod skew;

pub use features::{BASE_COLUMNS, TARGET_COLUMN};
pub use frame::FeatureFrame;
pub use scaler::FittedScaler;
pub use skew::{SkewCorrectionTable, SkewEntry};

use features::{encode_all, encode_drop_first, fit_columns};
use frame::{reindex, validate_order};

/// Parameters recorded by fit mode. Travels inside the model bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransform {
    /// Canonical column order; the scaler and skew table are positional over it.
    pub columns: Vec<String>,
    pub skew: SkewCorrectionTable,
    /// Correction applied to the regression target (inverted on predicted prices).
    pub target_skew: SkewEntry,
    pub scaler: FittedScaler,
}

/// Matrices produced by fit mode, scaled and ready for the predictor.
#[derive(Debug, Clone)]
pub struct FitOutput {
    pub transform: FittedTransform,
    pub x_reg: DMatrix<f64>,
    /// Selling price after target skew correction.
    pub y_reg: Vec<f64>,
    /// Rows with a resolved Won/Lost outcome only.
    pub x_clf: DMatrix<f64>,
    /// `1` = Won, `0` = Lost.
    pub y_clf: Vec<f64>,
    /// Index into the fitted records of each classification row.
    pub clf_rows: Vec<usize>,
}

/// Every intermediate of one apply-mode pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedRow {
    pub columns: Vec<String>,
    /// One-hot encoded and reindexed to the canonical order.
    pub encoded: Vec<f64>,
    /// After skew correction.
    pub corrected: Vec<f64>,
    /// After scaling: the vector the models see.
    pub scaled: Vec<f64>,
}

impl FittedTransform {
    /// Fit on cleaned records (every record must carry a selling price).
    pub fn fit(records: &[OrderRecord]) -> Result<FitOutput, AppError> {
        if records.is_empty() {
            return Err(AppError::new(3, "No records to fit the feature transform on."));
        }

        let columns = fit_columns();
        let rows: Vec<Vec<f64>> = records.iter().map(encode_drop_first).collect();
        let frame = FeatureFrame::from_rows(columns.clone(), &rows)?;

        let prices: Vec<f64> = records
            .iter()
            .map(|r| {
                r.selling_price
                    .ok_or_else(|| AppError::new(3, format!("Record '{}' has no selling price.", r.id)))
            })
            .collect::<Result<_, _>>()?;

        let skew = SkewCorrectionTable::fit(&frame);
        let target_skew = SkewEntry::fit(TARGET_COLUMN, &prices);
        let corrected = skew.apply_frame(&frame)?;
        let y_reg: Vec<f64> = prices.iter().map(|&p| target_skew.apply(p)).collect();
        info!(
            corrected = ?skew.corrected_columns(),
            target_corrected = target_skew.corrected,
            "skew correction fitted"
        );

        let (clf_rows, y_clf): (Vec<usize>, Vec<f64>) = records
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.outcome().map(|o| (i, o.as_target())))
            .unzip();
        let clf_frame = corrected.select_rows(&clf_rows);

        let scaler = FittedScaler::fit(&corrected.data)?;
        let x_reg = scaler.transform(&corrected.data)?;
        let x_clf = scaler.transform(&clf_frame.data)?;

        Ok(FitOutput {
            transform: FittedTransform {
                columns,
                skew,
                target_skew,
                scaler,
            },
            x_reg,
            y_reg,
            x_clf,
            y_clf,
            clf_rows,
        })
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Check that the column order, skew table and scaler form one compatible set.
    pub fn validate(&self) -> Result<(), TransformError> {
        validate_order(&self.columns)?;
        if self.skew.len() != self.width() {
            return Err(TransformError::ColumnMismatch(format!(
                "skew table has {} entries for {} columns",
                self.skew.len(),
                self.width()
            )));
        }
        if let Some((c, e)) = self.columns.iter().zip(&self.skew.entries).find(|(c, e)| **c != e.column) {
            return Err(TransformError::ColumnMismatch(format!(
                "skew entry `{}` sits at column `{c}`",
                e.column
            )));
        }
        if self.scaler.width() != self.width() || self.scaler.stds.len() != self.width() {
            return Err(TransformError::ColumnMismatch(format!(
                "scaler has {} columns, order has {}",
                self.scaler.width(),
                self.width()
            )));
        }
        if let Some(base) = BASE_COLUMNS.iter().find(|b| !self.columns.iter().any(|c| c == *b)) {
            return Err(TransformError::ColumnMismatch(format!(
                "canonical order lacks base column `{base}`"
            )));
        }
        Ok(())
    }

    /// Scaled feature vector for one inference record.
    pub fn apply(&self, raw: &RawOrderRecord) -> Result<Vec<f64>, TransformError> {
        Ok(self.apply_traced(raw)?.scaled)
    }

    /// Like `apply`, keeping every intermediate.
    pub fn apply_traced(&self, raw: &RawOrderRecord) -> Result<AppliedRow, TransformError> {
        let record = raw.validate()?;
        self.apply_record(&record)
    }

    /// Apply to an already validated record.
    pub fn apply_record(&self, record: &OrderRecord) -> Result<AppliedRow, TransformError> {
        let encoded = reindex(&encode_all(record), &self.columns)?;
        let mut corrected = encoded.clone();
        self.skew.apply_row(&mut corrected)?;
        let scaled = self.scaler.transform_row(&corrected)?;
        if scaled.len() != self.width() {
            return Err(TransformError::ColumnMismatch(format!(
                "scaled width {} != canonical width {}",
                scaled.len(),
                self.width()
            )));
        }
        Ok(AppliedRow {
            columns: self.columns.clone(),
            encoded,
            corrected,
            scaled,
        })
    }

    /// Scaled matrix for a batch, one row per record, in input order.
    pub fn apply_batch(&self, raws: &[RawOrderRecord]) -> Result<DMatrix<f64>, TransformError> {
        let rows = raws
            .iter()
            .map(|r| self.apply(r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FeatureFrame::from_rows(self.columns.clone(), &rows)?.data)
    }

    /// Map a regression output back to price units.
    pub fn price_from_target(&self, y: f64) -> f64 {
        self.target_skew.invert(y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Outcome, Status, StatusLabel};
    use crate::math::mean_std;
    use crate::test_support::{raw_order, training_records};

    #[test]
    fn fit_produces_aligned_matrices() {
        let records = training_records(200);
        let n_resolved = records.iter().filter(|r| r.outcome().is_some()).count();
        let out = FittedTransform::fit(&records).unwrap();

        assert_eq!(out.transform.columns, fit_columns());
        assert_eq!(out.x_reg.nrows(), 200);
        assert_eq!(out.x_reg.ncols(), out.transform.width());
        assert_eq!(out.x_clf.nrows(), n_resolved);
        assert_eq!(out.y_clf.len(), n_resolved);
        assert!(out.y_clf.iter().all(|&y| y == 0.0 || y == 1.0));
        out.transform.validate().unwrap();

        // Regression matrix is standardised column by column.
        let q: Vec<f64> = out.x_reg.column(0).iter().copied().collect();
        let (m, s) = mean_std(&q).unwrap();
        assert!(m.abs() < 1e-9);
        assert!((s - 1.0).abs() < 1e-9);
    }

    #[test]
    fn skewed_quantity_is_corrected() {
        let out = FittedTransform::fit(&training_records(200)).unwrap();
        assert!(out.transform.skew.corrected_columns().contains(&"quantity"));
        assert!(!out.transform.skew.corrected_columns().iter().any(|c| c.starts_with("status_")));
    }

    #[test]
    fn apply_matches_fit_rows() {
        let mut records = training_records(120);
        // Replace resolutions so every record is a valid inference input.
        for r in &mut records {
            if r.status.outcome().is_some() {
                r.status = StatusLabel::Stage(Status::Offered);
            }
        }
        let out = FittedTransform::fit(&records).unwrap();
        for (i, r) in records.iter().enumerate().take(25) {
            let applied = out.transform.apply_record(r).unwrap();
            for (a, b) in applied.scaled.iter().zip(out.x_reg.row(i).iter()) {
                assert!((a - b).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn apply_output_follows_canonical_order() {
        let out = FittedTransform::fit(&training_records(80)).unwrap();
        let applied = out.transform.apply_traced(&raw_order()).unwrap();
        assert_eq!(applied.columns, out.transform.columns);
        assert_eq!(applied.scaled.len(), out.transform.columns.len());
    }

    #[test]
    fn apply_is_deterministic_and_read_only() {
        let transform = FittedTransform::fit(&training_records(80)).unwrap().transform;
        let before = transform.clone();

        let a = transform.apply(&raw_order()).unwrap();
        let b = transform.apply(&raw_order()).unwrap();
        assert_eq!(a, b);

        let shifted: Vec<RawOrderRecord> = (0..20)
            .map(|i| RawOrderRecord {
                quantity: Some(5_000.0 + i as f64 * 100.0),
                width: Some(9_000.0),
                ..raw_order()
            })
            .collect();
        transform.apply_batch(&shifted).unwrap();
        transform.apply_batch(&shifted).unwrap();
        assert_eq!(transform, before);
    }

    #[test]
    fn known_bundle_yields_fixture_vector() {
        let columns = fit_columns();
        let mut skew = SkewCorrectionTable {
            entries: columns.iter().map(|c| SkewEntry::identity(c.clone(), 0.0)).collect(),
        };
        skew.entries[0] = SkewEntry {
            column: "quantity".to_string(),
            skewness: 4.0,
            corrected: true,
            shift: 0.0,
        };
        let mut means = vec![0.0; columns.len()];
        let mut stds = vec![1.0; columns.len()];
        means[5] = 1000.0; // width
        stds[5] = 500.0;
        means[6] = 149_990.0; // product_ref
        stds[6] = 5.0;
        let transform = FittedTransform {
            columns,
            skew,
            target_skew: SkewEntry::identity(TARGET_COLUMN, 0.0),
            scaler: FittedScaler { means, stds },
        };
        transform.validate().unwrap();

        let v = transform.apply(&raw_order()).unwrap();
        let expected = [
            2f64.ln(), // quantity: ln(1 + 1)
            10000.0,
            25.0,
            3.0,
            2.5,
            0.0, // width
            2.0, // product_ref
            2024.0,
            1.0,
            0.0, // Monday
            2024.0,
            1.0,
            3.0, // Thursday
            10.0,
            1.0, // status_Offerable
            0.0,
            0.0,
            0.0,
            0.0,
            0.0, // item_type_PL
            0.0,
            1.0, // item_type_W
            0.0,
        ];
        assert_eq!(v.len(), expected.len());
        for (a, b) in v.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12, "{a} != {b}");
        }
    }

    #[test]
    fn scaler_of_wrong_width_is_mismatch() {
        let mut transform = FittedTransform::fit(&training_records(60)).unwrap().transform;
        transform.scaler.means.pop();
        transform.scaler.stds.pop();
        assert!(matches!(transform.validate(), Err(TransformError::ColumnMismatch(_))));
        assert!(matches!(transform.apply(&raw_order()), Err(TransformError::ColumnMismatch(_))));
    }

    #[test]
    fn classification_subset_only_has_resolved_rows() {
        let mut records = training_records(40);
        for r in &mut records {
            r.status = StatusLabel::Stage(Status::Revised);
        }
        records[3].status = StatusLabel::Resolved(Outcome::Won);
        let out = FittedTransform::fit(&records).unwrap();
        assert_eq!(out.x_clf.nrows(), 1);
        assert_eq!(out.y_clf, vec![1.0]);
    }
}
