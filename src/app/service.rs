//! Inference service over a loaded bundle.
//!
//! Holds the bundle read-only after load, so one service can be shared
//! across threads (`Arc<InferenceService>`) without locking.

use std::path::Path;

use nalgebra::DMatrix;
use serde::Serialize;

use crate::domain::{PredictedOutcome, RawOrderRecord};
use crate::error::{AppError, TransformError};
use crate::io::bundle::{ModelBundle, read_bundle};
use crate::transform::AppliedRow;

/// One order's predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// Selling price in original units.
    pub price: f64,
    pub outcome: PredictedOutcome,
    pub win_probability: f64,
}

/// Numeric field swept by `price_sensitivity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitivityField {
    Quantity,
    Thickness,
}

impl SensitivityField {
    /// Axis label, with unit.
    pub fn label(self) -> &'static str {
        match self {
            SensitivityField::Quantity => "quantity (t)",
            SensitivityField::Thickness => "thickness (mm)",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceService {
    bundle: ModelBundle,
}

impl InferenceService {
    /// Load a bundle directory written by `copper train`.
    pub fn load(dir: &Path) -> Result<Self, AppError> {
        Ok(Self::from_bundle(read_bundle(dir)?))
    }

    pub fn from_bundle(bundle: ModelBundle) -> Self {
        Self { bundle }
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    pub fn predict(&self, raw: &RawOrderRecord) -> Result<Prediction, TransformError> {
        let scaled = self.bundle.transform.apply(raw)?;
        self.predict_scaled(&scaled)
    }

    /// Prediction plus every transform intermediate, for display and debugging.
    pub fn predict_traced(&self, raw: &RawOrderRecord) -> Result<(Prediction, AppliedRow), TransformError> {
        let applied = self.bundle.transform.apply_traced(raw)?;
        let prediction = self.predict_scaled(&applied.scaled)?;
        Ok((prediction, applied))
    }

    /// One result per input, in input order. A bad record fails only itself;
    /// the valid ones are scored together.
    pub fn predict_batch(&self, raws: &[RawOrderRecord]) -> Vec<Result<Prediction, TransformError>> {
        let applied: Vec<Result<Vec<f64>, TransformError>> =
            raws.iter().map(|r| self.bundle.transform.apply(r)).collect();
        let valid: Vec<&[f64]> = applied.iter().filter_map(|r| r.as_deref().ok()).collect();

        let width = self.bundle.transform.width();
        let flat: Vec<f64> = valid.iter().flat_map(|row| row.iter().copied()).collect();
        let scored = self.score(&DMatrix::from_row_slice(valid.len(), width, &flat));

        let mut scored = match scored {
            Ok(predictions) => predictions.into_iter(),
            Err(err) => {
                return applied
                    .into_iter()
                    .map(|r| r.and_then(|_| Err(err.clone())))
                    .collect();
            }
        };
        applied
            .into_iter()
            .map(|r| {
                r.and_then(|_| {
                    scored
                        .next()
                        .ok_or_else(|| TransformError::Model("missing batch prediction".to_string()))
                })
            })
            .collect()
    }

    /// Predicted price as `field` sweeps `[lo, hi]` in `steps` evenly spaced points,
    /// all other fields held at `raw`.
    pub fn price_sensitivity(
        &self,
        raw: &RawOrderRecord,
        field: SensitivityField,
        (lo, hi): (f64, f64),
        steps: usize,
    ) -> Result<Vec<(f64, f64)>, TransformError> {
        let steps = steps.max(2);
        let dx = (hi - lo) / (steps - 1) as f64;
        let xs: Vec<f64> = (0..steps).map(|i| lo + dx * i as f64).collect();
        let variants: Vec<RawOrderRecord> = xs
            .iter()
            .map(|&x| {
                let mut variant = raw.clone();
                match field {
                    SensitivityField::Quantity => variant.quantity = Some(x),
                    SensitivityField::Thickness => variant.thickness = Some(x),
                }
                variant
            })
            .collect();
        let x = self.bundle.transform.apply_batch(&variants)?;
        let predictions = self.score(&x)?;
        Ok(xs.into_iter().zip(predictions.iter().map(|p| p.price)).collect())
    }

    fn predict_scaled(&self, scaled: &[f64]) -> Result<Prediction, TransformError> {
        let x = DMatrix::from_row_slice(1, scaled.len(), scaled);
        self.score(&x)?
            .pop()
            .ok_or_else(|| TransformError::Model("booster returned no prediction".to_string()))
    }

    /// Score scaled rows with both models.
    fn score(&self, x: &DMatrix<f64>) -> Result<Vec<Prediction>, TransformError> {
        let targets = self.bundle.regressor.predict(x)?;
        let probabilities = self.bundle.classifier.predict(x)?;
        Ok(targets
            .into_iter()
            .zip(probabilities)
            .map(|(target, win_probability)| Prediction {
                price: self.bundle.transform.price_from_target(target),
                outcome: PredictedOutcome::from_class(u8::from(win_probability >= 0.5)),
                win_probability,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_support::{raw_order, trained_bundle};

    #[test]
    fn reference_order_predicts() {
        let service = InferenceService::from_bundle(trained_bundle());
        let p = service.predict(&raw_order()).unwrap();
        assert!(p.price.is_finite() && p.price > 0.0);
        assert!((0.0..=1.0).contains(&p.win_probability));
        assert_eq!(p.outcome == PredictedOutcome::Win, p.win_probability >= 0.5);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let service = InferenceService::from_bundle(trained_bundle());
        let raw = RawOrderRecord {
            status: Some("Cancelled".to_string()),
            ..raw_order()
        };
        assert_eq!(
            service.predict(&raw).unwrap_err(),
            TransformError::UnknownCategory {
                field: "status",
                value: "Cancelled".to_string()
            }
        );
    }

    #[test]
    fn missing_field_is_incomplete() {
        let service = InferenceService::from_bundle(trained_bundle());
        let raw = RawOrderRecord {
            delivery_date: None,
            ..raw_order()
        };
        assert_eq!(
            service.predict(&raw).unwrap_err(),
            TransformError::IncompleteRecord { field: "delivery_date" }
        );
    }

    #[test]
    fn batch_keeps_order_and_isolates_failures() {
        let service = InferenceService::from_bundle(trained_bundle());
        let bad = RawOrderRecord {
            item_type: Some("XX".to_string()),
            ..raw_order()
        };
        let out = service.predict_batch(&[raw_order(), bad, raw_order()]);
        assert_eq!(out.len(), 3);
        assert!(out[1].is_err());
        assert_eq!(out[0].as_ref().unwrap(), out[2].as_ref().unwrap());
    }

    #[test]
    fn sensitivity_sweeps_endpoints() {
        let service = InferenceService::from_bundle(trained_bundle());
        let points = service
            .price_sensitivity(&raw_order(), SensitivityField::Thickness, (0.5, 5.0), 10)
            .unwrap();
        assert_eq!(points.len(), 10);
        assert!((points[0].0 - 0.5).abs() < 1e-12);
        assert!((points[9].0 - 5.0).abs() < 1e-12);
        assert!(points.iter().all(|(_, y)| y.is_finite()));
    }

    #[test]
    fn shared_across_threads() {
        let service = Arc::new(InferenceService::from_bundle(trained_bundle()));
        let expected = service.predict(&raw_order()).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                std::thread::spawn(move || service.predict(&raw_order()).unwrap())
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), expected);
        }
    }
}
