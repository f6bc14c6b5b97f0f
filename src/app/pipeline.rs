//! Training pipeline shared by the CLI.
//!
//! ingest -> clean -> fit transform -> (holdout evaluation) -> fit both models -> persist
//!
//! Any failure aborts the run before the first artifact is written.

use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::domain::{DatasetRow, TrainConfig};
use crate::error::AppError;
use crate::io::bundle::{Artifacts, ModelBundle, TrainingSummary, write_artifacts};
use crate::io::ingest::{IngestedData, load_dataset};
use crate::models::{Evaluation, GbdtTrainer, Predictor, accuracy, r2, rmse};
use crate::transform::clean::{CleanOutput, clean};
use crate::transform::{FitOutput, FittedTransform};

/// All outputs of a `copper train` run.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub ingest: IngestedData,
    pub clean: CleanOutput,
    pub bundle: ModelBundle,
    pub artifacts: Artifacts,
}

pub fn run_training(config: &TrainConfig) -> Result<TrainingRun, AppError> {
    if !(0.0..1.0).contains(&config.holdout) {
        return Err(AppError::new(2, "Holdout fraction must be in [0, 1)."));
    }
    config.boost.validate()?;

    let ingest = load_dataset(&config.data_path)?;
    let cleaned = clean(ingest.rows.clone(), &config.outlier_order)?;
    let bundle = fit_bundle(config, &ingest, &cleaned)?;

    let export: Vec<DatasetRow> = cleaned.records.iter().map(DatasetRow::from).collect();
    let artifacts = write_artifacts(&config.out_dir, &bundle, &export)?;

    Ok(TrainingRun {
        ingest,
        clean: cleaned,
        bundle,
        artifacts,
    })
}

/// Fit the transform and both models on cleaned records. Touches no files.
pub fn fit_bundle(config: &TrainConfig, ingest: &IngestedData, cleaned: &CleanOutput) -> Result<ModelBundle, AppError> {
    let fit = FittedTransform::fit(&cleaned.records)?;
    if fit.x_clf.nrows() == 0 {
        return Err(AppError::new(
            3,
            "No Won/Lost rows remain after cleaning; cannot train the classifier.",
        ));
    }

    let evaluation = if config.holdout > 0.0 {
        holdout_evaluation(config, &fit, cleaned.records.len())?
    } else {
        None
    };

    let regressor = GbdtTrainer::regressor(config.boost).fit(&fit.x_reg, &fit.y_reg)?;
    let classifier = GbdtTrainer::classifier(config.boost).fit(&fit.x_clf, &fit.y_clf)?;

    let training = TrainingSummary {
        rows_read: ingest.rows_read,
        row_errors: ingest.row_errors.len(),
        imputed_values: cleaned.imputation.filled,
        outlier_order: config.outlier_order.clone(),
        outliers_dropped: cleaned.outlier_steps.iter().map(|s| s.dropped).sum(),
        negative_dropped: cleaned.dropped_negative,
        regression_rows: fit.x_reg.nrows(),
        classification_rows: fit.x_clf.nrows(),
        boost: config.boost,
        evaluation,
    };
    Ok(ModelBundle::new(fit.transform, regressor, classifier, training))
}

/// Train on a seeded split, score on the rest. Reported in price units.
///
/// The transform stays the one fitted on all rows; only the models are refit.
fn holdout_evaluation(config: &TrainConfig, fit: &FitOutput, n: usize) -> Result<Option<Evaluation>, AppError> {
    if n < 2 {
        warn!(rows = n, "too few rows for a holdout split; skipping evaluation");
        return Ok(None);
    }
    let (train, test) = split_indices(n, config.holdout, config.seed);

    let reg = GbdtTrainer::regressor(config.boost);
    let model = reg.fit(&fit.x_reg.select_rows(train.iter()), &pick(&fit.y_reg, &train))?;
    let predicted: Vec<f64> = reg
        .predict(&model, &fit.x_reg.select_rows(test.iter()))?
        .into_iter()
        .map(|y| fit.transform.price_from_target(y))
        .collect();
    let actual: Vec<f64> = test
        .iter()
        .map(|&i| fit.transform.price_from_target(fit.y_reg[i]))
        .collect();

    let mut in_test = vec![false; n];
    for &i in &test {
        in_test[i] = true;
    }
    let (clf_train, clf_test): (Vec<usize>, Vec<usize>) =
        (0..fit.clf_rows.len()).partition(|&k| !in_test[fit.clf_rows[k]]);

    let accuracy = if clf_train.is_empty() || clf_test.is_empty() {
        None
    } else {
        let clf = GbdtTrainer::classifier(config.boost);
        let model = clf.fit(&fit.x_clf.select_rows(clf_train.iter()), &pick(&fit.y_clf, &clf_train))?;
        let probs = clf.predict(&model, &fit.x_clf.select_rows(clf_test.iter()))?;
        Some(accuracy(&pick(&fit.y_clf, &clf_test), &probs))
    };

    let evaluation = Evaluation {
        train_rows: train.len(),
        test_rows: test.len(),
        rmse: rmse(&actual, &predicted),
        r2: r2(&actual, &predicted),
        clf_test_rows: clf_test.len(),
        accuracy,
    };
    info!(
        rmse = evaluation.rmse,
        r2 = evaluation.r2,
        accuracy = ?evaluation.accuracy,
        "holdout evaluation"
    );
    Ok(Some(evaluation))
}

/// Seeded shuffle, then the first `fraction` of rows (at least one, at most n - 1) is the test set.
fn split_indices(n: usize, fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut idx: Vec<usize> = (0..n).collect();
    idx.shuffle(&mut StdRng::seed_from_u64(seed));
    let n_test = ((n as f64 * fraction).round() as usize).clamp(1, n - 1);
    let mut test = idx[..n_test].to_vec();
    let mut train = idx[n_test..].to_vec();
    test.sort_unstable();
    train.sort_unstable();
    (train, test)
}

fn pick(values: &[f64], idx: &[usize]) -> Vec<f64> {
    idx.iter().map(|&i| values[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DEFAULT_OUTLIER_ORDER, OrderRecord, Status, StatusLabel};
    use crate::models::GbdtConfig;
    use crate::test_support::training_records;

    fn config() -> TrainConfig {
        TrainConfig {
            data_path: "unused.csv".into(),
            out_dir: "unused".into(),
            outlier_order: DEFAULT_OUTLIER_ORDER.to_vec(),
            boost: GbdtConfig {
                n_trees: 20,
                max_depth: 4,
                ..GbdtConfig::default()
            },
            holdout: 0.25,
            seed: 42,
        }
    }

    #[test]
    fn split_is_seeded_and_disjoint() {
        let (train, test) = split_indices(10, 0.2, 42);
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 8);
        assert!(test.iter().all(|i| !train.contains(i)));
        assert_eq!(split_indices(10, 0.2, 42), (train, test));
        assert_eq!(split_indices(3, 0.01, 1).1.len(), 1);
    }

    fn cleaned(records: &[OrderRecord]) -> (IngestedData, CleanOutput) {
        let rows: Vec<DatasetRow> = records.iter().map(DatasetRow::from).collect();
        let ingest = IngestedData {
            rows: rows.clone(),
            row_errors: Vec::new(),
            rows_read: rows.len(),
        };
        let out = clean(rows, &DEFAULT_OUTLIER_ORDER).unwrap();
        (ingest, out)
    }

    #[test]
    fn trains_and_evaluates() {
        let (ingest, cleaned) = cleaned(&training_records(200));
        let bundle = fit_bundle(&config(), &ingest, &cleaned).unwrap();
        bundle.validate().unwrap();

        let summary = &bundle.training;
        assert_eq!(summary.rows_read, 200);
        assert_eq!(summary.regression_rows, cleaned.records.len());
        let resolved = cleaned.records.iter().filter(|r| r.outcome().is_some()).count();
        assert_eq!(summary.classification_rows, resolved);

        let eval = summary.evaluation.as_ref().unwrap();
        assert_eq!(eval.train_rows + eval.test_rows, summary.regression_rows);
        assert!(eval.rmse.is_finite());
        assert!(eval.r2 > 0.5, "r2 = {}", eval.r2);
    }

    #[test]
    fn no_resolved_rows_is_fatal() {
        let mut records = training_records(40);
        for r in &mut records {
            if r.outcome().is_some() {
                r.status = StatusLabel::Stage(Status::Offered);
            }
        }
        let (ingest, cleaned) = cleaned(&records);
        assert_eq!(fit_bundle(&config(), &ingest, &cleaned).unwrap_err().exit_code(), 3);
    }

    #[test]
    fn run_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("data.csv");
        let rows: Vec<DatasetRow> = training_records(120).iter().map(DatasetRow::from).collect();
        crate::io::export::write_dataset_csv(&data_path, &rows).unwrap();

        let out_dir = dir.path().join("out");
        let run = run_training(&TrainConfig {
            data_path,
            out_dir: out_dir.clone(),
            holdout: 0.0,
            ..config()
        })
        .unwrap();
        assert!(run.artifacts.bundle.is_file());
        assert!(run.artifacts.cleaned.is_file());
        assert!(run.bundle.training.evaluation.is_none());
        crate::io::bundle::read_bundle(&out_dir).unwrap();
    }

    #[test]
    fn bad_holdout_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        let err = run_training(&TrainConfig {
            out_dir: out_dir.clone(),
            holdout: 1.5,
            ..config()
        })
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(!out_dir.exists());
    }
}
