//! Persisted model bundle.
//!
//! A training run writes five files into one directory:
//!
//! - `regressor.xgb` and `classifier.xgb`: the XGBoost boosters
//! - `expected_columns.txt`: the canonical column order, one name per line
//! - `cleaned_data.csv`: the cleaned training rows in the input schema
//! - `bundle.json`: transform parameters, model metadata and the run summary
//!
//! Everything is serialised before the first file is touched, and each file
//! lands via a temporary sibling plus rename, so a failed run leaves no
//! partial bundle behind.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{DatasetRow, OutlierColumn};
use crate::error::{AppError, TransformError};
use crate::io::export::dataset_csv_bytes;
use crate::models::{Evaluation, GbdtConfig, GbdtModel, Objective};
use crate::transform::FittedTransform;

pub const BUNDLE_FORMAT_VERSION: u32 = 2;
pub const BUNDLE_FILE: &str = "bundle.json";
pub const COLUMNS_FILE: &str = "expected_columns.txt";
pub const CLEANED_FILE: &str = "cleaned_data.csv";
pub const REGRESSOR_FILE: &str = "regressor.xgb";
pub const CLASSIFIER_FILE: &str = "classifier.xgb";

/// What went into a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub rows_read: usize,
    pub row_errors: usize,
    pub imputed_values: usize,
    pub outlier_order: Vec<OutlierColumn>,
    pub outliers_dropped: usize,
    pub negative_dropped: usize,
    /// Rows the regressor was fitted on.
    pub regression_rows: usize,
    /// Resolved rows the classifier was fitted on.
    pub classification_rows: usize,
    pub boost: GbdtConfig,
    pub evaluation: Option<Evaluation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub format_version: u32,
    /// Name and version of the writer.
    pub tool: String,
    pub created_at: DateTime<Utc>,
    pub transform: FittedTransform,
    pub regressor: GbdtModel,
    pub classifier: GbdtModel,
    pub training: TrainingSummary,
}

impl ModelBundle {
    pub fn new(
        transform: FittedTransform,
        regressor: GbdtModel,
        classifier: GbdtModel,
        training: TrainingSummary,
    ) -> Self {
        Self {
            format_version: BUNDLE_FORMAT_VERSION,
            tool: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            created_at: Utc::now(),
            transform,
            regressor,
            classifier,
            training,
        }
    }

    /// Check that every part of the bundle agrees on the feature layout.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.format_version != BUNDLE_FORMAT_VERSION {
            return Err(AppError::new(
                4,
                format!(
                    "Unsupported bundle format version {} (expected {BUNDLE_FORMAT_VERSION}); retrain.",
                    self.format_version
                ),
            ));
        }
        self.transform.validate()?;
        let width = self.transform.width();
        self.regressor.validate(width)?;
        self.classifier.validate(width)?;
        if self.regressor.objective != Objective::SquaredError || self.classifier.objective != Objective::Logistic {
            return Err(AppError::new(4, "Bundle models have unexpected objectives."));
        }
        Ok(())
    }
}

/// Paths written by `write_artifacts`.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub bundle: PathBuf,
    pub regressor: PathBuf,
    pub classifier: PathBuf,
    pub columns: PathBuf,
    pub cleaned: PathBuf,
}

pub fn write_artifacts(dir: &Path, bundle: &ModelBundle, cleaned: &[DatasetRow]) -> Result<Artifacts, AppError> {
    let json = serde_json::to_string_pretty(bundle)
        .map_err(|e| AppError::new(4, format!("Failed to serialise bundle: {e}")))?;
    let mut columns = bundle.transform.columns.join("\n");
    columns.push('\n');
    let csv = dataset_csv_bytes(cleaned)?;

    fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create output dir '{}': {e}", dir.display())))?;

    let artifacts = Artifacts {
        bundle: dir.join(BUNDLE_FILE),
        regressor: dir.join(REGRESSOR_FILE),
        classifier: dir.join(CLASSIFIER_FILE),
        columns: dir.join(COLUMNS_FILE),
        cleaned: dir.join(CLEANED_FILE),
    };
    write_atomic(&artifacts.regressor, bundle.regressor.booster_bytes())?;
    write_atomic(&artifacts.classifier, bundle.classifier.booster_bytes())?;
    write_atomic(&artifacts.cleaned, csv.as_slice())?;
    write_atomic(&artifacts.columns, columns.as_bytes())?;
    // The bundle goes last: its presence marks a complete run.
    write_atomic(&artifacts.bundle, json.as_bytes())?;

    info!(dir = %dir.display(), "artifacts written");
    Ok(artifacts)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)
        .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", tmp.display())))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AppError::new(2, format!("Failed to move '{}' into place: {e}", path.display()))
    })
}

/// Load and validate a bundle from a directory (or a direct path to `bundle.json`).
///
/// Both boosters must sit next to `bundle.json`. When `expected_columns.txt`
/// is there too it must list the same canonical order.
pub fn read_bundle(path: &Path) -> Result<ModelBundle, AppError> {
    let file = if path.is_dir() { path.join(BUNDLE_FILE) } else { path.to_path_buf() };
    let text = fs::read_to_string(&file).map_err(|e| {
        AppError::new(
            2,
            format!("Failed to read bundle '{}': {e} (run `copper train` first)", file.display()),
        )
    })?;
    let mut bundle: ModelBundle = serde_json::from_str(&text)
        .map_err(|e| AppError::new(4, format!("Corrupt bundle '{}': {e}", file.display())))?;

    let dir = file.parent().unwrap_or_else(|| Path::new("."));
    bundle.regressor = bundle.regressor.with_booster(read_booster(&dir.join(REGRESSOR_FILE))?);
    bundle.classifier = bundle.classifier.with_booster(read_booster(&dir.join(CLASSIFIER_FILE))?);
    bundle.validate()?;

    let columns_path = dir.join(COLUMNS_FILE);
    if columns_path.is_file() {
        let listed = fs::read_to_string(&columns_path).map_err(|e| {
            AppError::new(2, format!("Failed to read '{}': {e}", columns_path.display()))
        })?;
        let listed: Vec<&str> = listed.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        if listed != bundle.transform.columns {
            return Err(TransformError::ColumnMismatch(format!(
                "'{}' disagrees with the bundle's column order",
                columns_path.display()
            ))
            .into());
        }
    }

    info!(
        path = %file.display(),
        created_at = %bundle.created_at,
        columns = bundle.transform.width(),
        "bundle loaded"
    );
    Ok(bundle)
}

fn read_booster(path: &Path) -> Result<Vec<u8>, AppError> {
    fs::read(path).map_err(|e| AppError::new(4, format!("Failed to read booster '{}': {e}", path.display())))
}
