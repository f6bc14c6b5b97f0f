//! Gradient-boosted trees on XGBoost.
//!
//! Training goes through `xgboost::Booster::train` with the histogram tree
//! method. A fitted booster is kept as XGBoost's binary model bytes, so a
//! `GbdtModel` is plain data: it can be cloned, shared across threads and
//! written next to the bundle. Scoring loads a booster from those bytes for
//! each call and predicts the whole matrix at once.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::info;
use xgboost::parameters::learning::{LearningTaskParametersBuilder, Objective as XgbObjective};
use xgboost::parameters::tree::{TreeBoosterParametersBuilder, TreeMethod};
use xgboost::parameters::{BoosterParameters, BoosterParametersBuilder, BoosterType, TrainingParametersBuilder};
use xgboost::{Booster, DMatrix as XgbMatrix};

use crate::error::{AppError, TransformError};
use crate::models::Predictor;

/// Boosting hyper-parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GbdtConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// L2 regularisation on leaf weights.
    pub lambda: f64,
    /// Minimum hessian sum on each side of a split.
    pub min_child_weight: f64,
    pub max_bins: usize,
}

impl Default for GbdtConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 6,
            learning_rate: 0.3,
            lambda: 1.0,
            min_child_weight: 1.0,
            max_bins: 256,
        }
    }
}

impl GbdtConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.n_trees == 0 || self.n_trees > u32::MAX as usize {
            return Err(AppError::new(2, "Number of trees must be > 0."));
        }
        if self.max_depth == 0 || self.max_depth > 64 {
            return Err(AppError::new(2, "max_depth must be in 1..=64."));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(AppError::new(2, "Learning rate must be > 0."));
        }
        if !(self.lambda.is_finite() && self.lambda >= 0.0) {
            return Err(AppError::new(2, "Lambda must be >= 0."));
        }
        if !(self.min_child_weight.is_finite() && self.min_child_weight >= 0.0) {
            return Err(AppError::new(2, "min_child_weight must be >= 0."));
        }
        if !(2..=usize::from(u16::MAX)).contains(&self.max_bins) {
            return Err(AppError::new(2, "max_bins must be in 2..=65535."));
        }
        Ok(())
    }

    fn booster_params(&self, objective: Objective) -> Result<BoosterParameters, AppError> {
        let invalid = |e: String| AppError::new(2, format!("Invalid boosting parameters: {e}"));
        let tree = TreeBoosterParametersBuilder::default()
            .eta(self.learning_rate as f32)
            .max_depth(self.max_depth as u32)
            .lambda(self.lambda as u32)
            .min_child_weight(self.min_child_weight as u32)
            .max_bin(self.max_bins as u32)
            .tree_method(TreeMethod::Hist)
            .build()
            .map_err(invalid)?;
        let learning = LearningTaskParametersBuilder::default()
            .objective(objective.xgb())
            .build()
            .map_err(invalid)?;
        BoosterParametersBuilder::default()
            .booster_type(BoosterType::Tree(tree))
            .learning_params(learning)
            .verbose(false)
            .build()
            .map_err(invalid)
    }
}

/// Loss being boosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    SquaredError,
    /// Binary log-loss; targets must be 0 or 1 and outputs are probabilities.
    Logistic,
}

impl Objective {
    fn xgb(self) -> XgbObjective {
        match self {
            Objective::SquaredError => XgbObjective::RegLinear,
            Objective::Logistic => XgbObjective::BinaryLogistic,
        }
    }
}

/// A fitted booster plus the layout it was trained on.
///
/// The booster bytes are not part of the JSON form; the bundle stores them
/// in their own file and reattaches them with `with_booster`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct GbdtModel {
    pub objective: Objective,
    pub n_features: usize,
    pub n_trees: usize,
    #[serde(skip)]
    booster: Vec<u8>,
}

impl std::fmt::Debug for GbdtModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GbdtModel")
            .field("objective", &self.objective)
            .field("n_features", &self.n_features)
            .field("n_trees", &self.n_trees)
            .field("booster_bytes", &self.booster.len())
            .finish()
    }
}

impl GbdtModel {
    /// XGBoost binary model bytes.
    pub fn booster_bytes(&self) -> &[u8] {
        &self.booster
    }

    pub fn with_booster(mut self, bytes: Vec<u8>) -> Self {
        self.booster = bytes;
        self
    }

    fn load(&self) -> Result<Booster, TransformError> {
        if self.booster.is_empty() {
            return Err(TransformError::Model("no booster attached".to_string()));
        }
        Booster::load_buffer(&self.booster).map_err(|e| TransformError::Model(format!("failed to load booster: {e}")))
    }

    /// Predictions for scaled feature rows (probabilities for `Logistic`).
    pub fn predict(&self, x: &DMatrix<f64>) -> Result<Vec<f64>, TransformError> {
        if x.ncols() != self.n_features {
            return Err(TransformError::ColumnMismatch(format!(
                "model expects {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }
        if x.nrows() == 0 {
            return Ok(Vec::new());
        }
        let booster = self.load()?;
        let dmat = to_xgb_matrix(x).map_err(|e| TransformError::Model(format!("failed to build matrix: {e}")))?;
        let out = booster
            .predict(&dmat)
            .map_err(|e| TransformError::Model(format!("prediction failed: {e}")))?;
        if out.len() != x.nrows() {
            return Err(TransformError::Model(format!(
                "booster returned {} predictions for {} rows",
                out.len(),
                x.nrows()
            )));
        }
        Ok(out.into_iter().map(f64::from).collect())
    }

    /// Check the model against the feature width it will be fed.
    pub fn validate(&self, n_features: usize) -> Result<(), TransformError> {
        if self.n_features != n_features {
            return Err(TransformError::ColumnMismatch(format!(
                "model trained on {} features, transform produces {n_features}",
                self.n_features
            )));
        }
        self.load().map(|_| ())
    }
}

/// Row-major `f32` copy; XGBoost treats NaN as missing, and the transform never emits it.
fn to_xgb_matrix(x: &DMatrix<f64>) -> Result<XgbMatrix, xgboost::XGBError> {
    let flat: Vec<f32> = (0..x.nrows())
        .flat_map(|i| (0..x.ncols()).map(move |j| x[(i, j)] as f32))
        .collect();
    XgbMatrix::from_dense(&flat, x.nrows())
}

/// Save a booster to XGBoost's binary format and read the bytes back.
fn booster_to_bytes(booster: &Booster) -> Result<Vec<u8>, AppError> {
    let scratch = tempfile::NamedTempFile::new()
        .map_err(|e| AppError::new(4, format!("Failed to create scratch file for booster: {e}")))?;
    booster
        .save(scratch.path())
        .map_err(|e| AppError::new(4, format!("Failed to save booster: {e}")))?;
    std::fs::read(scratch.path()).map_err(|e| AppError::new(4, format!("Failed to read saved booster: {e}")))
}

#[derive(Debug, Clone)]
pub struct GbdtTrainer {
    pub config: GbdtConfig,
    pub objective: Objective,
}

impl GbdtTrainer {
    pub fn regressor(config: GbdtConfig) -> Self {
        Self {
            config,
            objective: Objective::SquaredError,
        }
    }

    pub fn classifier(config: GbdtConfig) -> Self {
        Self {
            config,
            objective: Objective::Logistic,
        }
    }

    fn check_inputs(&self, x: &DMatrix<f64>, y: &[f64]) -> Result<(), AppError> {
        self.config.validate()?;
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(AppError::new(3, "Cannot train on an empty matrix."));
        }
        if x.nrows() != y.len() {
            return Err(AppError::new(
                4,
                format!("Feature rows ({}) and targets ({}) differ.", x.nrows(), y.len()),
            ));
        }
        if x.iter().chain(y).any(|v| !v.is_finite()) {
            return Err(AppError::new(4, "Training data contains non-finite values."));
        }
        if self.objective == Objective::Logistic && y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(AppError::new(4, "Classification targets must be 0 or 1."));
        }
        Ok(())
    }
}

impl Predictor for GbdtTrainer {
    type Model = GbdtModel;

    fn fit(&self, x: &DMatrix<f64>, y: &[f64]) -> Result<GbdtModel, AppError> {
        self.check_inputs(x, y)?;

        let xgb_err = |what: &str, e: xgboost::XGBError| AppError::new(4, format!("{what}: {e}"));
        let mut dtrain = to_xgb_matrix(x).map_err(|e| xgb_err("Failed to build training matrix", e))?;
        let labels: Vec<f32> = y.iter().map(|&v| v as f32).collect();
        dtrain
            .set_labels(&labels)
            .map_err(|e| xgb_err("Failed to set training labels", e))?;

        let params = TrainingParametersBuilder::default()
            .dtrain(&dtrain)
            .boost_rounds(self.config.n_trees as u32)
            .booster_params(self.config.booster_params(self.objective)?)
            .build()
            .map_err(|e| AppError::new(2, format!("Invalid training parameters: {e}")))?;
        let booster = Booster::train(&params).map_err(|e| xgb_err("Boosting failed", e))?;
        let bytes = booster_to_bytes(&booster)?;

        info!(
            objective = ?self.objective,
            rows = x.nrows(),
            features = x.ncols(),
            trees = self.config.n_trees,
            model_bytes = bytes.len(),
            "booster fitted"
        );

        Ok(GbdtModel {
            objective: self.objective,
            n_features: x.ncols(),
            n_trees: self.config.n_trees,
            booster: bytes,
        })
    }

    fn predict(&self, model: &GbdtModel, x: &DMatrix<f64>) -> Result<Vec<f64>, AppError> {
        Ok(model.predict(x)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (DMatrix<f64>, Vec<f64>) {
        // y = 10 when x0 > 5, else 0; x1 is noise.
        let n = 40;
        let mut flat = Vec::with_capacity(n * 2);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let x0 = (i % 10) as f64;
            flat.push(x0);
            flat.push(((i * 7) % 3) as f64);
            y.push(if x0 > 5.0 { 10.0 } else { 0.0 });
        }
        (DMatrix::from_row_slice(n, 2, &flat), y)
    }

    fn small(n_trees: usize) -> GbdtConfig {
        GbdtConfig {
            n_trees,
            ..GbdtConfig::default()
        }
    }

    #[test]
    fn regressor_learns_a_step() {
        let (x, y) = step_data();
        let trainer = GbdtTrainer::regressor(small(50));
        let model = trainer.fit(&x, &y).unwrap();
        let pred = trainer.predict(&model, &x).unwrap();
        for (p, t) in pred.iter().zip(&y) {
            assert!((p - t).abs() < 0.5, "{p} vs {t}");
        }
        assert_eq!(model.n_features, 2);
        assert_eq!(model.n_trees, 50);
    }

    #[test]
    fn classifier_outputs_probabilities() {
        let (x, y) = step_data();
        let labels: Vec<f64> = y.iter().map(|v| if *v > 0.0 { 1.0 } else { 0.0 }).collect();
        let trainer = GbdtTrainer::classifier(small(20));
        let model = trainer.fit(&x, &labels).unwrap();
        let probs = trainer.predict(&model, &x).unwrap();
        for (p, l) in probs.iter().zip(&labels) {
            assert!((0.0..=1.0).contains(p));
            assert_eq!(*p >= 0.5, *l == 1.0);
        }
    }

    #[test]
    fn training_is_deterministic() {
        let (x, y) = step_data();
        let trainer = GbdtTrainer::regressor(small(10));
        let a = trainer.fit(&x, &y).unwrap();
        let b = trainer.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn json_form_needs_the_booster_reattached() {
        let (x, y) = step_data();
        let model = GbdtTrainer::regressor(small(10)).fit(&x, &y).unwrap();
        assert!(!model.booster_bytes().is_empty());

        let json = serde_json::to_string(&model).unwrap();
        let bare: GbdtModel = serde_json::from_str(&json).unwrap();
        assert!(bare.booster_bytes().is_empty());
        assert!(matches!(bare.validate(2), Err(TransformError::Model(_))));

        let restored = bare.with_booster(model.booster_bytes().to_vec());
        restored.validate(2).unwrap();
        assert_eq!(restored.predict(&x).unwrap(), model.predict(&x).unwrap());
    }

    #[test]
    fn rejects_bad_inputs() {
        let x = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let clf = GbdtTrainer::classifier(GbdtConfig::default());
        assert_eq!(clf.fit(&x, &[0.0, 2.0]).unwrap_err().exit_code(), 4);
        let empty = DMatrix::<f64>::zeros(0, 1);
        assert_eq!(clf.fit(&empty, &[]).unwrap_err().exit_code(), 3);
        let shallow = GbdtTrainer::regressor(GbdtConfig {
            max_depth: 0,
            ..GbdtConfig::default()
        });
        assert_eq!(shallow.fit(&x, &[1.0, 2.0]).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn width_mismatch_is_detected() {
        let (x, y) = step_data();
        let model = GbdtTrainer::regressor(small(2)).fit(&x, &y).unwrap();
        let narrow = DMatrix::from_row_slice(1, 1, &[1.0]);
        assert!(matches!(model.predict(&narrow), Err(TransformError::ColumnMismatch(_))));
        assert!(matches!(model.validate(3), Err(TransformError::ColumnMismatch(_))));
        model.validate(2).unwrap();
        assert!(model.predict(&DMatrix::<f64>::zeros(0, 2)).unwrap().is_empty());
    }
}
