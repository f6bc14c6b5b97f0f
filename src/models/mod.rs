//! The predictor capability.
//!
//! Training and inference only see the `Predictor` seam: fit a model on a
//! scaled feature matrix, then predict from it. The concrete learner is
//! XGBoost's gradient-boosted trees (`gbdt`).

use nalgebra::DMatrix;

use crate::error::AppError;

pub mod gbdt;
pub mod metrics;

pub use gbdt::{GbdtConfig, GbdtModel, GbdtTrainer, Objective};
pub use metrics::{Evaluation, accuracy, r2, rmse};

/// Something that can learn `y ≈ f(x)` and apply the learned `f`.
pub trait Predictor {
    type Model;

    fn fit(&self, x: &DMatrix<f64>, y: &[f64]) -> Result<Self::Model, AppError>;

    fn predict(&self, model: &Self::Model, x: &DMatrix<f64>) -> Result<Vec<f64>, AppError>;
}
