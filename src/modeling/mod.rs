pub mod logistic;
pub mod predict;
pub mod train_eval;

use anyhow::Result;

use crate::features::FeatureMatrix;

pub use logistic::LogisticModel;
pub use predict::predict_chunk;
pub use train_eval::{train_and_evaluate, EvaluationMetrics};

/// Anything that turns feature rows into match probabilities in [0, 1].
pub trait MatchClassifier {
    fn predict_proba(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>>;
}
