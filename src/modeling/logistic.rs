// src/modeling/logistic.rs
use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::{LogisticRegression, LogisticRegressionParameters};
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::features::{schema_fingerprint, FeatureMatrix, FEATURE_COLUMNS, FEATURE_COUNT};
use crate::modeling::MatchClassifier;
use crate::utils::validators::ValidationError;

/// Binary logistic regression reduced to its parameters, persisted as JSON
/// together with the feature schema it was fitted on.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LogisticModel {
    pub columns: Vec<String>,
    pub schema_fingerprint: String,
    pub weights: Vec<f64>,
    pub bias: f64,
    pub trained_at: NaiveDateTime,
    pub run_id: String,
    pub training_rows: usize,
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl LogisticModel {
    pub fn from_parameters(weights: Vec<f64>, bias: f64, training_rows: usize) -> Result<Self> {
        if weights.len() != FEATURE_COUNT {
            bail!(
                "Expected {} weights, got {}",
                FEATURE_COUNT,
                weights.len()
            );
        }
        Ok(Self {
            columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            schema_fingerprint: schema_fingerprint(&FEATURE_COLUMNS),
            weights,
            bias,
            trained_at: Utc::now().naive_utc(),
            run_id: Uuid::new_v4().to_string(),
            training_rows,
        })
    }

    /// Fits on `matrix` with 0/1 `labels`. Both classes must be present.
    pub fn fit(matrix: &FeatureMatrix, labels: &[u8]) -> Result<Self> {
        if matrix.is_empty() {
            bail!("Cannot fit a model on an empty feature matrix");
        }
        if matrix.len() != labels.len() {
            bail!(
                "Feature matrix has {} rows but {} labels were given",
                matrix.len(),
                labels.len()
            );
        }
        let positives = labels.iter().filter(|&&l| l == 1).count();
        if positives == 0 || positives == labels.len() {
            bail!(
                "Training labels contain a single class ({} positives of {})",
                positives,
                labels.len()
            );
        }

        let x = DenseMatrix::from_2d_vec(&matrix.to_2d_vec());
        let y: Vec<i32> = labels.iter().map(|&l| l as i32).collect();
        let fitted = LogisticRegression::fit(&x, &y, LogisticRegressionParameters::default())
            .map_err(|e| anyhow!("Logistic regression fit failed: {}", e))?;

        let coefficients = fitted.coefficients();
        let (rows, cols) = coefficients.shape();
        let weights: Vec<f64> = (0..FEATURE_COUNT)
            .map(|j| {
                if rows == 1 {
                    *coefficients.get((0, j))
                } else {
                    *coefficients.get((j, 0))
                }
            })
            .collect();
        if rows * cols != FEATURE_COUNT {
            warn!(
                "Unexpected coefficient shape {}x{} for {} features",
                rows, cols, FEATURE_COUNT
            );
        }
        let bias = *fitted.intercept().get((0, 0));

        info!(
            "Fitted logistic model on {} rows ({} positives)",
            labels.len(),
            positives
        );
        Self::from_parameters(weights, bias, labels.len())
    }

    pub fn predict_row(&self, row: &[f64; FEATURE_COUNT]) -> f64 {
        let z: f64 = self
            .weights
            .iter()
            .zip(row.iter())
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias;
        sigmoid(z)
    }

    /// The model's column list must equal the running feature schema.
    pub fn verify_schema(&self) -> Result<(), ValidationError> {
        let actual: Vec<String> = FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect();
        if self.columns != actual || self.schema_fingerprint != schema_fingerprint(&FEATURE_COLUMNS) {
            return Err(ValidationError::ModelSchemaMismatch {
                expected: self.columns.clone(),
                actual,
            });
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create model directory {}", parent.display()))?;
            }
        }
        let body = serde_json::to_string_pretty(self).context("Failed to serialize model")?;
        fs::write(path, body).with_context(|| format!("Failed to write model to {}", path.display()))?;
        info!("Model saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model from {}", path.display()))?;
        let model: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to deserialize model JSON from {}", path.display()))?;
        model.verify_schema()?;
        if model.weights.len() != FEATURE_COUNT {
            bail!("Model has {} weights for {} features", model.weights.len(), FEATURE_COUNT);
        }
        info!(
            "Loaded model {} trained at {} on {} rows",
            model.run_id, model.trained_at, model.training_rows
        );
        Ok(model)
    }

    /// (column, weight) sorted by descending magnitude.
    pub fn weights_by_magnitude(&self) -> Vec<(String, f64)> {
        let mut pairs: Vec<(String, f64)> = self
            .columns
            .iter()
            .cloned()
            .zip(self.weights.iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        pairs
    }
}

impl MatchClassifier for LogisticModel {
    fn predict_proba(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        Ok(matrix.rows.iter().map(|row| self.predict_row(row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_model() -> LogisticModel {
        let mut weights = vec![0.0; FEATURE_COUNT];
        weights[0] = 4.0;
        weights[2] = 3.0;
        LogisticModel::from_parameters(weights, -3.5, 0).unwrap()
    }

    #[test]
    fn test_predict_row() {
        let model = toy_model();
        let mut row = [0.0; FEATURE_COUNT];
        assert!(model.predict_row(&row) < 0.05);
        row[0] = 1.0;
        row[2] = 1.0;
        assert!(model.predict_row(&row) > 0.95);
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-1000.0) >= 0.0 && sigmoid(1000.0) <= 1.0);
    }

    #[test]
    fn test_save_load_and_schema_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("model.json");
        let model = toy_model();
        model.save(&path).unwrap();
        assert_eq!(LogisticModel::load(&path).unwrap(), model);

        let mut stale = model.clone();
        stale.columns.swap(0, 1);
        stale.save(&path).unwrap();
        let err = LogisticModel::load(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::ModelSchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_fit_rejects_single_class() {
        let matrix = FeatureMatrix {
            rows: vec![[1.0; FEATURE_COUNT]; 4],
        };
        assert!(LogisticModel::fit(&matrix, &[1, 1, 1, 1]).is_err());
        assert!(LogisticModel::fit(&FeatureMatrix::default(), &[]).is_err());
    }

    #[test]
    fn test_fit_separates_classes() {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let positive = i % 2 == 0;
            let jitter = (i % 5) as f64 * 0.1;
            let base = if positive { 0.9 - jitter } else { 0.3 + jitter };
            let mut row = [base; FEATURE_COUNT];
            // A few noisy dob flags keep the classes from separating perfectly.
            let dob_agrees = positive != (i % 10 == 0 || i % 10 == 5);
            row[2] = if dob_agrees { 1.0 } else { 0.0 };
            rows.push(row);
            labels.push(positive as u8);
        }
        let matrix = FeatureMatrix { rows };
        let model = LogisticModel::fit(&matrix, &labels).unwrap();
        let probs = model.predict_proba(&matrix).unwrap();
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!(probs[2] > probs[1]);
        assert_eq!(model.training_rows, 40);
    }

    #[test]
    fn test_weights_by_magnitude() {
        let ranked = toy_model().weights_by_magnitude();
        assert_eq!(ranked[0].0, "fn_similarity");
        assert_eq!(ranked[1].0, "dob_exact");
    }
}
