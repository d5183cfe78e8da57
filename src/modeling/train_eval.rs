// src/modeling/train_eval.rs
use anyhow::{bail, Result};
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::features::FeatureMatrix;
use crate::modeling::logistic::LogisticModel;
use crate::modeling::MatchClassifier;

pub const TEST_FRACTION: f64 = 0.25;
const DECISION_THRESHOLD: f64 = 0.5;

/// Held-out metrics of one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub train_rows: usize,
    pub test_rows: usize,
    pub test_positives: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// `None` when the test split holds a single class.
    pub roc_auc: Option<f64>,
    pub threshold: f64,
}

/// Seeded split that keeps each class's share in both parts. Each class with
/// at least two members contributes at least one test row.
pub fn stratified_split(labels: &[u8], test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in [0u8, 1u8] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == class)
            .map(|(i, _)| i)
            .collect();
        members.shuffle(&mut rng);
        let mut n_test = (members.len() as f64 * test_fraction).round() as usize;
        if n_test == 0 && members.len() >= 2 {
            n_test = 1;
        }
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// Mann-Whitney estimate of ROC AUC with average ranks for ties.
pub fn roc_auc(probs: &[f64], labels: &[u8]) -> Option<f64> {
    let positives = labels.iter().filter(|&&l| l == 1).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|&a, &b| probs[a].total_cmp(&probs[b]));

    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && probs[order[j + 1]] == probs[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; tied block i..=j shares the average.
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if labels[idx] == 1 {
                rank_sum += avg_rank;
            }
        }
        i = j + 1;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Some((rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn evaluate(probs: &[f64], labels: &[u8], train_rows: usize) -> EvaluationMetrics {
    let (mut tp, mut fp, mut tn, mut fn_) = (0usize, 0usize, 0usize, 0usize);
    for (&p, &l) in probs.iter().zip(labels) {
        match (p >= DECISION_THRESHOLD, l == 1) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, false) => tn += 1,
            (false, true) => fn_ += 1,
        }
    }
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    EvaluationMetrics {
        train_rows,
        test_rows: labels.len(),
        test_positives: tp + fn_,
        accuracy: ratio(tp + tn, labels.len()),
        precision,
        recall,
        f1,
        roc_auc: roc_auc(probs, labels),
        threshold: DECISION_THRESHOLD,
    }
}

/// Stratified 75/25 split, fit on the first part, metrics on the second.
pub fn train_and_evaluate(
    matrix: &FeatureMatrix,
    labels: &[u8],
    seed: u64,
) -> Result<(LogisticModel, EvaluationMetrics)> {
    if matrix.len() != labels.len() {
        bail!(
            "Feature matrix has {} rows but {} labels were given",
            matrix.len(),
            labels.len()
        );
    }
    let (train_idx, test_idx) = stratified_split(labels, TEST_FRACTION, seed);
    if test_idx.is_empty() {
        bail!("Not enough labeled rows ({}) for a held-out split", labels.len());
    }

    let train_x = matrix.select(&train_idx);
    let train_y: Vec<u8> = train_idx.iter().map(|&i| labels[i]).collect();
    let model = LogisticModel::fit(&train_x, &train_y)?;

    let test_x = matrix.select(&test_idx);
    let test_y: Vec<u8> = test_idx.iter().map(|&i| labels[i]).collect();
    let probs = model.predict_proba(&test_x)?;
    let metrics = evaluate(&probs, &test_y, train_idx.len());

    info!(
        "Held-out metrics: accuracy {:.4}, precision {:.4}, recall {:.4}, f1 {:.4}, auc {}",
        metrics.accuracy,
        metrics.precision,
        metrics.recall,
        metrics.f1,
        metrics
            .roc_auc
            .map(|a| format!("{:.4}", a))
            .unwrap_or_else(|| "n/a".to_string())
    );
    Ok((model, metrics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_COUNT;

    #[test]
    fn test_stratified_split_keeps_ratio() {
        let labels: Vec<u8> = (0..40).map(|i| (i < 8) as u8).collect();
        let (train, test) = stratified_split(&labels, 0.25, 42);
        assert_eq!(train.len() + test.len(), 40);
        assert_eq!(test.len(), 10);
        assert_eq!(test.iter().filter(|&&i| labels[i] == 1).count(), 2);
        assert_eq!(stratified_split(&labels, 0.25, 42), (train, test));
    }

    #[test]
    fn test_roc_auc() {
        assert_eq!(roc_auc(&[0.1, 0.4, 0.35, 0.8], &[0, 0, 1, 1]), Some(0.75));
        assert_eq!(roc_auc(&[0.5, 0.5], &[0, 1]), Some(0.5));
        assert_eq!(roc_auc(&[0.2, 0.9], &[1, 1]), None);
    }

    #[test]
    fn test_evaluate_counts() {
        let metrics = evaluate(&[0.9, 0.6, 0.2, 0.1], &[1, 0, 1, 0], 12);
        assert_eq!(metrics.accuracy, 0.5);
        assert_eq!(metrics.precision, 0.5);
        assert_eq!(metrics.recall, 0.5);
        assert_eq!(metrics.f1, 0.5);
        assert_eq!(metrics.train_rows, 12);
        assert_eq!(metrics.test_positives, 2);
    }

    #[test]
    fn test_train_and_evaluate() {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..80 {
            let positive = i % 4 == 0;
            let noise = (i % 7) as f64 * 0.05;
            let mut row = [0.0; FEATURE_COUNT];
            row[0] = if positive { 0.95 - noise } else { 0.55 + noise };
            row[1] = if positive { 0.9 - noise } else { 0.5 + noise };
            row[2] = if positive == (i % 9 != 0) { 1.0 } else { 0.0 };
            rows.push(row);
            labels.push(positive as u8);
        }
        let matrix = FeatureMatrix { rows };
        let (_, metrics) = train_and_evaluate(&matrix, &labels, 42).unwrap();
        assert_eq!(metrics.test_rows, 20);
        assert_eq!(metrics.test_positives, 5);
        assert!(metrics.roc_auc.unwrap() > 0.8);
    }
}
