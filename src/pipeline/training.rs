// src/pipeline/training.rs
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::features::build_feature_matrix;
use crate::gold::{mine_gold_pairs, GoldAuditRow, GoldConfig};
use crate::loaders::load_attempts::attempts_from_frame;
use crate::loaders::load_voterfile::voters_from_frame;
use crate::loaders::{read_all, ColumnMap, RecordFrame, RecordSource};
use crate::matching::Normalizer;
use crate::modeling::{train_and_evaluate, EvaluationMetrics};
use crate::models::{
    GoldStats, LabeledPair, NegativePair, NegativeStats, NormalizedAttempt, NormalizedVoter,
    PairOrigin, PositivePair,
};
use crate::negatives::{sample_negatives, NegativeSamplerConfig};
use crate::utils::logging::{PipelineLogger, PipelinePhase};

pub const MODEL_FILE: &str = "model.json";
pub const REPORT_FILE: &str = "training_report.json";
pub const TRAINING_PAIRS_FILE: &str = "training_pairs.csv";
pub const FEATURES_FILE: &str = "training_features.csv";
pub const GOLD_AUDIT_FILE: &str = "gold_audit.csv";

#[derive(Debug, Clone)]
pub struct TrainingSettings {
    pub gold: GoldConfig,
    pub negatives: NegativeSamplerConfig,
    pub column_map: ColumnMap,
    /// Where the model is written. Defaults to `<output_dir>/model.json`.
    pub model_path: Option<PathBuf>,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Same id as the saved model's `run_id`.
    pub run_id: String,
    pub started_at: NaiveDateTime,
    pub attempts_loaded: usize,
    pub voters_loaded: usize,
    pub gold: GoldStats,
    pub negatives: NegativeStats,
    pub positives: usize,
    pub training_rows: usize,
    pub metrics: EvaluationMetrics,
    pub model_path: String,
}

/// Positives first, then negatives in sampler order.
pub fn assemble_training_pairs(
    attempts: &[NormalizedAttempt],
    voters: &[NormalizedVoter],
    positives: &[PositivePair],
    negatives: &[NegativePair],
) -> Vec<LabeledPair> {
    let mut pairs = Vec::with_capacity(positives.len() + negatives.len());
    for p in positives {
        pairs.push(LabeledPair::from_records(
            &attempts[p.attempt_idx],
            &voters[p.voter_idx],
            PairOrigin::Gold,
            Some(1),
        ));
    }
    for n in negatives {
        pairs.push(LabeledPair::from_records(
            &attempts[n.attempt_idx],
            &voters[n.voter_idx],
            PairOrigin::Negative(n.strategy),
            Some(0),
        ));
    }
    pairs
}

fn write_csv_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write row to {}", path.display()))?;
    }
    writer.flush()?;
    Ok(())
}

/// Gold mining, negative sampling and model fitting over the labeled
/// attempts and the whole voter file drained from `voter_source`.
pub async fn run_training<S: RecordSource>(
    attempt_frame: &RecordFrame,
    voter_source: &mut S,
    normalizer: &Normalizer,
    settings: &TrainingSettings,
) -> Result<TrainingReport> {
    let logger = PipelineLogger::new(PipelinePhase::Training);
    let started_at = Utc::now().naive_utc();
    logger.log_start(&format!("{} attempt rows", attempt_frame.len()));

    let attempts = normalizer.normalize_attempts(attempts_from_frame(attempt_frame)?);
    logger.log_data_loaded(attempts.len(), "attempt");

    logger.log_phase("Reading voter file", Some(&voter_source.describe()));
    let mut voter_frame = read_all(voter_source).await?;
    settings.column_map.apply_to_voterfile(&mut voter_frame);
    let voters = normalizer.normalize_voters(voters_from_frame(&voter_frame)?);
    drop(voter_frame);
    logger.log_data_loaded(voters.len(), "voter");

    let gold = mine_gold_pairs(&attempts, &voters, &settings.gold);
    let negatives = sample_negatives(&attempts, &voters, &gold.positives, &settings.negatives);

    let pairs = assemble_training_pairs(&attempts, &voters, &gold.positives, &negatives.pairs);
    let (matrix, labels) = build_feature_matrix(&pairs);
    let labels = labels.context("Training pairs carry no labels")?;
    logger.log_count("Training rows", matrix.len());

    logger.log_phase("Fitting model", None);
    let (model, metrics) = train_and_evaluate(&matrix, &labels, settings.negatives.seed)?;

    fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!("Failed to create output directory {}", settings.output_dir.display())
    })?;
    let model_path = settings
        .model_path
        .clone()
        .unwrap_or_else(|| settings.output_dir.join(MODEL_FILE));
    model.save(&model_path)?;

    write_csv_rows(
        &settings.output_dir.join(TRAINING_PAIRS_FILE),
        pairs.iter().map(LabeledPair::to_row),
    )?;
    write_csv_rows::<&GoldAuditRow>(&settings.output_dir.join(GOLD_AUDIT_FILE), &gold.audit)?;
    let features_path = settings.output_dir.join(FEATURES_FILE);
    let features_file = File::create(&features_path)
        .with_context(|| format!("Failed to create {}", features_path.display()))?;
    matrix.write_csv(Some(labels.as_slice()), features_file)?;

    let report = TrainingReport {
        run_id: model.run_id.clone(),
        started_at,
        attempts_loaded: attempts.len(),
        voters_loaded: voters.len(),
        gold: gold.stats,
        negatives: negatives.stats,
        positives: gold.positives.len(),
        training_rows: matrix.len(),
        metrics,
        model_path: model_path.display().to_string(),
    };
    let report_path = settings.output_dir.join(REPORT_FILE);
    let report_json = serde_json::to_string_pretty(&report)?;
    fs::write(&report_path, report_json)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    logger.log_completion(&format!(
        "{} positives, {} negatives, model at {}",
        report.positives,
        report.negatives.total,
        report.model_path
    ));
    Ok(report)
}
