// src/main.rs
use anyhow::{Context, Result};
use log::info;
use std::time::Instant;

use linkage_lib::gold::GoldConfig;
use linkage_lib::loaders::load_attempts::load_attempt_frame;
use linkage_lib::loaders::{ColumnMap, VoterSource};
use linkage_lib::matching::name::NameTables;
use linkage_lib::matching::Normalizer;
use linkage_lib::negatives::NegativeSamplerConfig;
use linkage_lib::pipeline::{run_training, TrainingSettings};
use linkage_lib::utils::env::load_env;
use linkage_lib::utils::get_memory_usage;
use linkage_lib::utils::matching_config::PipelineConfig;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting voter linkage model training");
    load_env();
    let start = Instant::now();

    let config = PipelineConfig::from_env();
    config.log_config();
    let gold = GoldConfig::from_env();
    gold.log_config();
    let negatives = NegativeSamplerConfig::from_env();
    negatives.log_config();
    let column_map = ColumnMap::from_env()?;
    let normalizer = Normalizer::new(NameTables::from_env()?);

    let attempt_frame = load_attempt_frame(
        &config.attempts_path,
        Some(config.matches_path.as_path()),
        &column_map,
    )
    .context("Failed to load labeled attempts")?;

    let mut voter_source = VoterSource::open(&config.voter_source, config.chunk_size).await?;

    let settings = TrainingSettings {
        gold,
        negatives,
        column_map,
        model_path: Some(config.model_path.clone()),
        output_dir: config.training_output_dir.clone(),
    };
    let report = run_training(&attempt_frame, &mut voter_source, &normalizer, &settings).await?;

    info!(
        "Training run {} finished in {:.2?} (memory {} MB)",
        report.run_id,
        start.elapsed(),
        get_memory_usage()
    );
    info!(
        "Gold: {} accepted, {} ambiguous, {} unmatched; negatives: {}",
        report.gold.accepted, report.gold.ambiguous, report.gold.unmatched, report.negatives.total
    );
    info!(
        "Held-out accuracy {:.4}, F1 {:.4}; model saved to {}",
        report.metrics.accuracy, report.metrics.f1, report.model_path
    );
    Ok(())
}
