// src/bin/stream_inference.rs
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::env;
use std::fs;
use std::path::PathBuf;

use linkage_lib::loaders::column_map::internal;
use linkage_lib::loaders::load_attempts::{
    attempts_from_frame, filter_contains, filter_required, load_attempt_frame,
};
use linkage_lib::loaders::{ColumnMap, VoterSource};
use linkage_lib::matching::name::NameTables;
use linkage_lib::matching::Normalizer;
use linkage_lib::modeling::LogisticModel;
use linkage_lib::pipeline::{clear_chunk_outputs, run_streaming_inference, StreamingSettings};
use linkage_lib::utils::env::load_env;
use linkage_lib::utils::matching_config::PipelineConfig;
use linkage_lib::utils::pipeline_state::CheckpointStore;
use linkage_lib::utils::progress_config::ProgressConfig;

#[derive(Parser)]
#[command(author, version, about = "Score voter-file chunks against registration attempts", long_about = None)]
struct StreamArgs {
    /// Model file; defaults to MODEL_PATH
    #[arg(long)]
    model: Option<PathBuf>,

    /// Rows per voter-file chunk; defaults to CHUNK_SIZE
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Delete earlier chunk files and the checkpoint before starting
    #[arg(long)]
    fresh: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    load_env();
    let args = StreamArgs::parse();

    let mut config = PipelineConfig::from_env();
    if let Some(size) = args.chunk_size {
        config.chunk_size = size.max(1);
    }
    if let Some(model) = args.model {
        config.model_path = model;
    }
    config.log_config();
    let progress = ProgressConfig::from_env();
    let column_map = ColumnMap::from_env()?;
    let normalizer = Normalizer::new(NameTables::from_env()?);

    let model = LogisticModel::load(&config.model_path)?;
    info!(
        "Loaded model {} trained at {} on {} rows",
        model.run_id, model.trained_at, model.training_rows
    );

    if args.fresh {
        let removed = clear_chunk_outputs(&config.chunk_output_dir)?;
        if config.checkpoint_path.exists() {
            fs::remove_file(&config.checkpoint_path).with_context(|| {
                format!("Failed to remove {}", config.checkpoint_path.display())
            })?;
        }
        info!("Fresh run: removed {} chunk files and the checkpoint", removed);
    }

    let mut frame = load_attempt_frame(&config.attempts_path, None, &column_map)?;
    if let Ok(needle) = env::var("ATTEMPTS_UPLOAD_TIME_CONTAINS") {
        if !needle.trim().is_empty() {
            frame = filter_contains(&frame, "upload_time", needle.trim())?;
        }
    }
    let frame = filter_required(
        &frame,
        &[internal::FIRST_NAME, internal::LAST_NAME],
        Some(internal::REGISTRATION_FORM_ID),
    )?;
    let attempts = normalizer.normalize_attempts(attempts_from_frame(&frame)?);
    info!("Scoring {} attempts", attempts.len());

    let mut checkpoint = CheckpointStore::load(&config.checkpoint_path)?;
    let mut source = VoterSource::open(&config.voter_source, config.chunk_size).await?;
    let settings = StreamingSettings {
        output_dir: config.chunk_output_dir.clone(),
        column_map,
        progress,
    };

    let summary = run_streaming_inference(
        &attempts,
        &mut source,
        &model,
        &normalizer,
        &mut checkpoint,
        &settings,
    )
    .await?;
    info!(
        "Streaming done: {} processed, {} skipped, {} without candidates, {} pairs scored",
        summary.chunks_processed,
        summary.chunks_skipped,
        summary.chunks_without_candidates,
        summary.candidates_scored
    );
    Ok(())
}
