// src/bin/merge_chunks.rs
use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

use linkage_lib::pipeline::merge_chunk_outputs;
use linkage_lib::utils::env::load_env;
use linkage_lib::utils::matching_config::PipelineConfig;

#[derive(Parser)]
#[command(author, version, about = "Merge chunk predictions and keep the best voter per attempt", long_about = None)]
struct MergeArgs {
    /// Directory holding predicted_matches_chunk_<n>.csv; defaults to CHUNK_OUTPUT_DIR
    #[arg(long)]
    chunk_dir: Option<PathBuf>,

    /// Every scored row from every chunk
    #[arg(long, default_value = "predicted_matches_all.csv")]
    merged: PathBuf,

    /// One highest-probability row per attempt
    #[arg(long, default_value = "predicted_matches_best.csv")]
    best: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    load_env();
    let args = MergeArgs::parse();
    let chunk_dir = args
        .chunk_dir
        .unwrap_or_else(|| PipelineConfig::from_env().chunk_output_dir);

    let summary = merge_chunk_outputs(&chunk_dir, &args.merged, &args.best)?;
    info!(
        "Merged {} chunk files ({} rows, {} dropped); {} attempts assigned -> {}",
        summary.chunk_files,
        summary.rows_read,
        summary.rows_dropped,
        summary.attempts_assigned,
        args.best.display()
    );
    Ok(())
}
