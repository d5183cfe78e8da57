// src/bin/report_model_weights.rs
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use linkage_lib::modeling::LogisticModel;
use linkage_lib::utils::env::load_env;
use linkage_lib::utils::matching_config::PipelineConfig;

#[derive(Parser)]
#[command(author, version, about = "Print a trained model's parameters", long_about = None)]
struct ReportArgs {
    /// Model file; defaults to MODEL_PATH
    #[arg(long)]
    model: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    load_env();
    let args = ReportArgs::parse();
    let path = args
        .model
        .unwrap_or_else(|| PipelineConfig::from_env().model_path);
    let model = LogisticModel::load(&path)?;

    println!("--- Linkage Model: {} ---", path.display());
    println!("Run id:          {}", model.run_id);
    println!("Trained at:      {}", model.trained_at);
    println!("Training rows:   {}", model.training_rows);
    println!("Schema:          {}", model.schema_fingerprint);
    println!("Bias:            {:.6}", model.bias);
    println!("\n{:<25} | {:>12}", "Feature", "Weight");
    println!("{:-<25}-+-{:->12}", "", "");
    for (name, weight) in model.weights_by_magnitude() {
        println!("{:<25} | {:>12.6}", name, weight);
    }
    Ok(())
}
