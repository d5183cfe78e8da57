// src/utils/matching_config.rs
use log::info;
use std::env;
use std::path::PathBuf;

use crate::utils::env::env_or;

const DEFAULT_VOTERFILE_SQL: &str =
    "SELECT * FROM voterfile.election_detail_2024 WHERE county = 'DAD'";

/// Where voter-file records come from.
#[derive(Debug, Clone, PartialEq)]
pub enum VoterSourceConfig {
    Csv(PathBuf),
    Postgres { sql: String },
}

/// Paths and sizes shared by the training and streaming binaries.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub attempts_path: PathBuf,
    pub matches_path: PathBuf,
    pub voter_source: VoterSourceConfig,
    pub chunk_size: usize,
    pub chunk_output_dir: PathBuf,
    pub checkpoint_path: PathBuf,
    pub model_path: PathBuf,
    pub training_output_dir: PathBuf,
    pub name_tables_path: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let voter_source = match env::var("VOTERFILE_CSV") {
            Ok(path) if !path.trim().is_empty() => VoterSourceConfig::Csv(PathBuf::from(path)),
            _ => VoterSourceConfig::Postgres {
                sql: env::var("VOTERFILE_SQL")
                    .unwrap_or_else(|_| DEFAULT_VOTERFILE_SQL.to_string()),
            },
        };

        Self {
            attempts_path: PathBuf::from(
                env::var("ATTEMPTS_PATH").unwrap_or_else(|_| "data/vr_blocks_export.csv".to_string()),
            ),
            matches_path: PathBuf::from(
                env::var("MATCHES_PATH").unwrap_or_else(|_| "data/vr_match_export.csv".to_string()),
            ),
            voter_source,
            chunk_size: env_or("CHUNK_SIZE", 5000usize).max(1),
            chunk_output_dir: PathBuf::from(
                env::var("CHUNK_OUTPUT_DIR").unwrap_or_else(|_| "chunk_folder".to_string()),
            ),
            checkpoint_path: PathBuf::from(
                env::var("CHECKPOINT_PATH").unwrap_or_else(|_| "progress.json".to_string()),
            ),
            model_path: PathBuf::from(
                env::var("MODEL_PATH").unwrap_or_else(|_| "models/model.json".to_string()),
            ),
            training_output_dir: PathBuf::from(
                env::var("TRAINING_OUTPUT_DIR").unwrap_or_else(|_| "models".to_string()),
            ),
            name_tables_path: env::var("NAME_TABLES_PATH").ok().map(PathBuf::from),
        }
    }

    pub fn log_config(&self) {
        info!("🗂️  Pipeline configuration");
        info!("   Attempts: {}", self.attempts_path.display());
        info!("   Match results: {}", self.matches_path.display());
        match &self.voter_source {
            VoterSourceConfig::Csv(path) => info!("   Voter file: CSV {}", path.display()),
            VoterSourceConfig::Postgres { sql } => info!("   Voter file: PostgreSQL `{}`", sql),
        }
        info!("   Chunk size: {}", self.chunk_size);
        info!("   Chunk output dir: {}", self.chunk_output_dir.display());
        info!("   Checkpoint: {}", self.checkpoint_path.display());
        info!("   Model: {}", self.model_path.display());
        if let Some(path) = &self.name_tables_path {
            info!("   Name tables: {}", path.display());
        }
    }
}
