// src/utils/pipeline_state.rs
//! Chunk-level completion tracking for streaming runs.
//!
//! The store is a JSON object mapping chunk index (as a string) to `true`. It is
//! read once at the start of a run and rewritten after every finished chunk.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
    completed: BTreeMap<String, bool>,
}

impl CheckpointStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let completed = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read checkpoint file {}", path.display()))?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str::<BTreeMap<String, bool>>(&raw).with_context(|| {
                    format!("Checkpoint file {} is not a chunk map", path.display())
                })?
            }
        } else {
            debug!("No checkpoint file at {}, starting fresh", path.display());
            BTreeMap::new()
        };

        let done = completed.values().filter(|v| **v).count();
        if done > 0 {
            info!(
                "Checkpoint {}: {} chunk(s) already complete",
                path.display(),
                done
            );
        }
        Ok(Self { path, completed })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_complete(&self, chunk_idx: usize) -> bool {
        self.completed
            .get(&chunk_idx.to_string())
            .copied()
            .unwrap_or(false)
    }

    /// Completed chunk indices in numeric order. Keys that are not indices are ignored.
    pub fn completed_chunks(&self) -> Vec<usize> {
        let mut chunks: Vec<usize> = self
            .completed
            .iter()
            .filter(|(_, done)| **done)
            .filter_map(|(k, _)| k.trim().parse().ok())
            .collect();
        chunks.sort_unstable();
        chunks
    }

    /// Marks a chunk complete and persists the whole map before returning.
    pub fn mark_complete(&mut self, chunk_idx: usize) -> Result<()> {
        self.completed.insert(chunk_idx.to_string(), true);
        self.save()
    }

    /// Writes to a sibling temp file then renames it over the store.
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create checkpoint directory {}", parent.display())
                })?;
            }
        }
        let body = serde_json::to_string(&self.completed)
            .context("Failed to serialize checkpoint map")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)
            .with_context(|| format!("Failed to write checkpoint temp file {}", tmp.display()))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            warn!("Atomic checkpoint rename failed ({}), removing temp file", e);
            let _ = fs::remove_file(&tmp);
            return Err(e).with_context(|| {
                format!("Failed to replace checkpoint file {}", self.path.display())
            });
        }
        Ok(())
    }
}
