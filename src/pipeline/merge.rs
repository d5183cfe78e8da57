// src/pipeline/merge.rs
use anyhow::{bail, Context, Result};
use csv::StringRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::MergeSummary;
use crate::utils::logging::{PipelineLogger, PipelinePhase};

static CHUNK_FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^predicted_matches_chunk_(\d+)\.csv$").unwrap());

const ID_COLUMN: &str = "registration_form_id";
const PROB_COLUMN: &str = "match_prob";

/// Chunk artifacts in `dir`, ordered by numeric chunk index.
pub fn list_chunk_files(dir: &Path) -> Result<Vec<(usize, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(idx) = CHUNK_FILE_RE
            .captures(name)
            .and_then(|c| c[1].parse::<usize>().ok())
        {
            files.push((idx, path));
        }
    }
    files.sort_by_key(|(idx, _)| *idx);
    Ok(files)
}

fn parse_prob(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|p| p.is_finite())
}

/// Reads every chunk header up front so a bad chunk fails the merge before
/// any output is written. Returns the shared header and the id and
/// probability column positions.
fn check_chunk_headers(files: &[(usize, PathBuf)]) -> Result<Option<(StringRecord, usize, usize)>> {
    let mut shared: Option<(StringRecord, usize, usize)> = None;
    for (idx, path) in files {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open chunk file {}", path.display()))?;
        let header = reader
            .headers()
            .with_context(|| format!("Failed to read header of {}", path.display()))?
            .clone();
        match &shared {
            Some((h, _, _)) if *h != header => {
                bail!("Chunk {} has a different header than earlier chunks", idx);
            }
            Some(_) => {}
            None => {
                let id_col = header.iter().position(|c| c == ID_COLUMN);
                let prob_col = header.iter().position(|c| c == PROB_COLUMN);
                let (Some(id_col), Some(prob_col)) = (id_col, prob_col) else {
                    bail!(
                        "Chunk file {} lacks {} or {}",
                        path.display(),
                        ID_COLUMN,
                        PROB_COLUMN
                    );
                };
                shared = Some((header, id_col, prob_col));
            }
        }
    }
    Ok(shared)
}

/// Concatenates chunk artifacts into `merged_path` and writes the single
/// highest-probability row per attempt to `best_path`. On equal
/// probabilities the row seen first (lower chunk, then earlier row) wins.
pub fn merge_chunk_outputs(chunk_dir: &Path, merged_path: &Path, best_path: &Path) -> Result<MergeSummary> {
    let logger = PipelineLogger::new(PipelinePhase::Merge);
    let files = list_chunk_files(chunk_dir)?;
    logger.log_start(&format!("{} chunk files in {}", files.len(), chunk_dir.display()));

    let mut summary = MergeSummary {
        chunk_files: files.len(),
        ..Default::default()
    };
    let shared = check_chunk_headers(&files)?;
    let mut merged = csv::Writer::from_path(merged_path)
        .with_context(|| format!("Failed to create {}", merged_path.display()))?;
    if let Some((header, _, _)) = &shared {
        merged.write_record(header)?;
    }
    let mut best: HashMap<String, (f64, StringRecord)> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();

    for (_, path) in &files {
        let Some((_, id_col, prob_col)) = &shared else {
            break;
        };
        let (id_col, prob_col) = (*id_col, *prob_col);
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open chunk file {}", path.display()))?;

        for record in reader.records() {
            let record =
                record.with_context(|| format!("Failed to read a row of {}", path.display()))?;
            summary.rows_read += 1;
            let id = record.get(id_col).map(str::trim).unwrap_or_default();
            let Some(prob) = parse_prob(record.get(prob_col)) else {
                summary.rows_dropped += 1;
                continue;
            };
            if id.is_empty() {
                summary.rows_dropped += 1;
                continue;
            }
            merged.write_record(&record)?;

            match best.get_mut(id) {
                Some(current) if prob > current.0 => *current = (prob, record),
                Some(_) => {}
                None => {
                    first_seen.push(id.to_string());
                    best.insert(id.to_string(), (prob, record));
                }
            }
        }
    }
    merged.flush()?;

    let mut best_writer = csv::Writer::from_path(best_path)
        .with_context(|| format!("Failed to create {}", best_path.display()))?;
    if let Some((header, _, _)) = &shared {
        best_writer.write_record(header)?;
    }
    for id in &first_seen {
        if let Some((_, record)) = best.get(id) {
            best_writer.write_record(record)?;
        }
    }
    best_writer.flush()?;
    summary.attempts_assigned = first_seen.len();

    if summary.rows_dropped > 0 {
        logger.log_warning(&format!(
            "Dropped {} rows with a missing id or probability",
            summary.rows_dropped
        ));
    }
    logger.log_completion(&format!(
        "{} rows merged, {} attempts assigned",
        summary.rows_read - summary.rows_dropped,
        summary.attempts_assigned
    ));
    Ok(summary)
}
