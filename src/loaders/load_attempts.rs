// src/loaders/load_attempts.rs
use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::loaders::column_map::{internal, ColumnMap};
use crate::loaders::frame::RecordFrame;
use crate::models::AttemptRecord;

pub const ATTEMPT_REQUIRED_COLUMNS: &[&str] = &[
    internal::REGISTRATION_FORM_ID,
    internal::FIRST_NAME,
    internal::LAST_NAME,
    internal::DATE_OF_BIRTH,
    internal::ZIP,
];

const MATCH_LABEL_COLUMNS: &[&str] = &[
    internal::REGISTRATION_FORM_ID,
    internal::TYPE_CODE,
    internal::CONFIDENCE_SCORE,
];

/// Inner join of attempts with match results on `registration_form_id`,
/// carrying over `type_code` and `confidence_score` (replacing any copies
/// already on the attempts). An attempt with several result rows appears
/// once per row.
pub fn attach_match_labels(attempts: &RecordFrame, matches: &RecordFrame) -> Result<RecordFrame> {
    matches.require(MATCH_LABEL_COLUMNS, "matches")?;
    attempts.require(&[internal::REGISTRATION_FORM_ID], "attempts")?;

    let m_id = matches.column_index(internal::REGISTRATION_FORM_ID);
    let m_type = matches.column_index(internal::TYPE_CODE);
    let m_conf = matches.column_index(internal::CONFIDENCE_SCORE);

    let mut labels: HashMap<&str, Vec<(Option<String>, Option<String>)>> = HashMap::new();
    for row in 0..matches.len() {
        if let Some(id) = matches.value(row, m_id) {
            labels.entry(id).or_default().push((
                matches.value(row, m_type).map(str::to_string),
                matches.value(row, m_conf).map(str::to_string),
            ));
        }
    }

    let kept: Vec<usize> = attempts
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.as_str() != internal::TYPE_CODE && c.as_str() != internal::CONFIDENCE_SCORE)
        .map(|(i, _)| i)
        .collect();
    let mut columns: Vec<String> = kept.iter().map(|&i| attempts.columns()[i].clone()).collect();
    columns.push(internal::TYPE_CODE.to_string());
    columns.push(internal::CONFIDENCE_SCORE.to_string());

    let a_id = attempts.column_index(internal::REGISTRATION_FORM_ID);
    let mut joined = RecordFrame::new(columns);
    for (row, cells) in attempts.rows().iter().enumerate() {
        let Some(rows) = attempts.value(row, a_id).and_then(|id| labels.get(id)) else {
            continue;
        };
        for (type_code, confidence) in rows {
            let mut out: Vec<Option<String>> = kept.iter().map(|&i| cells[i].clone()).collect();
            out.push(type_code.clone());
            out.push(confidence.clone());
            joined.push_row(out)?;
        }
    }

    info!(
        "Attached match labels: {} of {} attempt rows joined",
        joined.len(),
        attempts.len()
    );
    Ok(joined)
}

/// Drops rows with a missing value in any of `fields` and, when `unique_by`
/// is given, keeps only the first row per value of that column.
pub fn filter_required(frame: &RecordFrame, fields: &[&str], unique_by: Option<&str>) -> Result<RecordFrame> {
    frame.require(fields, "attempts")?;
    if let Some(column) = unique_by {
        if !frame.has_column(column) {
            bail!("Unique column '{}' not found in frame", column);
        }
    }

    let positions: Vec<usize> = fields.iter().filter_map(|f| frame.column_index(f)).collect();
    let unique_idx = unique_by.and_then(|c| frame.column_index(c));

    let mut out = frame.clone();
    let mut seen: HashSet<Option<String>> = HashSet::new();
    out.retain_rows(|row| {
        if positions.iter().any(|&i| row[i].is_none()) {
            return false;
        }
        match unique_idx {
            Some(i) => seen.insert(row[i].clone()),
            None => true,
        }
    });
    info!(
        "Required-field filter on {:?}: {} -> {} rows",
        fields,
        frame.len(),
        out.len()
    );
    Ok(out)
}

/// Keeps rows whose `column` contains `needle` (e.g. an upload year).
pub fn filter_contains(frame: &RecordFrame, column: &str, needle: &str) -> Result<RecordFrame> {
    frame.require(&[column], "attempts")?;
    let idx = frame.column_index(column);
    let mut out = frame.clone();
    out.retain_rows(|row| {
        idx.and_then(|i| row[i].as_deref())
            .map(|v| v.contains(needle))
            .unwrap_or(false)
    });
    info!("Filter {} contains '{}': {} -> {} rows", column, needle, frame.len(), out.len());
    Ok(out)
}

/// Typed attempts from a frame already renamed to internal columns.
pub fn attempts_from_frame(frame: &RecordFrame) -> Result<Vec<AttemptRecord>> {
    frame.require(ATTEMPT_REQUIRED_COLUMNS, "attempts")?;

    let col = |name: &str| frame.column_index(name);
    let (id, first, middle, last, suffix) = (
        col(internal::REGISTRATION_FORM_ID),
        col(internal::FIRST_NAME),
        col(internal::MIDDLE_NAME),
        col(internal::LAST_NAME),
        col(internal::SUFFIX),
    );
    let (dob, addr1, addr2, zip, type_code, confidence) = (
        col(internal::DATE_OF_BIRTH),
        col(internal::ADDRESS_LINE_1),
        col(internal::ADDRESS_LINE_2),
        col(internal::ZIP),
        col(internal::TYPE_CODE),
        col(internal::CONFIDENCE_SCORE),
    );
    let text = |row: usize, c: Option<usize>| frame.value(row, c).map(str::to_string);

    let mut records = Vec::with_capacity(frame.len());
    let mut without_id = 0usize;
    for row in 0..frame.len() {
        let Some(registration_form_id) = text(row, id) else {
            without_id += 1;
            continue;
        };
        records.push(AttemptRecord {
            registration_form_id,
            first_name: text(row, first),
            middle_name: text(row, middle),
            last_name: text(row, last),
            suffix: text(row, suffix),
            date_of_birth: text(row, dob),
            address_line_1: text(row, addr1),
            address_line_2: text(row, addr2),
            zip: text(row, zip),
            type_code: text(row, type_code),
            confidence_score: frame.value(row, confidence).and_then(|v| v.parse().ok()),
        });
    }
    if without_id > 0 {
        warn!("Skipped {} attempt row(s) without registration_form_id", without_id);
    }
    Ok(records)
}

/// Reads the attempts export, maps its columns and, when `matches_path` is
/// given, joins the match-result labels.
pub fn load_attempt_frame(
    attempts_path: &Path,
    matches_path: Option<&Path>,
    column_map: &ColumnMap,
) -> Result<RecordFrame> {
    let mut attempts = RecordFrame::from_csv_path(attempts_path)
        .with_context(|| format!("Failed to load attempts from {}", attempts_path.display()))?;
    column_map.apply_to_attempts(&mut attempts);
    info!("Loaded {} attempt rows from {}", attempts.len(), attempts_path.display());

    match matches_path {
        Some(path) => {
            let matches = RecordFrame::from_csv_path(path)
                .with_context(|| format!("Failed to load match results from {}", path.display()))?;
            attach_match_labels(&attempts, &matches)
        }
        None => Ok(attempts),
    }
}
