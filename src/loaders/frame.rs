// src/loaders/frame.rs
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::utils::validators::{require_columns, ValidationError};

const NULL_EQUIVALENTS: &[&str] = &["", "na", "nan", "null", "none", "undefined"];

/// Trimmed cell text, or `None` for the null spellings exports use.
pub fn clean_cell(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let lowered = trimmed.to_lowercase();
    if NULL_EQUIVALENTS.contains(&lowered.as_str()) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A column-named table of optional text cells. Every row has one cell per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFrame {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RecordFrame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Result<Self> {
        let mut frame = Self::new(columns);
        for row in rows {
            frame.push_row(row)?;
        }
        Ok(frame)
    }

    /// Convenience for tests and literals: raw strings, cleaned like CSV cells.
    pub fn from_raw(columns: &[&str], rows: &[&[&str]]) -> Result<Self> {
        let mut frame = Self::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            frame.push_raw_row(row.iter())?;
        }
        Ok(frame)
    }

    pub fn push_row(&mut self, row: Vec<Option<String>>) -> Result<()> {
        if row.len() != self.columns.len() {
            bail!(
                "Row has {} cells but the frame has {} columns",
                row.len(),
                self.columns.len()
            );
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn push_raw_row<I, S>(&mut self, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let row = cells.into_iter().map(|c| clean_cell(c.as_ref())).collect();
        self.push_row(row)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at (`row`, `column`); `None` when the column is absent or the cell missing.
    pub fn value(&self, row: usize, column: Option<usize>) -> Option<&str> {
        let column = column?;
        self.rows.get(row)?.get(column)?.as_deref()
    }

    pub fn value_by_name(&self, row: usize, column: &str) -> Option<&str> {
        self.value(row, self.column_index(column))
    }

    /// Fails with [`ValidationError::MissingColumns`] naming every absent column.
    pub fn require(&self, needed: &[&str], collection: &str) -> Result<(), ValidationError> {
        require_columns(&self.columns, needed, collection)
    }

    /// Renames columns found in `mapping`; others keep their names.
    pub fn rename_columns(&mut self, mapping: &HashMap<String, String>) {
        for column in self.columns.iter_mut() {
            if let Some(renamed) = mapping.get(column.as_str()) {
                *column = renamed.clone();
            }
        }
    }

    /// Appends `other`'s rows. Columns must match by name; order may differ.
    pub fn append(&mut self, other: RecordFrame) -> Result<()> {
        if self.columns.is_empty() && self.rows.is_empty() {
            *self = other;
            return Ok(());
        }
        if other.columns == self.columns {
            self.rows.extend(other.rows);
            return Ok(());
        }
        let mut positions = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            match other.column_index(column) {
                Some(idx) => positions.push(idx),
                None => bail!("Cannot append frame without column '{}'", column),
            }
        }
        if other.columns.len() != self.columns.len() {
            bail!(
                "Cannot append frame with {} columns to frame with {}",
                other.columns.len(),
                self.columns.len()
            );
        }
        for mut row in other.rows {
            let reordered = positions.iter().map(|&i| row[i].take()).collect();
            self.rows.push(reordered);
        }
        Ok(())
    }

    /// Keeps rows for which `keep` returns true.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Option<String>]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    pub fn from_csv_reader<R: Read>(reader: &mut csv::Reader<R>) -> Result<Self> {
        let headers = reader
            .headers()
            .context("Failed to read CSV header")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut frame = Self::new(headers);
        for (line, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Failed to read CSV row {}", line + 1))?;
            frame.push_raw_row(record.iter())?;
        }
        Ok(frame)
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open CSV {}", path.display()))?;
        Self::from_csv_reader(&mut reader)
            .with_context(|| format!("Failed to load CSV {}", path.display()))
    }
}
