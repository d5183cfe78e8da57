// src/loaders/column_map.rs
use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::loaders::frame::RecordFrame;

/// Internal column names shared by both collections.
pub mod internal {
    pub const REGISTRATION_FORM_ID: &str = "registration_form_id";
    pub const VOTER_ID: &str = "voter_id";
    pub const FIRST_NAME: &str = "first_name";
    pub const MIDDLE_NAME: &str = "middle_name";
    pub const LAST_NAME: &str = "last_name";
    pub const SUFFIX: &str = "suffix";
    pub const DATE_OF_BIRTH: &str = "date_of_birth";
    pub const ADDRESS_LINE_1: &str = "address_line_1";
    pub const ADDRESS_LINE_2: &str = "address_line_2";
    pub const ZIP: &str = "zip";
    pub const TYPE_CODE: &str = "type_code";
    pub const CONFIDENCE_SCORE: &str = "confidence_score";
}

const ATTEMPT_DEFAULTS: &[(&str, &str)] = &[
    ("name_suffix", internal::SUFFIX),
    ("voting_street_address_one", internal::ADDRESS_LINE_1),
    ("voting_street_address_two", internal::ADDRESS_LINE_2),
    ("voting_zipcode", internal::ZIP),
];

const VOTERFILE_DEFAULTS: &[(&str, &str)] = &[
    ("suffix_name", internal::SUFFIX),
    ("residence_address_1", internal::ADDRESS_LINE_1),
    ("residence_address_2", internal::ADDRESS_LINE_2),
    ("residence_zipcode", internal::ZIP),
    ("birth_date", internal::DATE_OF_BIRTH),
];

#[derive(Debug, Default, Deserialize)]
struct ColumnMapFile {
    #[serde(default)]
    attempts: HashMap<String, String>,
    #[serde(default)]
    voterfile: HashMap<String, String>,
}

/// Source -> internal column names for each collection. Source columns not
/// listed keep their own name, so inputs that already use internal names need
/// no entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    pub attempts: HashMap<String, String>,
    pub voterfile: HashMap<String, String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        let to_map = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>()
        };
        Self {
            attempts: to_map(ATTEMPT_DEFAULTS),
            voterfile: to_map(VOTERFILE_DEFAULTS),
        }
    }
}

impl ColumnMap {
    /// Defaults extended (and overridden) by a JSON file of the form
    /// `{"attempts": {...}, "voterfile": {...}}`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read column map {}", path.display()))?;
        let file: ColumnMapFile = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid column map {}", path.display()))?;
        let mut map = Self::default();
        map.attempts.extend(file.attempts);
        map.voterfile.extend(file.voterfile);
        Ok(map)
    }

    /// Defaults unless `COLUMN_MAP_PATH` names a file.
    pub fn from_env() -> Result<Self> {
        match env::var("COLUMN_MAP_PATH") {
            Ok(path) if !path.trim().is_empty() => {
                info!("Loading column map from {}", path);
                Self::from_json_file(path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn apply_to_attempts(&self, frame: &mut RecordFrame) {
        frame.rename_columns(&self.attempts);
    }

    pub fn apply_to_voterfile(&self, frame: &mut RecordFrame) {
        frame.rename_columns(&self.voterfile);
    }
}
