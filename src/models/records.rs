// src/models/records.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One registration attempt, as read from the attempts export after column mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub registration_form_id: String,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub suffix: Option<String>,
    pub date_of_birth: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub zip: Option<String>,
    /// Free-text match-type label from the match results export.
    pub type_code: Option<String>,
    pub confidence_score: Option<f64>,
}

/// One registered voter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoterFileRecord {
    pub voter_id: String,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub suffix: Option<String>,
    pub date_of_birth: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub zip: Option<String>,
}

/// Comparable fields derived from a record. Empty strings stand for missing
/// text; initials and birth year are `None` when their source is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedKey {
    pub first_name: String,
    pub last_name: String,
    pub dob: Option<NaiveDate>,
    pub zip: String,
    pub birth_year: Option<i32>,
    pub first_phonetic: String,
    pub last_phonetic: String,
    pub first_initial: Option<char>,
    pub last_initial: Option<char>,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAttempt {
    pub record: AttemptRecord,
    pub key: NormalizedKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedVoter {
    pub record: VoterFileRecord,
    pub key: NormalizedKey,
}

/// Shared view over both normalized record kinds, used by the blocking index.
pub trait Keyed {
    fn key(&self) -> &NormalizedKey;
}

impl Keyed for NormalizedAttempt {
    fn key(&self) -> &NormalizedKey {
        &self.key
    }
}

impl Keyed for NormalizedVoter {
    fn key(&self) -> &NormalizedKey {
        &self.key
    }
}
