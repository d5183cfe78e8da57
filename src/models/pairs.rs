// src/models/pairs.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::records::{NormalizedAttempt, NormalizedKey, NormalizedVoter};

/// A value records are bucketed under in a [`crate::candidate_generation::BlockingIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockingKey {
    /// (surname initial, birth year), the primary candidate key.
    SurnameInitialYear(char, i32),
    Zip(String),
    Dob(NaiveDate),
    /// (given-name initial, surname initial)
    Initials(char, char),
    SurnamePhonetic(String),
    GivenNamePhonetic(String),
}

impl fmt::Display for BlockingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockingKey::SurnameInitialYear(initial, year) => write!(f, "ln0_year:{}:{}", initial, year),
            BlockingKey::Zip(zip) => write!(f, "zip:{}", zip),
            BlockingKey::Dob(dob) => write!(f, "dob:{}", dob.format("%Y-%m-%d")),
            BlockingKey::Initials(first, last) => write!(f, "initials:{}{}", first, last),
            BlockingKey::SurnamePhonetic(code) => write!(f, "ln_phonetic:{}", code),
            BlockingKey::GivenNamePhonetic(code) => write!(f, "fn_phonetic:{}", code),
        }
    }
}

/// Hard-negative sampling strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NegativeStrategy {
    ZipCollision,
    DobCollision,
    InitialsCollision,
    SurnamePhonetic,
    GivenNamePhonetic,
    AddressCollision,
    Random,
}

impl NegativeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            NegativeStrategy::ZipCollision => "zip",
            NegativeStrategy::DobCollision => "dob",
            NegativeStrategy::InitialsCollision => "initials",
            NegativeStrategy::SurnamePhonetic => "surname_phonetic",
            NegativeStrategy::GivenNamePhonetic => "given_name_phonetic",
            NegativeStrategy::AddressCollision => "address",
            NegativeStrategy::Random => "random",
        }
    }

    /// The strategies enabled unless configured otherwise.
    pub fn defaults() -> Vec<NegativeStrategy> {
        vec![
            NegativeStrategy::ZipCollision,
            NegativeStrategy::DobCollision,
            NegativeStrategy::InitialsCollision,
            NegativeStrategy::SurnamePhonetic,
            NegativeStrategy::AddressCollision,
            NegativeStrategy::Random,
        ]
    }
}

impl fmt::Display for NegativeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NegativeStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zip" => Ok(NegativeStrategy::ZipCollision),
            "dob" => Ok(NegativeStrategy::DobCollision),
            "initials" => Ok(NegativeStrategy::InitialsCollision),
            "surname_phonetic" | "phonetic" => Ok(NegativeStrategy::SurnamePhonetic),
            "given_name_phonetic" => Ok(NegativeStrategy::GivenNamePhonetic),
            "address" => Ok(NegativeStrategy::AddressCollision),
            "random" => Ok(NegativeStrategy::Random),
            other => Err(anyhow::anyhow!("Unknown negative strategy: {}", other)),
        }
    }
}

/// Unlabeled (attempt, voter) pair sharing a blocking key. Indices point into
/// the normalized collections the pair was generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePair {
    pub attempt_idx: usize,
    pub voter_idx: usize,
    pub registration_form_id: String,
    pub voter_id: String,
    pub blocking_key: BlockingKey,
}

/// Accepted gold pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositivePair {
    pub attempt_idx: usize,
    pub voter_idx: usize,
    pub registration_form_id: String,
    pub voter_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegativePair {
    pub attempt_idx: usize,
    pub voter_idx: usize,
    pub registration_form_id: String,
    pub voter_id: String,
    pub strategy: NegativeStrategy,
}

/// The fields of one side of a pair that feature extraction reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PairSide {
    pub first_name: String,
    pub last_name: String,
    pub dob: Option<NaiveDate>,
    pub zip: String,
    pub address: String,
}

impl PairSide {
    pub fn from_key(key: &NormalizedKey) -> Self {
        Self {
            first_name: key.first_name.clone(),
            last_name: key.last_name.clone(),
            dob: key.dob,
            zip: key.zip.clone(),
            address: key.address.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOrigin {
    Gold,
    Negative(NegativeStrategy),
    Candidate,
}

impl PairOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            PairOrigin::Gold => "gold",
            PairOrigin::Negative(strategy) => strategy.as_str(),
            PairOrigin::Candidate => "candidate",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledPair {
    pub registration_form_id: String,
    pub voter_id: String,
    pub attempt: PairSide,
    pub voter: PairSide,
    /// `None` for unlabeled candidates scored at inference time.
    pub is_match: Option<u8>,
    pub origin: PairOrigin,
}

impl LabeledPair {
    pub fn from_records(
        attempt: &NormalizedAttempt,
        voter: &NormalizedVoter,
        origin: PairOrigin,
        is_match: Option<u8>,
    ) -> Self {
        Self {
            registration_form_id: attempt.record.registration_form_id.clone(),
            voter_id: voter.record.voter_id.clone(),
            attempt: PairSide::from_key(&attempt.key),
            voter: PairSide::from_key(&voter.key),
            is_match,
            origin,
        }
    }

    pub fn to_row(&self) -> PairRow {
        PairRow {
            registration_form_id: self.registration_form_id.clone(),
            voter_id: self.voter_id.clone(),
            first_name_att: self.attempt.first_name.clone(),
            last_name_att: self.attempt.last_name.clone(),
            dob_norm_att: format_dob(self.attempt.dob),
            zip_norm_att: self.attempt.zip.clone(),
            address_att: self.attempt.address.clone(),
            first_name_vf: self.voter.first_name.clone(),
            last_name_vf: self.voter.last_name.clone(),
            dob_norm_vf: format_dob(self.voter.dob),
            zip_norm_vf: self.voter.zip.clone(),
            address_vf: self.voter.address.clone(),
            origin: self.origin.as_str().to_string(),
            is_match: self.is_match,
        }
    }
}

/// Flat CSV shape of a [`LabeledPair`]. The column names are the ones
/// [`crate::features::build_features_from_frame`] reads back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRow {
    pub registration_form_id: String,
    pub voter_id: String,
    pub first_name_att: String,
    pub last_name_att: String,
    pub dob_norm_att: String,
    pub zip_norm_att: String,
    pub address_att: String,
    pub first_name_vf: String,
    pub last_name_vf: String,
    pub dob_norm_vf: String,
    pub zip_norm_vf: String,
    pub address_vf: String,
    pub origin: String,
    pub is_match: Option<u8>,
}

/// One row of a chunk artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPairRow {
    pub registration_form_id: String,
    pub voter_id: String,
    pub blocking_key: String,
    pub first_name_att: String,
    pub last_name_att: String,
    pub dob_norm_att: String,
    pub zip_norm_att: String,
    pub address_att: String,
    pub first_name_vf: String,
    pub last_name_vf: String,
    pub dob_norm_vf: String,
    pub zip_norm_vf: String,
    pub address_vf: String,
    pub match_prob: f64,
}

impl ScoredPairRow {
    pub fn new(pair: &LabeledPair, blocking_key: &BlockingKey, match_prob: f64) -> Self {
        Self {
            registration_form_id: pair.registration_form_id.clone(),
            voter_id: pair.voter_id.clone(),
            blocking_key: blocking_key.to_string(),
            first_name_att: pair.attempt.first_name.clone(),
            last_name_att: pair.attempt.last_name.clone(),
            dob_norm_att: format_dob(pair.attempt.dob),
            zip_norm_att: pair.attempt.zip.clone(),
            address_att: pair.attempt.address.clone(),
            first_name_vf: pair.voter.first_name.clone(),
            last_name_vf: pair.voter.last_name.clone(),
            dob_norm_vf: format_dob(pair.voter.dob),
            zip_norm_vf: pair.voter.zip.clone(),
            address_vf: pair.voter.address.clone(),
            match_prob,
        }
    }
}

/// `YYYY-MM-DD`, or empty for a missing date.
pub fn format_dob(dob: Option<NaiveDate>) -> String {
    dob.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_names_round_trip() {
        for strategy in [
            NegativeStrategy::ZipCollision,
            NegativeStrategy::DobCollision,
            NegativeStrategy::InitialsCollision,
            NegativeStrategy::SurnamePhonetic,
            NegativeStrategy::GivenNamePhonetic,
            NegativeStrategy::AddressCollision,
            NegativeStrategy::Random,
        ] {
            assert_eq!(strategy.as_str().parse::<NegativeStrategy>().unwrap(), strategy);
        }
        assert!("soundalike".parse::<NegativeStrategy>().is_err());
        assert!(!NegativeStrategy::defaults().contains(&NegativeStrategy::GivenNamePhonetic));
    }

    #[test]
    fn test_blocking_key_display() {
        let dob = NaiveDate::from_ymd_opt(1990, 5, 1).unwrap();
        assert_eq!(BlockingKey::SurnameInitialYear('g', 1990).to_string(), "ln0_year:g:1990");
        assert_eq!(BlockingKey::Dob(dob).to_string(), "dob:1990-05-01");
        assert_eq!(BlockingKey::Initials('j', 'g').to_string(), "initials:jg");
    }

    #[test]
    fn test_format_dob() {
        assert_eq!(format_dob(None), "");
        assert_eq!(
            format_dob(NaiveDate::from_ymd_opt(2001, 12, 9)),
            "2001-12-09"
        );
    }
}
