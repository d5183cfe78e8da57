// src/matching/normalizer.rs
use chrono::Datelike;

use crate::matching::address::{normalize_address, normalize_zip};
use crate::matching::date::parse_dob;
use crate::matching::name::{
    first_letter, normalize_given_name, normalize_surname, phonetic_code, NameTables,
};
use crate::models::{
    AttemptRecord, NormalizedAttempt, NormalizedKey, NormalizedVoter, VoterFileRecord,
};
use crate::utils::logging::{PipelineLogger, PipelinePhase};

/// Derives [`NormalizedKey`]s from raw records. Holds the name tables it was
/// built with; everything else is a pure function of the record.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    tables: NameTables,
}

impl Normalizer {
    pub fn new(tables: NameTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &NameTables {
        &self.tables
    }

    pub fn given_name(&self, raw: Option<&str>) -> Option<String> {
        normalize_given_name(raw, &self.tables)
    }

    pub fn surname(&self, raw: Option<&str>) -> Option<String> {
        normalize_surname(raw, &self.tables)
    }

    pub fn key_for(
        &self,
        first_name: Option<&str>,
        last_name: Option<&str>,
        date_of_birth: Option<&str>,
        zip: Option<&str>,
        address: Option<&str>,
    ) -> NormalizedKey {
        let first_name = self.given_name(first_name).unwrap_or_default();
        let last_name = self.surname(last_name).unwrap_or_default();
        let dob = parse_dob(date_of_birth);

        NormalizedKey {
            first_phonetic: phonetic_code(&first_name),
            last_phonetic: phonetic_code(&last_name),
            first_initial: first_letter(&first_name),
            last_initial: first_letter(&last_name),
            birth_year: dob.map(|d| d.year()),
            dob,
            zip: normalize_zip(zip),
            address: normalize_address(address),
            first_name,
            last_name,
        }
    }

    pub fn normalize_attempt(&self, record: AttemptRecord) -> NormalizedAttempt {
        let key = self.key_for(
            record.first_name.as_deref(),
            record.last_name.as_deref(),
            record.date_of_birth.as_deref(),
            record.zip.as_deref(),
            record.address_line_1.as_deref(),
        );
        NormalizedAttempt { record, key }
    }

    pub fn normalize_voter(&self, record: VoterFileRecord) -> NormalizedVoter {
        let key = self.key_for(
            record.first_name.as_deref(),
            record.last_name.as_deref(),
            record.date_of_birth.as_deref(),
            record.zip.as_deref(),
            record.address_line_1.as_deref(),
        );
        NormalizedVoter { record, key }
    }

    pub fn normalize_attempts(&self, records: Vec<AttemptRecord>) -> Vec<NormalizedAttempt> {
        let logger = PipelineLogger::new(PipelinePhase::Normalize);
        let normalized: Vec<_> = records
            .into_iter()
            .map(|r| self.normalize_attempt(r))
            .collect();
        log_unparsed_dobs(&logger, "attempt", normalized.iter().map(|a| &a.key));
        logger.log_data_loaded(normalized.len(), "normalized attempt");
        normalized
    }

    pub fn normalize_voters(&self, records: Vec<VoterFileRecord>) -> Vec<NormalizedVoter> {
        let logger = PipelineLogger::new(PipelinePhase::Normalize);
        let normalized: Vec<_> = records
            .into_iter()
            .map(|r| self.normalize_voter(r))
            .collect();
        log_unparsed_dobs(&logger, "voter", normalized.iter().map(|v| &v.key));
        logger.log_data_loaded(normalized.len(), "normalized voter");
        normalized
    }
}

fn log_unparsed_dobs<'a>(
    logger: &PipelineLogger,
    what: &str,
    keys: impl Iterator<Item = &'a NormalizedKey>,
) {
    let missing = keys.filter(|k| k.dob.is_none()).count();
    if missing > 0 {
        logger.log_debug(&format!(
            "{} {} record(s) without a usable date of birth",
            missing, what
        ));
    }
}
