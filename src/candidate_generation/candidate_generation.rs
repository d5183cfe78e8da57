// src/candidate_generation/candidate_generation.rs
use std::collections::HashSet;

use crate::candidate_generation::blocking_index::{BlockingIndex, BlockingKeyKind};
use crate::models::{CandidatePair, NormalizedAttempt, NormalizedVoter};
use crate::utils::logging::{PipelineLogger, PipelinePhase};

/// Inner join of `attempts` against an index over `voters` on
/// (surname initial, birth year). Pairs come out in attempt order, then voter
/// order, with no repeated (registration_form_id, voter_id).
pub fn generate_candidates(
    attempts: &[NormalizedAttempt],
    voters: &[NormalizedVoter],
    voter_index: &BlockingIndex,
) -> Vec<CandidatePair> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut candidates = Vec::new();
    let mut unblockable = 0usize;

    for (attempt_idx, attempt) in attempts.iter().enumerate() {
        let Some(key) = BlockingKeyKind::SurnameInitialYear.key_for(&attempt.key) else {
            unblockable += 1;
            continue;
        };
        for &voter_idx in voter_index.lookup(&key) {
            let voter = &voters[voter_idx];
            let attempt_id = attempt.record.registration_form_id.as_str();
            let voter_id = voter.record.voter_id.as_str();
            if !seen.insert((attempt_id, voter_id)) {
                continue;
            }
            candidates.push(CandidatePair {
                attempt_idx,
                voter_idx,
                registration_form_id: attempt_id.to_string(),
                voter_id: voter_id.to_string(),
                blocking_key: key.clone(),
            });
        }
    }

    if unblockable > 0 {
        log::debug!(
            "{} attempt(s) lack a surname initial or birth year and produce no candidates",
            unblockable
        );
    }
    candidates
}

/// Builds the primary-key index over one voter-file chunk and joins against it.
pub fn generate_candidates_for_chunk(
    attempts: &[NormalizedAttempt],
    voters: &[NormalizedVoter],
) -> Vec<CandidatePair> {
    let logger = PipelineLogger::new(PipelinePhase::Blocking);
    let index = BlockingIndex::build(voters, &[BlockingKeyKind::SurnameInitialYear]);
    logger.log_debug(&format!(
        "Indexed {} voters into {} blocks (largest {})",
        index.record_count(),
        index.bucket_count(),
        index.largest_bucket()
    ));
    let candidates = generate_candidates(attempts, voters, &index);
    logger.log_count("Candidate pairs", candidates.len());
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::Normalizer;
    use crate::models::{AttemptRecord, BlockingKey, VoterFileRecord};

    fn attempt(id: &str, last: &str, dob: &str) -> NormalizedAttempt {
        Normalizer::default().normalize_attempt(AttemptRecord {
            registration_form_id: id.to_string(),
            first_name: Some("X".to_string()),
            last_name: Some(last.to_string()),
            date_of_birth: Some(dob.to_string()),
            ..Default::default()
        })
    }

    fn voter(id: &str, last: &str, dob: &str) -> NormalizedVoter {
        Normalizer::default().normalize_voter(VoterFileRecord {
            voter_id: id.to_string(),
            first_name: Some("Y".to_string()),
            last_name: Some(last.to_string()),
            date_of_birth: Some(dob.to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_joins_on_surname_initial_and_year() {
        let attempts = vec![attempt("A1", "Garcia", "1990-05-01"), attempt("A2", "Lopez", "1980-01-01")];
        let voters = vec![
            voter("V1", "Gonzalez", "1990-12-31"),
            voter("V2", "Garcia", "1991-05-01"),
            voter("V3", "Lee", "1980-06-06"),
        ];
        let pairs = generate_candidates_for_chunk(&attempts, &voters);
        let ids: Vec<(&str, &str)> = pairs
            .iter()
            .map(|p| (p.registration_form_id.as_str(), p.voter_id.as_str()))
            .collect();
        assert_eq!(ids, vec![("A1", "V1"), ("A2", "V3")]);
        assert_eq!(pairs[0].blocking_key, BlockingKey::SurnameInitialYear('g', 1990));
        assert_eq!(pairs[1].attempt_idx, 1);
        assert_eq!(pairs[1].voter_idx, 2);
    }

    #[test]
    fn test_duplicate_ids_are_collapsed() {
        let attempts = vec![attempt("A1", "Garcia", "1990-05-01"), attempt("A1", "Garcia", "1990-05-01")];
        let voters = vec![voter("V1", "Garcia", "1990-05-01"), voter("V1", "Garcia", "1990-05-01")];
        let pairs = generate_candidates_for_chunk(&attempts, &voters);
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_attempt_without_dob_has_no_candidates() {
        let attempts = vec![attempt("A1", "Garcia", "")];
        let voters = vec![voter("V1", "Garcia", "1990-05-01")];
        assert!(generate_candidates_for_chunk(&attempts, &voters).is_empty());
    }
}
