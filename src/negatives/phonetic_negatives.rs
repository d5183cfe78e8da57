// src/negatives/phonetic_negatives.rs
//! Sound-alike negatives: voters whose name encodes to the same phonetic code
//! as the attempt's but who were born on a different day.

use crate::candidate_generation::BlockingKeyKind;
use crate::models::PositivePair;
use crate::negatives::hard_negatives::{dob_differs, SamplingContext};

/// Surname sounds like the attempt's; different dob; not the positive's own voter.
pub(crate) fn surname_phonetic_bucket(ctx: &SamplingContext<'_>, positive: &PositivePair) -> Vec<usize> {
    let attempt = &ctx.attempts[positive.attempt_idx].key;
    ctx.index
        .lookup_for(BlockingKeyKind::SurnamePhonetic, attempt)
        .iter()
        .copied()
        .filter(|&v| {
            let voter = &ctx.voters[v];
            dob_differs(voter.key.dob, attempt.dob) && voter.record.voter_id != positive.voter_id
        })
        .collect()
}

/// Given name sounds like the attempt's; different dob.
pub(crate) fn given_name_phonetic_bucket(
    ctx: &SamplingContext<'_>,
    positive: &PositivePair,
) -> Vec<usize> {
    let attempt = &ctx.attempts[positive.attempt_idx].key;
    ctx.index
        .lookup_for(BlockingKeyKind::GivenNamePhonetic, attempt)
        .iter()
        .copied()
        .filter(|&v| dob_differs(ctx.voters[v].key.dob, attempt.dob))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::Normalizer;
    use crate::models::{AttemptRecord, NormalizedAttempt, NormalizedVoter, VoterFileRecord};

    fn voter(id: &str, first: &str, last: &str, dob: &str) -> NormalizedVoter {
        Normalizer::default().normalize_voter(VoterFileRecord {
            voter_id: id.to_string(),
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            date_of_birth: Some(dob.to_string()),
            zip: Some("33101".to_string()),
            ..Default::default()
        })
    }

    fn setup() -> (Vec<NormalizedAttempt>, Vec<NormalizedVoter>, Vec<PositivePair>) {
        let attempts = vec![Normalizer::default().normalize_attempt(AttemptRecord {
            registration_form_id: "A1".to_string(),
            first_name: Some("Jon".to_string()),
            last_name: Some("Smith".to_string()),
            date_of_birth: Some("1980-02-02".to_string()),
            zip: Some("33101".to_string()),
            ..Default::default()
        })];
        let voters = vec![
            voter("V1", "Jon", "Smith", "1980-02-02"),
            voter("V2", "John", "Smyth", "1975-07-07"),
            voter("V3", "Jean", "Schmidt", "1980-02-02"),
            voter("V4", "Mary", "Smithe", "1990-01-01"),
        ];
        let positives = vec![PositivePair {
            attempt_idx: 0,
            voter_idx: 0,
            registration_form_id: "A1".to_string(),
            voter_id: "V1".to_string(),
        }];
        (attempts, voters, positives)
    }

    #[test]
    fn test_surname_phonetic_bucket() {
        let (attempts, voters, positives) = setup();
        let ctx = SamplingContext::new(&attempts, &voters, &positives);
        // Smith, Smyth, Smithe share S530; Schmidt (S530) shares the dob.
        assert_eq!(surname_phonetic_bucket(&ctx, &positives[0]), vec![1, 3]);
    }

    #[test]
    fn test_given_name_phonetic_bucket() {
        let (attempts, voters, positives) = setup();
        let ctx = SamplingContext::new(&attempts, &voters, &positives);
        // Jon, John, Jean share J500; Jean shares the dob, Jon is excluded by dob too.
        assert_eq!(given_name_phonetic_bucket(&ctx, &positives[0]), vec![1]);
    }
}
