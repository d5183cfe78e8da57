// src/negatives/hard_negatives.rs
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use crate::candidate_generation::{BlockingIndex, BlockingKeyKind};
use crate::models::{
    NegativePair, NegativeStats, NegativeStrategy, NormalizedAttempt, NormalizedVoter,
    PositivePair,
};
use crate::negatives::address_negatives::address_negatives;
use crate::negatives::phonetic_negatives::{given_name_phonetic_bucket, surname_phonetic_bucket};
use crate::negatives::{log_negative_stats, NegativeSamplerConfig};
use crate::utils::logging::{PipelineLogger, PipelinePhase};

/// Bucket strategies in the order they run for each positive.
const BUCKET_STRATEGIES: [NegativeStrategy; 5] = [
    NegativeStrategy::ZipCollision,
    NegativeStrategy::DobCollision,
    NegativeStrategy::InitialsCollision,
    NegativeStrategy::SurnamePhonetic,
    NegativeStrategy::GivenNamePhonetic,
];

#[derive(Debug, Clone, Default)]
pub struct NegativeSet {
    pub pairs: Vec<NegativePair>,
    pub stats: NegativeStats,
}

/// Read-only view shared by every strategy.
pub(crate) struct SamplingContext<'a> {
    pub attempts: &'a [NormalizedAttempt],
    pub voters: &'a [NormalizedVoter],
    pub index: BlockingIndex,
    positive_ids: HashSet<(&'a str, &'a str)>,
}

impl<'a> SamplingContext<'a> {
    pub fn new(
        attempts: &'a [NormalizedAttempt],
        voters: &'a [NormalizedVoter],
        positives: &'a [PositivePair],
    ) -> Self {
        let index = BlockingIndex::build(
            voters,
            &[
                BlockingKeyKind::Zip,
                BlockingKeyKind::Dob,
                BlockingKeyKind::Initials,
                BlockingKeyKind::SurnamePhonetic,
                BlockingKeyKind::GivenNamePhonetic,
            ],
        );
        let positive_ids = positives
            .iter()
            .map(|p| (p.registration_form_id.as_str(), p.voter_id.as_str()))
            .collect();
        Self {
            attempts,
            voters,
            index,
            positive_ids,
        }
    }

    /// True when (attempt, voter) repeats an identity pair from the positive set.
    pub fn is_positive(&self, positive: &PositivePair, voter_idx: usize) -> bool {
        self.positive_ids.contains(&(
            positive.registration_form_id.as_str(),
            self.voters[voter_idx].record.voter_id.as_str(),
        ))
    }

    pub fn negative(&self, positive: &PositivePair, voter_idx: usize, strategy: NegativeStrategy) -> NegativePair {
        NegativePair {
            attempt_idx: positive.attempt_idx,
            voter_idx,
            registration_form_id: positive.registration_form_id.clone(),
            voter_id: self.voters[voter_idx].record.voter_id.clone(),
            strategy,
        }
    }
}

/// Differs unless both dates are present and equal.
pub(crate) fn dob_differs(a: Option<NaiveDate>, b: Option<NaiveDate>) -> bool {
    !(a.is_some() && a == b)
}

/// Same zip as the attempt, different date of birth.
fn zip_bucket(ctx: &SamplingContext<'_>, positive: &PositivePair) -> Vec<usize> {
    let attempt = &ctx.attempts[positive.attempt_idx].key;
    ctx.index
        .lookup_for(BlockingKeyKind::Zip, attempt)
        .iter()
        .copied()
        .filter(|&v| dob_differs(ctx.voters[v].key.dob, attempt.dob))
        .collect()
}

/// Same date of birth as the attempt, different surname.
fn dob_bucket(ctx: &SamplingContext<'_>, positive: &PositivePair) -> Vec<usize> {
    let attempt = &ctx.attempts[positive.attempt_idx].key;
    ctx.index
        .lookup_for(BlockingKeyKind::Dob, attempt)
        .iter()
        .copied()
        .filter(|&v| ctx.voters[v].key.last_name != attempt.last_name)
        .collect()
}

fn initials_bucket(ctx: &SamplingContext<'_>, positive: &PositivePair) -> Vec<usize> {
    let attempt = &ctx.attempts[positive.attempt_idx].key;
    ctx.index
        .lookup_for(BlockingKeyKind::Initials, attempt)
        .to_vec()
}

fn bucket_for(
    strategy: NegativeStrategy,
    ctx: &SamplingContext<'_>,
    positive: &PositivePair,
) -> Vec<usize> {
    match strategy {
        NegativeStrategy::ZipCollision => zip_bucket(ctx, positive),
        NegativeStrategy::DobCollision => dob_bucket(ctx, positive),
        NegativeStrategy::InitialsCollision => initials_bucket(ctx, positive),
        NegativeStrategy::SurnamePhonetic => surname_phonetic_bucket(ctx, positive),
        NegativeStrategy::GivenNamePhonetic => given_name_phonetic_bucket(ctx, positive),
        NegativeStrategy::AddressCollision | NegativeStrategy::Random => Vec::new(),
    }
}

/// Up to `cap` uniform draws over the whole voter-file, each retried a bounded
/// number of times when it lands on a positive pair.
fn random_negatives(
    ctx: &SamplingContext<'_>,
    positive: &PositivePair,
    config: &NegativeSamplerConfig,
    rng: &mut StdRng,
    stats: &mut NegativeStats,
) -> Vec<usize> {
    let mut picked = Vec::new();
    if ctx.voters.is_empty() {
        return picked;
    }
    for _ in 0..config.per_strategy_cap {
        for _ in 0..config.random_draw_attempts {
            let voter_idx = rng.gen_range(0..ctx.voters.len());
            if ctx.is_positive(positive, voter_idx) {
                stats.positive_collisions_skipped += 1;
                continue;
            }
            picked.push(voter_idx);
            break;
        }
    }
    picked
}

/// Synthesizes hard negatives for every positive. Per positive the enabled
/// bucket strategies run in a fixed order, then the random draw; address
/// collisions are a separate capped pass afterwards. A seeded RNG makes the
/// output a pure function of inputs and config.
pub fn sample_negatives(
    attempts: &[NormalizedAttempt],
    voters: &[NormalizedVoter],
    positives: &[PositivePair],
    config: &NegativeSamplerConfig,
) -> NegativeSet {
    let logger = PipelineLogger::new(PipelinePhase::Negatives);
    logger.log_start(&format!(
        "{} positives against {} voters, seed {}",
        positives.len(),
        voters.len(),
        config.seed
    ));

    let ctx = SamplingContext::new(attempts, voters, positives);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut stats = NegativeStats {
        positives_seen: positives.len(),
        ..Default::default()
    };
    let mut pairs = Vec::new();

    for positive in positives {
        for strategy in BUCKET_STRATEGIES {
            if !config.is_enabled(strategy) {
                continue;
            }
            let bucket = bucket_for(strategy, &ctx, positive);
            let before = bucket.len();
            let eligible: Vec<usize> = bucket
                .into_iter()
                .filter(|&v| !ctx.is_positive(positive, v))
                .collect();
            stats.positive_collisions_skipped += before - eligible.len();

            if eligible.is_empty() {
                stats.record_empty(strategy.as_str());
                continue;
            }
            let chosen: Vec<usize> = eligible
                .choose_multiple(&mut rng, config.per_strategy_cap)
                .copied()
                .collect();
            stats.record_emitted(strategy.as_str(), chosen.len());
            pairs.extend(chosen.into_iter().map(|v| ctx.negative(positive, v, strategy)));
        }

        if config.is_enabled(NegativeStrategy::Random) {
            let chosen = random_negatives(&ctx, positive, config, &mut rng, &mut stats);
            if chosen.is_empty() {
                stats.record_empty(NegativeStrategy::Random.as_str());
            }
            stats.record_emitted(NegativeStrategy::Random.as_str(), chosen.len());
            pairs.extend(
                chosen
                    .into_iter()
                    .map(|v| ctx.negative(positive, v, NegativeStrategy::Random)),
            );
        }
    }

    if config.is_enabled(NegativeStrategy::AddressCollision) {
        let details = format!("threshold {:.2}", config.address_threshold);
        logger.log_phase("Address collisions", Some(details.as_str()));
        let address = address_negatives(&ctx, positives, config, &mut stats);
        stats.record_emitted(NegativeStrategy::AddressCollision.as_str(), address.len());
        pairs.extend(address);
    }

    log_negative_stats(&stats);
    logger.log_completion(&format!(
        "{} negatives ({} positive collisions skipped)",
        stats.total, stats.positive_collisions_skipped
    ));
    NegativeSet { pairs, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::Normalizer;
    use crate::models::{AttemptRecord, VoterFileRecord};

    fn attempt(id: &str, first: &str, last: &str, dob: &str, zip: &str) -> NormalizedAttempt {
        Normalizer::default().normalize_attempt(AttemptRecord {
            registration_form_id: id.to_string(),
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            date_of_birth: Some(dob.to_string()),
            zip: Some(zip.to_string()),
            ..Default::default()
        })
    }

    fn voter(id: &str, first: &str, last: &str, dob: &str, zip: &str) -> NormalizedVoter {
        Normalizer::default().normalize_voter(VoterFileRecord {
            voter_id: id.to_string(),
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            date_of_birth: Some(dob.to_string()),
            zip: Some(zip.to_string()),
            ..Default::default()
        })
    }

    fn positive(attempts: &[NormalizedAttempt], voters: &[NormalizedVoter], a: usize, v: usize) -> PositivePair {
        PositivePair {
            attempt_idx: a,
            voter_idx: v,
            registration_form_id: attempts[a].record.registration_form_id.clone(),
            voter_id: voters[v].record.voter_id.clone(),
        }
    }

    fn bucket_only(strategies: Vec<NegativeStrategy>) -> NegativeSamplerConfig {
        NegativeSamplerConfig {
            strategies,
            ..Default::default()
        }
    }

    #[test]
    fn test_zip_collision_requires_different_dob() {
        let attempts = vec![attempt("A1", "Jose", "Garcia", "1990-05-01", "33101")];
        let voters = vec![
            voter("V1", "Jose", "Garcia", "1990-05-01", "33101"),
            voter("V2", "Ana", "Lopez", "1990-05-01", "33101"),
            voter("V3", "Luis", "Perez", "1971-02-03", "33101"),
        ];
        let positives = vec![positive(&attempts, &voters, 0, 0)];
        let set = sample_negatives(
            &attempts,
            &voters,
            &positives,
            &bucket_only(vec![NegativeStrategy::ZipCollision]),
        );
        assert_eq!(set.pairs.len(), 1);
        assert_eq!(set.pairs[0].voter_id, "V3");
        assert_eq!(set.pairs[0].strategy, NegativeStrategy::ZipCollision);
    }

    #[test]
    fn test_dob_collision_requires_different_surname() {
        let attempts = vec![attempt("A1", "Jose", "Garcia", "1990-05-01", "33101")];
        let voters = vec![
            voter("V1", "Jose", "Garcia", "1990-05-01", "33101"),
            voter("V2", "Pedro", "Garcia", "1990-05-01", "33999"),
            voter("V3", "Ana", "Lopez", "1990-05-01", "33999"),
        ];
        let positives = vec![positive(&attempts, &voters, 0, 0)];
        let set = sample_negatives(
            &attempts,
            &voters,
            &positives,
            &bucket_only(vec![NegativeStrategy::DobCollision]),
        );
        let ids: Vec<&str> = set.pairs.iter().map(|p| p.voter_id.as_str()).collect();
        assert_eq!(ids, vec!["V3"]);
    }

    #[test]
    fn test_initials_collision_excludes_positive_pair() {
        let attempts = vec![attempt("A1", "Jose", "Garcia", "1990-05-01", "33101")];
        let voters = vec![voter("V1", "Jose", "Garcia", "1990-05-01", "33101")];
        let positives = vec![positive(&attempts, &voters, 0, 0)];
        let set = sample_negatives(
            &attempts,
            &voters,
            &positives,
            &bucket_only(vec![NegativeStrategy::InitialsCollision, NegativeStrategy::Random]),
        );
        assert!(set.pairs.is_empty());
        assert_eq!(set.stats.empty_buckets.get("initials"), Some(&1));
        assert_eq!(set.stats.empty_buckets.get("random"), Some(&1));
        assert!(set.stats.positive_collisions_skipped >= 1);
    }

    #[test]
    fn test_same_seed_same_negatives() {
        let attempts = vec![
            attempt("A1", "Jose", "Garcia", "1990-05-01", "33101"),
            attempt("A2", "Maria", "Lopez", "1985-03-03", "33133"),
        ];
        let voters: Vec<NormalizedVoter> = (0..40)
            .map(|i| {
                voter(
                    &format!("V{}", i),
                    if i % 2 == 0 { "Juan" } else { "Marta" },
                    if i % 3 == 0 { "Gomez" } else { "Lara" },
                    &format!("19{:02}-0{}-1{}", 50 + i, 1 + i % 9, i % 10),
                    if i % 2 == 0 { "33101" } else { "33133" },
                )
            })
            .chain([
                voter("VA", "Jose", "Garcia", "1990-05-01", "33101"),
                voter("VB", "Maria", "Lopez", "1985-03-03", "33133"),
            ])
            .collect();
        let positives = vec![
            positive(&attempts, &voters, 0, 40),
            positive(&attempts, &voters, 1, 41),
        ];
        let config = NegativeSamplerConfig::default();
        let first = sample_negatives(&attempts, &voters, &positives, &config);
        let second = sample_negatives(&attempts, &voters, &positives, &config);
        assert_eq!(first.pairs, second.pairs);
        assert!(first.stats.emitted("zip") == 2);
        assert!(first.stats.emitted("random") == 2);
    }

    #[test]
    fn test_dob_differs() {
        let d = NaiveDate::from_ymd_opt(1990, 5, 1);
        assert!(!dob_differs(d, d));
        assert!(dob_differs(d, None));
        assert!(dob_differs(None, None));
    }
}
