// src/gold/gold_pairs.rs
use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::env;

use crate::models::{GoldStats, NormalizedAttempt, NormalizedKey, NormalizedVoter, PositivePair};
use crate::utils::env::env_list;
use crate::utils::logging::{PipelineLogger, PipelinePhase};

/// Match-result types that describe a real registration linkage event.
pub const TRUE_MATCH_TYPES: &[&str] = &[
    "First time registrant",
    "Status change",
    "In-state move cross-county",
    "In-state move in-county",
    "Cross-state move",
];

/// Whether the match type gates the positive set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoldLabelPolicy {
    /// Every unambiguous deterministic join is a positive; the type flag is audit only.
    UniquenessOnly,
    /// Unambiguous joins must also carry a true match type.
    RequireTrueMatchType,
}

#[derive(Debug, Clone)]
pub struct GoldConfig {
    pub true_match_types: Vec<String>,
    pub policy: GoldLabelPolicy,
}

impl Default for GoldConfig {
    fn default() -> Self {
        Self {
            true_match_types: TRUE_MATCH_TYPES.iter().map(|s| s.to_string()).collect(),
            policy: GoldLabelPolicy::UniquenessOnly,
        }
    }
}

impl GoldConfig {
    /// `GOLD_LABEL_POLICY` = `uniqueness` (default) | `true_match_type`;
    /// `GOLD_TRUE_MATCH_TYPES` is a comma separated override of the type list.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let policy = match env::var("GOLD_LABEL_POLICY")
            .unwrap_or_default()
            .trim()
            .to_lowercase()
            .as_str()
        {
            "true_match_type" | "require_true_match_type" => GoldLabelPolicy::RequireTrueMatchType,
            _ => GoldLabelPolicy::UniquenessOnly,
        };
        Self {
            true_match_types: env_list("GOLD_TRUE_MATCH_TYPES")
                .filter(|types| !types.is_empty())
                .unwrap_or(defaults.true_match_types),
            policy,
        }
    }

    pub fn log_config(&self) {
        info!("🥇 Gold label configuration");
        info!("   Policy: {:?}", self.policy);
        info!("   True match types: {:?}", self.true_match_types);
    }

    pub fn is_true_match_type(&self, type_code: Option<&str>) -> bool {
        match type_code {
            Some(code) => self.true_match_types.iter().any(|t| t == code.trim()),
            None => false,
        }
    }
}

/// One row of the full deterministic join, kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldAuditRow {
    pub registration_form_id: String,
    pub voter_id: String,
    pub type_code: Option<String>,
    pub confidence_score: Option<f64>,
    pub is_true_match_type: bool,
    /// Distinct voter ids the attempt id joined to.
    pub voters_joined: usize,
    pub accepted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GoldPairs {
    pub positives: Vec<PositivePair>,
    pub audit: Vec<GoldAuditRow>,
    pub stats: GoldStats,
}

type DeterministicKey<'a> = (&'a str, &'a str, NaiveDate, &'a str);

/// (given name, surname, dob, zip); `None` if any component is missing, so
/// incomplete keys never join.
fn deterministic_key(key: &NormalizedKey) -> Option<DeterministicKey<'_>> {
    if key.first_name.is_empty() || key.last_name.is_empty() || key.zip.is_empty() {
        return None;
    }
    Some((&key.first_name, &key.last_name, key.dob?, &key.zip))
}

#[derive(Default)]
struct AttemptJoin {
    /// (attempt_idx, voter_idx) rows in join order.
    rows: Vec<(usize, usize)>,
    distinct_voters: Vec<String>,
}

/// Exact join on the deterministic key. An attempt id joining to exactly one
/// distinct voter id yields one positive; zero or several yield none.
pub fn mine_gold_pairs(
    attempts: &[NormalizedAttempt],
    voters: &[NormalizedVoter],
    config: &GoldConfig,
) -> GoldPairs {
    let logger = PipelineLogger::new(PipelinePhase::Gold);
    logger.log_start(&format!(
        "{} attempts x {} voters, policy {:?}",
        attempts.len(),
        voters.len(),
        config.policy
    ));

    let mut voter_keys: HashMap<DeterministicKey<'_>, Vec<usize>> = HashMap::new();
    for (idx, voter) in voters.iter().enumerate() {
        if let Some(key) = deterministic_key(&voter.key) {
            voter_keys.entry(key).or_default().push(idx);
        }
    }

    let mut stats = GoldStats::default();
    let mut order: Vec<&str> = Vec::new();
    let mut joins: HashMap<&str, AttemptJoin> = HashMap::new();
    let mut seen_ids: HashSet<&str> = HashSet::new();

    for (attempt_idx, attempt) in attempts.iter().enumerate() {
        let attempt_id = attempt.record.registration_form_id.as_str();
        if seen_ids.insert(attempt_id) {
            stats.attempts_considered += 1;
        }
        let Some(key) = deterministic_key(&attempt.key) else {
            stats.attempts_without_key += 1;
            continue;
        };
        let Some(matched) = voter_keys.get(&key) else {
            continue;
        };

        let join = joins.entry(attempt_id).or_insert_with(|| {
            order.push(attempt_id);
            AttemptJoin::default()
        });
        for &voter_idx in matched {
            join.rows.push((attempt_idx, voter_idx));
            let voter_id = &voters[voter_idx].record.voter_id;
            if !join.distinct_voters.contains(voter_id) {
                join.distinct_voters.push(voter_id.clone());
            }
        }
    }

    stats.attempts_joined = order.len();
    stats.unmatched = stats.attempts_considered - stats.attempts_joined;

    let mut positives = Vec::new();
    let mut audit = Vec::new();
    for attempt_id in order {
        let join = &joins[attempt_id];
        let voters_joined = join.distinct_voters.len();
        let (first_attempt_idx, first_voter_idx) = join.rows[0];
        let type_code = attempts[first_attempt_idx].record.type_code.as_deref();
        let is_true_type = config.is_true_match_type(type_code);

        let accepted = if voters_joined != 1 {
            stats.ambiguous += 1;
            false
        } else if config.policy == GoldLabelPolicy::RequireTrueMatchType && !is_true_type {
            stats.rejected_by_type += 1;
            false
        } else {
            stats.accepted += 1;
            positives.push(PositivePair {
                attempt_idx: first_attempt_idx,
                voter_idx: first_voter_idx,
                registration_form_id: attempt_id.to_string(),
                voter_id: voters[first_voter_idx].record.voter_id.clone(),
            });
            true
        };

        for &(attempt_idx, voter_idx) in &join.rows {
            let record = &attempts[attempt_idx].record;
            audit.push(GoldAuditRow {
                registration_form_id: attempt_id.to_string(),
                voter_id: voters[voter_idx].record.voter_id.clone(),
                type_code: record.type_code.clone(),
                confidence_score: record.confidence_score,
                is_true_match_type: config.is_true_match_type(record.type_code.as_deref()),
                voters_joined,
                accepted,
            });
        }
    }
    stats.joined_rows = audit.len();

    logger.log_count("Deterministic join rows", stats.joined_rows);
    logger.log_count("Ambiguous attempts excluded", stats.ambiguous);
    logger.log_count("Unmatched attempts", stats.unmatched);
    if stats.rejected_by_type > 0 {
        logger.log_count("Rejected by match type", stats.rejected_by_type);
    }
    logger.log_completion(&format!("{} gold positives", stats.accepted));

    GoldPairs {
        positives,
        audit,
        stats,
    }
}
