// src/models/stats_models.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome counts of one gold mining pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldStats {
    pub attempts_considered: usize,
    /// Attempts whose deterministic key was incomplete and could not join.
    pub attempts_without_key: usize,
    pub joined_rows: usize,
    pub attempts_joined: usize,
    pub accepted: usize,
    pub ambiguous: usize,
    pub unmatched: usize,
    pub rejected_by_type: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeStats {
    pub positives_seen: usize,
    pub total: usize,
    pub per_strategy: BTreeMap<String, usize>,
    /// Positives for which a strategy's bucket had nothing eligible.
    pub empty_buckets: BTreeMap<String, usize>,
    /// Bucket members dropped because they would repeat a positive pair.
    pub positive_collisions_skipped: usize,
    pub address_global_cap_reached: bool,
}

impl NegativeStats {
    pub fn record_emitted(&mut self, strategy: &str, count: usize) {
        *self.per_strategy.entry(strategy.to_string()).or_insert(0) += count;
        self.total += count;
    }

    pub fn record_empty(&mut self, strategy: &str) {
        *self.empty_buckets.entry(strategy.to_string()).or_insert(0) += 1;
    }

    pub fn emitted(&self, strategy: &str) -> usize {
        self.per_strategy.get(strategy).copied().unwrap_or(0)
    }
}

/// Summary of one streaming inference run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingSummary {
    pub chunks_seen: usize,
    pub chunks_processed: usize,
    pub chunks_skipped: usize,
    pub chunks_without_candidates: usize,
    pub voters_read: usize,
    pub candidates_scored: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeSummary {
    pub chunk_files: usize,
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub attempts_assigned: usize,
}
