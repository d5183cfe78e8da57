pub mod address_negatives;
pub mod hard_negatives;
pub mod phonetic_negatives;

use log::info;
use std::env;

use crate::models::{NegativeStats, NegativeStrategy};
use crate::utils::env::{env_list, env_or};

pub use hard_negatives::{sample_negatives, NegativeSet};

/// Address similarity threshold for the training pipeline.
pub const ADDRESS_THRESHOLD_STRICT: f64 = 0.95;

#[derive(Debug, Clone)]
pub struct NegativeSamplerConfig {
    pub seed: u64,
    pub strategies: Vec<NegativeStrategy>,
    /// Negatives per positive for each bucket strategy (and random).
    pub per_strategy_cap: usize,
    pub address_threshold: f64,
    pub address_per_positive_cap: usize,
    /// Ceiling on address negatives across the whole run.
    pub address_global_cap: usize,
    /// Uniform draws tried before the random strategy gives up on a positive.
    pub random_draw_attempts: usize,
}

impl Default for NegativeSamplerConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            strategies: NegativeStrategy::defaults(),
            per_strategy_cap: 1,
            address_threshold: ADDRESS_THRESHOLD_STRICT,
            address_per_positive_cap: 5,
            address_global_cap: 5000,
            random_draw_attempts: 10,
        }
    }
}

impl NegativeSamplerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let seed = env::var("NEGATIVE_SEED")
            .or_else(|_| env::var("SEED"))
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.seed);

        let strategies = match env_list("NEGATIVE_STRATEGIES") {
            Some(names) => {
                let parsed: Vec<NegativeStrategy> = names
                    .iter()
                    .filter_map(|name| match name.parse() {
                        Ok(strategy) => Some(strategy),
                        Err(e) => {
                            log::warn!("Ignoring negative strategy: {}", e);
                            None
                        }
                    })
                    .collect();
                if parsed.is_empty() {
                    defaults.strategies.clone()
                } else {
                    parsed
                }
            }
            None => defaults.strategies.clone(),
        };

        Self {
            seed,
            strategies,
            per_strategy_cap: env_or("NEGATIVES_PER_STRATEGY", defaults.per_strategy_cap),
            address_threshold: env_or("ADDRESS_NEGATIVE_THRESHOLD", defaults.address_threshold)
                .clamp(0.0, 1.0),
            address_per_positive_cap: env_or(
                "ADDRESS_NEGATIVES_PER_POSITIVE",
                defaults.address_per_positive_cap,
            ),
            address_global_cap: env_or("ADDRESS_NEGATIVES_GLOBAL_CAP", defaults.address_global_cap),
            random_draw_attempts: env_or("RANDOM_NEGATIVE_DRAWS", defaults.random_draw_attempts)
                .max(1),
        }
    }

    pub fn log_config(&self) {
        info!("➖ Negative sampler configuration");
        info!("   Seed: {}", self.seed);
        info!(
            "   Strategies: {}",
            self.strategies
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        info!("   Per strategy per positive: {}", self.per_strategy_cap);
        info!(
            "   Address: threshold {:.2}, {} per positive, {} global",
            self.address_threshold, self.address_per_positive_cap, self.address_global_cap
        );
    }

    pub fn is_enabled(&self, strategy: NegativeStrategy) -> bool {
        self.strategies.contains(&strategy)
    }
}

pub(crate) fn log_negative_stats(stats: &NegativeStats) {
    for (strategy, count) in &stats.per_strategy {
        info!("   {:<20} {}", strategy, count);
    }
    for (strategy, count) in &stats.empty_buckets {
        log::debug!("   {} had nothing eligible for {} positive(s)", strategy, count);
    }
}
