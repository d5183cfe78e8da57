// src/negatives/address_negatives.rs
use crate::matching::address::string_similarity;
use crate::models::{NegativePair, NegativeStats, NegativeStrategy, PositivePair};
use crate::negatives::hard_negatives::{dob_differs, SamplingContext};
use crate::negatives::NegativeSamplerConfig;

/// Voters living at (nearly) the attempt's address who differ in given name
/// or date of birth. Each positive scans the voter-file, so the pass stops at
/// `address_per_positive_cap` per positive and `address_global_cap` overall.
/// Deterministic: voters are scanned in collection order.
pub(crate) fn address_negatives(
    ctx: &SamplingContext<'_>,
    positives: &[PositivePair],
    config: &NegativeSamplerConfig,
    stats: &mut NegativeStats,
) -> Vec<NegativePair> {
    let mut out = Vec::new();
    if config.address_per_positive_cap == 0 || config.address_global_cap == 0 {
        return out;
    }

    for positive in positives {
        if out.len() >= config.address_global_cap {
            stats.address_global_cap_reached = true;
            log::info!(
                "Address negative global cap of {} reached, remaining positives skipped",
                config.address_global_cap
            );
            break;
        }
        let attempt = &ctx.attempts[positive.attempt_idx].key;
        if attempt.address.is_empty() {
            stats.record_empty(NegativeStrategy::AddressCollision.as_str());
            continue;
        }

        let mut emitted = 0;
        for (voter_idx, voter) in ctx.voters.iter().enumerate() {
            if emitted >= config.address_per_positive_cap || out.len() >= config.address_global_cap {
                break;
            }
            if voter.key.address.is_empty() {
                continue;
            }
            let differs = voter.key.first_name != attempt.first_name
                || dob_differs(voter.key.dob, attempt.dob);
            if !differs {
                continue;
            }
            if string_similarity(&attempt.address, &voter.key.address) < config.address_threshold {
                continue;
            }
            if ctx.is_positive(positive, voter_idx) {
                stats.positive_collisions_skipped += 1;
                continue;
            }
            out.push(ctx.negative(positive, voter_idx, NegativeStrategy::AddressCollision));
            emitted += 1;
        }
        if emitted == 0 {
            stats.record_empty(NegativeStrategy::AddressCollision.as_str());
        }
    }
    out
}
