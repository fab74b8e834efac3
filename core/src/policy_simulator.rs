//! Projected impact of a block/review threshold pair over the current
//! score distribution.
//!
//! Each score `s` is read as a fraud likelihood `p = s / 1000`.
//! Accounts at/above `block` are fully actioned; accounts in
//! [review, block) are actioned at the review rates from `PolicyParams`.
//!
//!   fraud_reduction     = Σ p · caught(s)   / Σ p
//!   false_positive_rate = Σ (1-p) · hit(s)  / Σ (1-p)
//!
//! Lowering either threshold can only move accounts into a band with an
//! equal or higher rate, so both metrics are monotone.

use crate::{
    config::PolicyParams,
    error::{EngineError, EngineResult},
    risk_scorer::RiskScore,
    types::MAX_RISK_SCORE,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyImpact {
    pub block_threshold:               u16,
    pub review_threshold:              u16,
    /// Share of expected fraud stopped, in [0, 1].
    pub projected_fraud_reduction:     f64,
    /// Share of expected legitimate accounts actioned, in [0, 1].
    pub projected_false_positive_rate: f64,
    /// Share of accounts scoring at/above the block threshold.
    pub block_fraction:                f64,
    /// Share of accounts scoring at/above the review threshold.
    pub review_fraction:               f64,
}

/// Reject contradictory or out-of-range threshold pairs.
pub fn validate_policy(block_threshold: u16, review_threshold: u16) -> EngineResult<()> {
    let reject = |reason: &str| EngineError::InvalidPolicy {
        block_threshold,
        review_threshold,
        reason: reason.to_string(),
    };
    if block_threshold > MAX_RISK_SCORE || review_threshold > MAX_RISK_SCORE {
        return Err(reject("thresholds must be within [0, 1000]"));
    }
    if block_threshold < review_threshold {
        return Err(reject("block threshold is below review threshold"));
    }
    Ok(())
}

pub fn simulate(
    scores: &[RiskScore],
    block_threshold: u16,
    review_threshold: u16,
    params: &PolicyParams,
) -> EngineResult<PolicyImpact> {
    validate_policy(block_threshold, review_threshold)?;

    let mut fraud_mass = 0.0;
    let mut legit_mass = 0.0;
    let mut fraud_caught = 0.0;
    let mut legit_hit = 0.0;
    let mut blocked = 0usize;
    let mut reviewed = 0usize;

    for score in scores {
        let s = score.value();
        let p = f64::from(s) / f64::from(MAX_RISK_SCORE);
        fraud_mass += p;
        legit_mass += 1.0 - p;

        if s >= block_threshold {
            blocked += 1;
            reviewed += 1;
            fraud_caught += p;
            legit_hit += 1.0 - p;
        } else if s >= review_threshold {
            reviewed += 1;
            fraud_caught += p * params.review_catch_rate;
            legit_hit += (1.0 - p) * params.review_friction;
        }
    }

    let n = scores.len();
    let impact = PolicyImpact {
        block_threshold,
        review_threshold,
        projected_fraud_reduction:     share(fraud_caught, fraud_mass),
        projected_false_positive_rate: share(legit_hit, legit_mass),
        block_fraction:                share(blocked as f64, n as f64),
        review_fraction:               share(reviewed as f64, n as f64),
    };

    log::debug!(
        "policy block={block_threshold} review={review_threshold}: fraud_reduction={:.3} fp_rate={:.3}",
        impact.projected_fraud_reduction,
        impact.projected_false_positive_rate
    );
    Ok(impact)
}

/// Evaluate block thresholds `from..=to` in `step` increments with a
/// fixed review threshold. Block values below `review_threshold` are
/// skipped rather than rejected.
pub fn sweep(
    scores: &[RiskScore],
    review_threshold: u16,
    from: u16,
    to: u16,
    step: u16,
    params: &PolicyParams,
) -> EngineResult<Vec<PolicyImpact>> {
    if step == 0 {
        return Err(EngineError::InvalidPolicy {
            block_threshold:  from,
            review_threshold,
            reason:           "sweep step must be positive".into(),
        });
    }
    let to = to.min(MAX_RISK_SCORE);
    // First grid point at or above review; the grid itself stays anchored at `from`.
    let start = if from >= review_threshold {
        from
    } else {
        let steps = (review_threshold - from).div_ceil(step);
        match from.checked_add(steps.saturating_mul(step)) {
            Some(start) => start,
            None => return Ok(Vec::new()),
        }
    };
    if start > to {
        return Ok(Vec::new());
    }
    (start..=to)
        .step_by(usize::from(step))
        .map(|block| simulate(scores, block, review_threshold, params))
        .collect()
}

fn share(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        (part / whole).clamp(0.0, 1.0)
    } else {
        0.0
    }
}
