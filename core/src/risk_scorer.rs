//! Per-account risk score in [0, 1000].
//!
//! Each raw field maps to a sub-score in [0, 1] through a saturating
//! threshold from `SignalThresholds`. The weighted sub-scores are
//! normalized by the total weight and scaled to [0, 1000]. Ring severity
//! enters as one more additive term, never a multiplier.
//!
//! Same account + same weights ⇒ same score. Nothing here reads a clock
//! or an RNG.

use crate::{
    account::Account,
    config::{EngineConfig, SignalThresholds, SignalWeights},
    ring_detector::Ring,
    types::{AccountId, MAX_RISK_SCORE},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SIGNAL_VELOCITY: &str = "velocity";
pub const SIGNAL_GEO_ANOMALY: &str = "geo_anomaly";
pub const SIGNAL_BONUS_ABUSE: &str = "bonus_abuse";
pub const SIGNAL_CHARGEBACK: &str = "chargeback";
pub const SIGNAL_DEVICE_REPUTATION: &str = "device_reputation";
pub const SIGNAL_RING: &str = "ring";

/// Integer risk score in [0, 1000].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RiskScore(u16);

impl RiskScore {
    pub const MIN: RiskScore = RiskScore(0);
    pub const MAX: RiskScore = RiskScore(MAX_RISK_SCORE);

    /// Values above 1000 are clamped.
    pub fn new(value: u16) -> Self {
        Self(value.min(MAX_RISK_SCORE))
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

/// Normalized per-signal sub-scores, each in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub velocity:          f64,
    pub geo_anomaly:       f64,
    pub bonus_abuse:       f64,
    pub chargeback:        f64,
    pub device_reputation: f64,
    /// Ring severity, `None` when the account is in no ring.
    pub ring:              Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub account_id: AccountId,
    pub score:      RiskScore,
    /// Signal name → contribution in score points. Sums to the score
    /// before rounding.
    pub breakdown:  BTreeMap<String, f64>,
    pub ring_id:    Option<String>,
}

impl RiskAssessment {
    /// The signal contributing most, ties broken by name. `None` when
    /// nothing contributed.
    pub fn dominant_signal(&self) -> Option<&str> {
        let mut best: Option<(&str, f64)> = None;
        for (name, &points) in &self.breakdown {
            if points <= 0.0 {
                continue;
            }
            match best {
                Some((_, top)) if points <= top => {}
                _ => best = Some((name.as_str(), points)),
            }
        }
        best.map(|(name, _)| name)
    }
}

pub struct RiskScorer {
    weights:    SignalWeights,
    thresholds: SignalThresholds,
}

impl RiskScorer {
    pub fn new(weights: SignalWeights, thresholds: SignalThresholds) -> Self {
        Self { weights, thresholds }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.weights.clone(), config.thresholds.clone())
    }

    pub fn weights(&self) -> &SignalWeights {
        &self.weights
    }

    /// Map raw fields to [0, 1] sub-scores.
    pub fn sub_scores(&self, account: &Account, ring: Option<&Ring>) -> SubScores {
        let s = &account.signals;
        let t = &self.thresholds;
        SubScores {
            velocity:          saturate(s.accounts_per_hour, t.velocity_saturation_per_hour),
            geo_anomaly:       saturate(s.geo_mismatch_km, t.geo_mismatch_saturation_km),
            bonus_abuse:       saturate(f64::from(s.bonus_claims), t.bonus_claims_saturation),
            chargeback:        saturate(f64::from(s.chargebacks), t.chargeback_saturation),
            device_reputation: unit(s.device_reputation),
            ring:              ring.map(|r| unit(r.severity)),
        }
    }

    pub fn score(&self, account: &Account, ring: Option<&Ring>) -> RiskAssessment {
        let sub = self.sub_scores(account, ring);
        let w = &self.weights;
        let total_weight: f64 = w.entries().iter().map(|(_, weight)| unit(*weight)).sum();

        let mut terms = vec![
            (SIGNAL_VELOCITY, unit(w.velocity_weight), sub.velocity),
            (SIGNAL_GEO_ANOMALY, unit(w.geo_anomaly_weight), sub.geo_anomaly),
            (SIGNAL_BONUS_ABUSE, unit(w.bonus_abuse_weight), sub.bonus_abuse),
            (SIGNAL_CHARGEBACK, unit(w.chargeback_weight), sub.chargeback),
            (SIGNAL_DEVICE_REPUTATION, unit(w.device_reputation_weight), sub.device_reputation),
        ];
        if let Some(severity) = sub.ring {
            terms.push((SIGNAL_RING, unit(w.ring_weight), severity));
        }

        let scale = if total_weight > 0.0 {
            f64::from(MAX_RISK_SCORE) / total_weight
        } else {
            0.0
        };

        let breakdown: BTreeMap<String, f64> = terms
            .into_iter()
            .map(|(name, weight, value)| (name.to_string(), weight * value * scale))
            .collect();

        let raw: f64 = breakdown.values().sum();
        let points = raw.round().clamp(0.0, f64::from(MAX_RISK_SCORE)) as u16;

        log::trace!("scored {}: {points} (raw {raw:.3})", account.account_id);

        RiskAssessment {
            account_id: account.account_id.clone(),
            score:      RiskScore::new(points),
            breakdown,
            ring_id:    ring.map(|r| r.ring_id.clone()),
        }
    }
}

/// Clamp to [0, 1], treating NaN as 0.
fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// `min(1, raw / saturation)`, never negative.
fn saturate(raw: f64, saturation: f64) -> f64 {
    if saturation <= 0.0 || saturation.is_nan() {
        return if raw > 0.0 { 1.0 } else { 0.0 };
    }
    unit(raw / saturation)
}
