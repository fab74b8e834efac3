//! Engine configuration. Every weight, threshold and coefficient the
//! engine uses is injected from here. Algorithms never embed business
//! constants of their own.
//!
//! Production loads from a data directory via `EngineConfig::load`.
//! Tests use `EngineConfig::default_test()`.

use crate::{
    error::{EngineError, EngineResult},
    types::MAX_RISK_SCORE,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

// ── Risk scoring ───────────────────────────────────────────────────

/// Per-signal weights. Each weight is in [0, 1]; they need not sum to 1
/// because the scorer normalizes by their total.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalWeights {
    pub velocity_weight:          f64,
    pub geo_anomaly_weight:       f64,
    pub bonus_abuse_weight:       f64,
    pub chargeback_weight:        f64,
    pub ring_weight:              f64,
    pub device_reputation_weight: f64,
}

impl SignalWeights {
    /// Sum of all six weights, the scorer's normalization denominator.
    pub fn total(&self) -> f64 {
        self.entries().iter().map(|(_, w)| w.max(0.0)).sum()
    }

    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("velocity_weight", self.velocity_weight),
            ("geo_anomaly_weight", self.geo_anomaly_weight),
            ("bonus_abuse_weight", self.bonus_abuse_weight),
            ("chargeback_weight", self.chargeback_weight),
            ("ring_weight", self.ring_weight),
            ("device_reputation_weight", self.device_reputation_weight),
        ]
    }

    pub fn validate(&self) -> EngineResult<()> {
        for (name, weight) in self.entries() {
            check_unit(name, weight)?;
        }
        Ok(())
    }
}

/// Raw values at which each signal's sub-score saturates at 1.0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignalThresholds {
    /// Registrations per hour from the same origin.
    pub velocity_saturation_per_hour: f64,
    pub geo_mismatch_saturation_km:   f64,
    pub bonus_claims_saturation:      f64,
    pub chargeback_saturation:        f64,
}

impl SignalThresholds {
    pub fn validate(&self) -> EngineResult<()> {
        check_positive("velocity_saturation_per_hour", self.velocity_saturation_per_hour)?;
        check_positive("geo_mismatch_saturation_km", self.geo_mismatch_saturation_km)?;
        check_positive("bonus_claims_saturation", self.bonus_claims_saturation)?;
        check_positive("chargeback_saturation", self.chargeback_saturation)?;
        Ok(())
    }
}

// ── Ring detection ─────────────────────────────────────────────────

/// Qualification rules and severity coefficients for rings.
///
/// severity = min(1, accounts / size_saturation) * size_weight
///          + (shared_attributes / accounts) * density_weight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RingParams {
    pub min_accounts:          usize,
    pub min_shared_attributes: usize,
    pub size_saturation:       f64,
    pub size_weight:           f64,
    pub density_weight:        f64,
}

impl Default for RingParams {
    fn default() -> Self {
        Self {
            min_accounts:          2,
            min_shared_attributes: 1,
            size_saturation:       15.0,
            size_weight:           0.6,
            density_weight:        0.4,
        }
    }
}

impl RingParams {
    pub fn validate(&self) -> EngineResult<()> {
        if self.min_accounts < 2 {
            return Err(invalid("min_accounts", "a ring needs at least 2 accounts"));
        }
        check_positive("size_saturation", self.size_saturation)?;
        check_unit("size_weight", self.size_weight)?;
        check_unit("density_weight", self.density_weight)?;
        Ok(())
    }
}

// ── Peer segments ──────────────────────────────────────────────────

/// A behavioural cohort and its reference centroid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerSegment {
    pub id:               String,
    pub label:            String,
    pub avg_bet_value:    f64,
    pub session_time_sec: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerSegmentsConfig {
    /// Segment substituted when an account's own segment is unknown.
    pub default_segment: String,
    pub segments:        Vec<PeerSegment>,
}

impl PeerSegmentsConfig {
    pub fn validate(&self) -> EngineResult<()> {
        for (i, seg) in self.segments.iter().enumerate() {
            check_positive(&format!("segments.{}.avg_bet_value", seg.id), seg.avg_bet_value)?;
            check_positive(&format!("segments.{}.session_time_sec", seg.id), seg.session_time_sec)?;
            if self.segments[..i].iter().any(|other| other.id == seg.id) {
                return Err(invalid(&format!("segments.{}", seg.id), "duplicate segment id"));
            }
        }
        if !self.segments.iter().any(|s| s.id == self.default_segment) {
            return Err(invalid(
                "default_segment",
                &format!("'{}' is not a registered segment", self.default_segment),
            ));
        }
        Ok(())
    }
}

// ── Policy simulation and triage ───────────────────────────────────

/// How effective each action band is, used by the policy simulator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyParams {
    /// Share of fraud stopped for accounts routed to manual review.
    pub review_catch_rate: f64,
    /// Share of legitimate accounts in review that experience friction.
    pub review_friction:   f64,
}

impl Default for PolicyParams {
    fn default() -> Self {
        Self {
            review_catch_rate: 0.5,
            review_friction:   0.5,
        }
    }
}

impl PolicyParams {
    pub fn validate(&self) -> EngineResult<()> {
        check_unit("review_catch_rate", self.review_catch_rate)?;
        check_unit("review_friction", self.review_friction)?;
        Ok(())
    }
}

/// Score cutoffs for the investigation queue's risk bands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageConfig {
    /// Scores strictly above this are `high`.
    pub high_risk_threshold:   u16,
    /// Scores at or above this (and not high) are `medium`.
    pub medium_risk_threshold: u16,
}

impl TriageConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.high_risk_threshold > MAX_RISK_SCORE {
            return Err(invalid("high_risk_threshold", "must be <= 1000"));
        }
        if self.medium_risk_threshold > self.high_risk_threshold {
            return Err(invalid("medium_risk_threshold", "must not exceed high_risk_threshold"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PolicyFile {
    simulation: PolicyParams,
    triage:     TriageConfig,
}

// ── Top-level config ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    pub weights:            SignalWeights,
    pub thresholds:         SignalThresholds,
    pub rings:              RingParams,
    pub peers:              PeerSegmentsConfig,
    pub policy:             PolicyParams,
    pub triage:             TriageConfig,
    /// Inputs smaller than this are processed sequentially.
    pub parallel_threshold: usize,
}

impl EngineConfig {
    /// Load from the data/ directory.
    /// In tests, use EngineConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let weights: SignalWeights = read_json(data_dir, "scoring/signal_weights.json")?;
        let thresholds: SignalThresholds = read_json(data_dir, "scoring/signal_thresholds.json")?;
        let rings: RingParams = read_json(data_dir, "rings/ring_params.json")?;
        let peers: PeerSegmentsConfig = read_json(data_dir, "peers/peer_segments.json")?;
        let policy_file: PolicyFile = read_json(data_dir, "policy/policy_params.json")?;

        let config = Self {
            weights,
            thresholds,
            rings,
            peers,
            policy: policy_file.simulation,
            triage: policy_file.triage,
            parallel_threshold: 256,
        };
        config.validate()?;
        log::debug!(
            "config loaded from {data_dir}: {} peer segments, weight total {:.2}",
            config.peers.segments.len(),
            config.weights.total()
        );
        Ok(config)
    }

    /// Run every section's validation. Called by `load`; callers that
    /// build a config by hand should call it too.
    pub fn validate(&self) -> EngineResult<()> {
        self.weights.validate()?;
        self.thresholds.validate()?;
        self.rings.validate()?;
        self.peers.validate()?;
        self.policy.validate()?;
        self.triage.validate()?;
        Ok(())
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        Self {
            weights: SignalWeights {
                velocity_weight:          0.8,
                geo_anomaly_weight:       0.5,
                bonus_abuse_weight:       0.6,
                chargeback_weight:        0.9,
                ring_weight:              1.0,
                device_reputation_weight: 0.7,
            },
            thresholds: SignalThresholds {
                velocity_saturation_per_hour: 50.0,
                geo_mismatch_saturation_km:   1000.0,
                bonus_claims_saturation:      5.0,
                chargeback_saturation:        3.0,
            },
            rings: RingParams::default(),
            peers: PeerSegmentsConfig {
                default_segment: "casual_bettor".into(),
                segments: vec![
                    PeerSegment {
                        id:               "casual_bettor".into(),
                        label:            "Casual Bettor".into(),
                        avg_bet_value:    50.0,
                        session_time_sec: 60.0,
                    },
                    PeerSegment {
                        id:               "high_roller".into(),
                        label:            "High Roller".into(),
                        avg_bet_value:    250.0,
                        session_time_sec: 180.0,
                    },
                    PeerSegment {
                        id:               "bonus_hunter".into(),
                        label:            "Bonus Hunter".into(),
                        avg_bet_value:    15.0,
                        session_time_sec: 25.0,
                    },
                ],
            },
            policy: PolicyParams::default(),
            triage: TriageConfig {
                high_risk_threshold:   800,
                medium_risk_threshold: 500,
            },
            parallel_threshold: 256,
        }
    }
}

fn read_json<T: DeserializeOwned>(data_dir: &str, relative: &str) -> anyhow::Result<T> {
    let path = format!("{data_dir}/{relative}");
    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))
}

fn invalid(field: &str, reason: &str) -> EngineError {
    EngineError::InvalidConfig {
        field:  field.to_string(),
        reason: reason.to_string(),
    }
}

fn check_unit(field: &str, value: f64) -> EngineResult<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, &format!("{value} is outside [0, 1]")))
    }
}

fn check_positive(field: &str, value: f64) -> EngineResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &format!("{value} must be a positive number")))
    }
}
