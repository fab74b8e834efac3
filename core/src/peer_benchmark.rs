//! An account's behaviour relative to its peer cohort.
//!
//! Comparisons are ratios: account value / segment centroid. 1.0 means
//! exactly at the peer norm, 3.0 means three times the norm. Centroids
//! are validated positive when the config is loaded.

use crate::{
    account::Account,
    config::{PeerSegment, PeerSegmentsConfig},
    error::{EngineError, EngineResult},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerComparison {
    pub segment_id:   String,
    /// Average bet value ratio.
    pub beta_bet:     f64,
    /// Session duration ratio.
    pub beta_session: f64,
    /// True when the account's own segment was unknown and the default
    /// segment was used instead.
    pub fell_back:    bool,
}

impl PeerComparison {
    /// Largest departure from the norm in either direction, as a factor
    /// ≥ 1.0 (0.25 and 4.0 both read as 4.0). Zero ratios count as 1.0.
    pub fn max_deviation(&self) -> f64 {
        [self.beta_bet, self.beta_session]
            .into_iter()
            .filter(|r| *r > 0.0)
            .map(|r| if r < 1.0 { 1.0 / r } else { r })
            .fold(1.0, f64::max)
    }
}

/// Ratio of `account` against `segment`'s centroid.
pub fn compare(account: &Account, segment: &PeerSegment) -> PeerComparison {
    PeerComparison {
        segment_id:   segment.id.clone(),
        beta_bet:     ratio(account.avg_bet_value, segment.avg_bet_value),
        beta_session: ratio(account.session_time_sec, segment.session_time_sec),
        fell_back:    false,
    }
}

fn ratio(value: f64, centroid: f64) -> f64 {
    if centroid > 0.0 {
        value.max(0.0) / centroid
    } else {
        0.0
    }
}

/// Registered segments plus the fallback segment id.
#[derive(Debug, Clone)]
pub struct PeerRegistry {
    segments:        BTreeMap<String, PeerSegment>,
    default_segment: String,
}

impl PeerRegistry {
    pub fn new(config: &PeerSegmentsConfig) -> Self {
        Self {
            segments: config
                .segments
                .iter()
                .map(|s| (s.id.clone(), s.clone()))
                .collect(),
            default_segment: config.default_segment.clone(),
        }
    }

    pub fn segment(&self, id: &str) -> Option<&PeerSegment> {
        self.segments.get(id)
    }

    pub fn default_segment(&self) -> Option<&PeerSegment> {
        self.segments.get(&self.default_segment)
    }

    /// Compare against the account's declared segment.
    ///
    /// Fails with `UnknownSegment` when the account declares no segment or
    /// one without a registered centroid.
    pub fn compare(&self, account: &Account) -> EngineResult<PeerComparison> {
        let declared = account.segment.as_deref().unwrap_or("");
        self.segment(declared)
            .map(|segment| compare(account, segment))
            .ok_or_else(|| EngineError::UnknownSegment {
                account_id: account.account_id.clone(),
                segment:    declared.to_string(),
            })
    }

    /// Like `compare`, but an unknown segment falls back to the default
    /// segment. Still fails if the default itself is unregistered.
    pub fn compare_or_default(&self, account: &Account) -> EngineResult<PeerComparison> {
        match self.compare(account) {
            Err(EngineError::UnknownSegment { segment, .. }) => {
                let fallback = self.default_segment().ok_or_else(|| EngineError::UnknownSegment {
                    account_id: account.account_id.clone(),
                    segment:    self.default_segment.clone(),
                })?;
                log::debug!(
                    "account {}: segment '{segment}' unknown, using '{}'",
                    account.account_id,
                    fallback.id
                );
                Ok(PeerComparison {
                    fell_back: true,
                    ..compare(account, fallback)
                })
            }
            other => other,
        }
    }
}
