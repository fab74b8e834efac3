//! The engine — one snapshot in, one report out.
//!
//! EXECUTION ORDER (fixed, strict two-phase):
//!   1. Link graph build     (sequential, single writer)
//!   2. Ring detection       (union-find, then per-component summaries)
//!   3. Per-account scoring  (parallel above `parallel_threshold`)
//!      with peer comparison alongside
//!
//! RULES:
//!   - Scoring starts only after ring membership is final.
//!   - The engine holds no mutable state; concurrent runs over different
//!     snapshots share nothing but the read-only config.
//!   - Malformed records were already skipped at ingestion and are
//!     carried through to the report.

use crate::{
    account::{Account, AccountStatus},
    config::{EngineConfig, TriageConfig},
    error::EngineResult,
    link_graph::{LinkGraph, Neighborhood},
    peer_benchmark::{PeerComparison, PeerRegistry},
    policy_simulator::{self, PolicyImpact},
    ring_detector::{Ring, RingDetector, RingIndex},
    risk_scorer::{RiskScore, RiskScorer},
    snapshot::{RejectedRecord, Snapshot},
    types::{AccountId, RunId},
};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Report types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn classify(score: RiskScore, triage: &TriageConfig) -> Self {
        let s = score.value();
        if s > triage.high_risk_threshold {
            Self::High
        } else if s >= triage.medium_risk_threshold {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountReport {
    pub account_id:      AccountId,
    pub status:          AccountStatus,
    pub score:           RiskScore,
    pub band:            RiskBand,
    /// The account's main risk factor.
    pub dominant_signal: Option<String>,
    pub breakdown:       BTreeMap<String, f64>,
    pub ring_id:         Option<String>,
    pub peer:            Option<PeerComparison>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatCount {
    pub signal:   String,
    pub accounts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id:      RunId,
    pub as_of:       DateTime<Utc>,
    pub rejected:    Vec<RejectedRecord>,
    pub rings:       Vec<Ring>,
    /// Same order as the snapshot's accounts.
    pub assessments: Vec<AccountReport>,
}

impl RunReport {
    pub fn scores(&self) -> Vec<RiskScore> {
        self.assessments.iter().map(|a| a.score).collect()
    }

    pub fn assessment(&self, account_id: &str) -> Option<&AccountReport> {
        self.assessments.iter().find(|a| a.account_id == account_id)
    }

    pub fn ring(&self, ring_id: &str) -> Option<&Ring> {
        self.rings.iter().find(|r| r.ring_id == ring_id)
    }

    /// Mean score across every evaluated account; 0 for an empty run.
    pub fn average_score(&self) -> f64 {
        if self.assessments.is_empty() {
            return 0.0;
        }
        let total: u64 = self.assessments.iter().map(|a| u64::from(a.score.value())).sum();
        total as f64 / self.assessments.len() as f64
    }

    /// Active accounts, highest score first, ties by id.
    pub fn investigation_queue(&self) -> Vec<&AccountReport> {
        let mut queue: Vec<&AccountReport> = self
            .assessments
            .iter()
            .filter(|a| a.status == AccountStatus::Active)
            .collect();
        queue.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.account_id.cmp(&b.account_id))
        });
        queue
    }

    /// How many accounts each signal dominates, most common first.
    pub fn threat_summary(&self) -> Vec<ThreatCount> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for a in &self.assessments {
            if let Some(signal) = a.dominant_signal.as_deref() {
                *counts.entry(signal).or_insert(0) += 1;
            }
        }
        let mut summary: Vec<ThreatCount> = counts
            .into_iter()
            .map(|(signal, accounts)| ThreatCount { signal: signal.to_string(), accounts })
            .collect();
        summary.sort_by(|a, b| b.accounts.cmp(&a.accounts).then_with(|| a.signal.cmp(&b.signal)));
        summary
    }
}

// ── Engine ───────────────────────────────────────────────────────────────────

pub struct RiskEngine {
    config:   EngineConfig,
    scorer:   RiskScorer,
    detector: RingDetector,
    peers:    PeerRegistry,
}

impl RiskEngine {
    /// Validate the config and wire every component from it.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            scorer:   RiskScorer::from_config(&config),
            detector: RingDetector::new(config.rings.clone())
                .with_parallel_threshold(config.parallel_threshold),
            peers:    PeerRegistry::new(&config.peers),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    pub fn peers(&self) -> &PeerRegistry {
        &self.peers
    }

    /// Run with a fresh random run id.
    pub fn run(&self, snapshot: &Snapshot) -> RunReport {
        self.run_with_id(uuid::Uuid::new_v4().to_string(), snapshot)
    }

    /// Run with a caller-chosen id. Reports from two runs over the same
    /// snapshot with the same id are identical.
    pub fn run_with_id(&self, run_id: RunId, snapshot: &Snapshot) -> RunReport {
        log::info!(
            "run {run_id}: as_of={} accounts={} rejected={}",
            snapshot.as_of,
            snapshot.accounts.len(),
            snapshot.rejected.len()
        );

        // Phase 1: build + detect.
        let graph = LinkGraph::build(&snapshot.accounts);
        let rings = self.detector.detect(&graph);

        // Phase 2: score against final ring membership.
        let index = RingIndex::new(&rings);
        let assessments: Vec<AccountReport> = if snapshot.accounts.len() >= self.config.parallel_threshold {
            snapshot
                .accounts
                .par_iter()
                .map(|a| self.assess(a, index.ring_of(&a.account_id)))
                .collect()
        } else {
            snapshot
                .accounts
                .iter()
                .map(|a| self.assess(a, index.ring_of(&a.account_id)))
                .collect()
        };

        let report = RunReport {
            run_id,
            as_of: snapshot.as_of,
            rejected: snapshot.rejected.clone(),
            rings,
            assessments,
        };
        log::info!(
            "run {}: rings={} avg_score={:.1} queue={}",
            report.run_id,
            report.rings.len(),
            report.average_score(),
            report.investigation_queue().len()
        );
        report
    }

    fn assess(&self, account: &Account, ring: Option<&Ring>) -> AccountReport {
        let assessment = self.scorer.score(account, ring);
        let peer = match self.peers.compare_or_default(account) {
            Ok(cmp) => Some(cmp),
            Err(e) => {
                log::warn!("account {}: no peer comparison: {e}", account.account_id);
                None
            }
        };
        AccountReport {
            band: RiskBand::classify(assessment.score, &self.config.triage),
            dominant_signal: assessment.dominant_signal().map(str::to_string),
            account_id: assessment.account_id,
            status: account.status,
            score: assessment.score,
            breakdown: assessment.breakdown,
            ring_id: assessment.ring_id,
            peer,
        }
    }

    /// Investigation view for one account of the snapshot.
    pub fn investigate(&self, snapshot: &Snapshot, account_id: &str) -> Option<Neighborhood> {
        LinkGraph::build(&snapshot.accounts).neighborhood(account_id)
    }

    /// Simulate a threshold policy over a report's score distribution.
    pub fn simulate_policy(
        &self,
        report: &RunReport,
        block_threshold: u16,
        review_threshold: u16,
    ) -> EngineResult<PolicyImpact> {
        policy_simulator::simulate(
            &report.scores(),
            block_threshold,
            review_threshold,
            &self.config.policy,
        )
    }

    /// Score a single account outside a full run, given the rings it may
    /// belong to.
    pub fn score_account(&self, account: &Account, rings: &[Ring]) -> AccountReport {
        let index = RingIndex::new(rings);
        self.assess(account, index.ring_of(&account.account_id))
    }
}
