//! Input snapshot: the materialised account feed for one run.
//!
//! Records arrive with every field optional. Ingestion normalizes them
//! into `Account`s; a record missing a structurally required field (id or
//! status) is skipped and reported, never allowed to abort the run.

use crate::{
    account::{Account, AccountStatus, BehaviorSignals},
    error::{EngineError, EngineResult},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// One account as it appears in the external feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountRecord {
    #[serde(alias = "user_id")]
    pub account_id:          Option<String>,
    pub status:              Option<String>,
    pub state:               Option<String>,
    pub payment_type:        Option<String>,
    #[serde(alias = "peer_group")]
    pub segment:             Option<String>,
    pub total_deposited:     Option<f64>,
    pub avg_bet_value:       Option<f64>,
    pub session_time_sec:    Option<f64>,
    pub registered_at:       Option<DateTime<Utc>>,
    pub accounts_per_hour:   Option<f64>,
    pub geo_mismatch_km:     Option<f64>,
    pub bonus_claims:        Option<u32>,
    pub chargebacks:         Option<u32>,
    pub device_reputation:   Option<f64>,
    #[serde(deserialize_with = "null_as_empty")]
    pub devices:             Vec<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub payment_instruments: Vec<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub ip_asns:             Vec<String>,
}

/// An explicit `null` attribute list reads as "no edges for that category".
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// On-disk shape of a snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub as_of:    DateTime<Utc>,
    pub accounts: Vec<AccountRecord>,
}

/// A snapshot file whose records are not yet typed, so one bad record
/// cannot fail the whole document.
#[derive(Deserialize)]
struct RawSnapshotFile {
    as_of:    DateTime<Utc>,
    accounts: Vec<Value>,
}

/// A record that could not be normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub index:      usize,
    pub account_id: Option<String>,
    pub reason:     String,
}

/// The immutable input of one engine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub as_of:    DateTime<Utc>,
    pub accounts: Vec<Account>,
    pub rejected: Vec<RejectedRecord>,
}

impl Snapshot {
    /// Wrap already-normalized accounts.
    pub fn from_accounts(as_of: DateTime<Utc>, accounts: Vec<Account>) -> Self {
        Self { as_of, accounts, rejected: Vec::new() }
    }

    /// Normalize raw feed records, skipping and reporting malformed ones.
    /// The first occurrence of an id wins; later duplicates are rejected.
    pub fn ingest(as_of: DateTime<Utc>, records: Vec<AccountRecord>) -> Self {
        Self::ingest_parsed(as_of, records.into_iter().map(|r| (Ok(r), None)))
    }

    /// Like `ingest`, over untyped JSON records. A record whose fields have
    /// the wrong shape is rejected on its own; the rest are still ingested.
    pub fn ingest_values(as_of: DateTime<Utc>, records: Vec<Value>) -> Self {
        Self::ingest_parsed(
            as_of,
            records.into_iter().map(|value| {
                let id = raw_account_id(&value);
                (serde_json::from_value::<AccountRecord>(value).map_err(EngineError::from), id)
            }),
        )
    }

    fn ingest_parsed<I>(as_of: DateTime<Utc>, records: I) -> Self
    where
        I: Iterator<Item = (EngineResult<AccountRecord>, Option<String>)>,
    {
        let mut accounts = Vec::new();
        let mut rejected = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (index, (parsed, raw_id)) in records.enumerate() {
            let result = parsed
                .and_then(|record| normalize_record(index, record, as_of))
                .and_then(|account| {
                    if seen.insert(account.account_id.clone()) {
                        Ok(account)
                    } else {
                        Err(EngineError::MalformedAccount {
                            index,
                            account_id: Some(account.account_id),
                            reason: "duplicate account id".into(),
                        })
                    }
                });

            match result {
                Ok(account) => accounts.push(account),
                Err(EngineError::MalformedAccount { index, account_id, reason }) => {
                    log::warn!(
                        "skipping record #{index} ({}): {reason}",
                        account_id.as_deref().unwrap_or("<no id>")
                    );
                    rejected.push(RejectedRecord { index, account_id, reason });
                }
                Err(other) => {
                    let reason = format!("invalid record: {other}");
                    log::warn!(
                        "skipping record #{index} ({}): {reason}",
                        raw_id.as_deref().unwrap_or("<no id>")
                    );
                    rejected.push(RejectedRecord { index, account_id: raw_id, reason });
                }
            }
        }

        log::debug!(
            "snapshot ingested: accepted={} rejected={}",
            accounts.len(),
            rejected.len()
        );
        Self { as_of, accounts, rejected }
    }

    /// Parse a `SnapshotFile` JSON document and ingest it. Only a broken
    /// document or `as_of` is an error; bad records are rejected one by one.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let file: RawSnapshotFile = serde_json::from_str(json)?;
        Ok(Self::ingest_values(file.as_of, file.accounts))
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Turn one feed record into an `Account`.
///
/// Only the id and status are required. Missing numeric fields read as 0,
/// missing attribute lists mean "no edges for that category". Negative or
/// non-finite numbers are floored at 0 so no signal can subtract risk.
pub fn normalize_record(
    index: usize,
    record: AccountRecord,
    as_of: DateTime<Utc>,
) -> EngineResult<Account> {
    let account_id = match record.account_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return Err(EngineError::MalformedAccount {
                index,
                account_id: None,
                reason: "missing account id".into(),
            })
        }
    };

    let status = match record.status.as_deref() {
        None => {
            return Err(EngineError::MalformedAccount {
                index,
                account_id: Some(account_id),
                reason: "missing status".into(),
            })
        }
        Some(raw) => AccountStatus::parse(raw).ok_or_else(|| EngineError::MalformedAccount {
            index,
            account_id: Some(account_id.clone()),
            reason: format!("unknown status '{raw}'"),
        })?,
    };

    let account_age_hours = record.registered_at.map(|registered| {
        let minutes = (as_of - registered).num_minutes().max(0);
        minutes as f64 / 60.0
    });

    Ok(Account {
        account_id,
        status,
        state: non_blank(record.state),
        payment_type: non_blank(record.payment_type),
        segment: non_blank(record.segment),
        total_deposited: non_negative(record.total_deposited),
        avg_bet_value: non_negative(record.avg_bet_value),
        session_time_sec: non_negative(record.session_time_sec),
        account_age_hours,
        signals: BehaviorSignals {
            accounts_per_hour: non_negative(record.accounts_per_hour),
            geo_mismatch_km:   non_negative(record.geo_mismatch_km),
            bonus_claims:      record.bonus_claims.unwrap_or(0),
            chargebacks:       record.chargebacks.unwrap_or(0),
            device_reputation: non_negative(record.device_reputation),
        },
        devices: record.devices,
        payment_instruments: record.payment_instruments,
        ip_asns: record.ip_asns,
    })
}

/// The record's id when it is at least a string, for rejection reports.
fn raw_account_id(value: &Value) -> Option<String> {
    value
        .get("account_id")
        .or_else(|| value.get("user_id"))
        .and_then(Value::as_str)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_negative(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}
