//! Signal model — the normalized account the engine evaluates and the
//! shared attributes it carries.

use crate::types::AccountId;
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Attributes ───────────────────────────────────────────────────────────────

/// The kinds of non-account entity that accounts can share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeCategory {
    Device,
    PaymentInstrument,
    IpAsn,
}

impl AttributeCategory {
    pub const ALL: [AttributeCategory; 3] = [
        AttributeCategory::Device,
        AttributeCategory::PaymentInstrument,
        AttributeCategory::IpAsn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Device            => "device",
            Self::PaymentInstrument => "payment_instrument",
            Self::IpAsn             => "ip_asn",
        }
    }
}

/// Identity of an attribute node: its category plus the raw observed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeKey {
    pub category: AttributeCategory,
    pub value:    String,
}

impl AttributeKey {
    pub fn new(category: AttributeCategory, value: impl Into<String>) -> Self {
        Self { category, value: value.into() }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category.as_str(), self.value)
    }
}

// ── Status ───────────────────────────────────────────────────────────────────

/// Case-management status. Owned by the external case layer; the engine
/// only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Blocked,
    Monitoring,
    Closed,
}

impl AccountStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active"     => Some(Self::Active),
            "blocked"    => Some(Self::Blocked),
            "monitoring" => Some(Self::Monitoring),
            "closed"     => Some(Self::Closed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active     => "active",
            Self::Blocked    => "blocked",
            Self::Monitoring => "monitoring",
            Self::Closed     => "closed",
        }
    }
}

// ── Behavioural inputs ───────────────────────────────────────────────────────

/// Raw behavioural risk inputs. Larger always means riskier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BehaviorSignals {
    /// Registration velocity of the origin the account signed up from.
    pub accounts_per_hour: f64,
    /// Distance between declared region and observed network location.
    pub geo_mismatch_km:   f64,
    pub bonus_claims:      u32,
    pub chargebacks:       u32,
    /// 0.0 = clean device/IP, 1.0 = known bad.
    pub device_reputation: f64,
}

// ── Account ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id:          AccountId,
    pub status:              AccountStatus,
    pub state:               Option<String>,
    pub payment_type:        Option<String>,
    pub segment:             Option<String>,
    pub total_deposited:     f64,
    pub avg_bet_value:       f64,
    pub session_time_sec:    f64,
    pub account_age_hours:   Option<f64>,
    pub signals:             BehaviorSignals,
    pub devices:             Vec<String>,
    pub payment_instruments: Vec<String>,
    pub ip_asns:             Vec<String>,
}

impl Account {
    /// A bare account with no attributes and zeroed signals.
    pub fn new(account_id: impl Into<AccountId>, status: AccountStatus) -> Self {
        Self {
            account_id:          account_id.into(),
            status,
            state:               None,
            payment_type:        None,
            segment:             None,
            total_deposited:     0.0,
            avg_bet_value:       0.0,
            session_time_sec:    0.0,
            account_age_hours:   None,
            signals:             BehaviorSignals::default(),
            devices:             Vec::new(),
            payment_instruments: Vec::new(),
            ip_asns:             Vec::new(),
        }
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.devices.push(device.into());
        self
    }

    pub fn with_payment_instrument(mut self, instrument: impl Into<String>) -> Self {
        self.payment_instruments.push(instrument.into());
        self
    }

    pub fn with_ip_asn(mut self, asn: impl Into<String>) -> Self {
        self.ip_asns.push(asn.into());
        self
    }

    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }

    pub fn with_signals(mut self, signals: BehaviorSignals) -> Self {
        self.signals = signals;
        self
    }

    pub fn attribute_values(&self, category: AttributeCategory) -> &[String] {
        match category {
            AttributeCategory::Device            => &self.devices,
            AttributeCategory::PaymentInstrument => &self.payment_instruments,
            AttributeCategory::IpAsn             => &self.ip_asns,
        }
    }

    /// Every attribute the account was observed using, in category order.
    /// Blank values are skipped; duplicates are left for the graph to collapse.
    pub fn attributes(&self) -> impl Iterator<Item = AttributeKey> + '_ {
        AttributeCategory::ALL.into_iter().flat_map(move |category| {
            self.attribute_values(category)
                .iter()
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(move |v| AttributeKey::new(category, v))
        })
    }
}
