//! Tenant account model.
//!
//! An [`Identity`] is one tenant account in the registry. The active session
//! is a *snapshot copy* of an `Identity` taken at login time; quota mutations
//! write through to both the snapshot and the registry record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account tier. Determines quota and capability defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    Administrator,
    Paid,
    Trial,
}

/// External integration endpoints a tenant's data operations must target:
/// the screening workflow webhook and the row-store location/key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationEndpoints {
    pub workflow_url: String,
    pub data_store_url: String,
    pub data_store_key: String,
}

/// Per-resource usage ceiling.
///
/// Serialized as `null` (unlimited) or a number, so registry records stay
/// plain JSON. Defaulting happens once at [`Identity::provision`]; nothing
/// downstream coalesces missing values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum QuotaLimit {
    Unlimited,
    Limited(u32),
}

impl QuotaLimit {
    /// `used >= limit`. Never true for `Unlimited`.
    pub fn reached(&self, used: u32) -> bool {
        match self {
            QuotaLimit::Unlimited => false,
            QuotaLimit::Limited(limit) => used >= *limit,
        }
    }

    /// Remaining headroom, saturating at zero.
    pub fn remaining(&self, used: u32) -> QuotaLimit {
        match self {
            QuotaLimit::Unlimited => QuotaLimit::Unlimited,
            QuotaLimit::Limited(limit) => QuotaLimit::Limited(limit.saturating_sub(used)),
        }
    }
}

impl From<Option<u32>> for QuotaLimit {
    fn from(value: Option<u32>) -> Self {
        match value {
            Some(n) => QuotaLimit::Limited(n),
            None => QuotaLimit::Unlimited,
        }
    }
}

impl From<QuotaLimit> for Option<u32> {
    fn from(value: QuotaLimit) -> Self {
        match value {
            QuotaLimit::Limited(n) => Some(n),
            QuotaLimit::Unlimited => None,
        }
    }
}

/// One tenant account. `id` and `created_at` are immutable after creation.
///
/// `login_name` is matched case-insensitively at login; `secret` byte-exact.
/// Login-name uniqueness is NOT enforced — first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub organization_name: String,
    pub login_name: String,
    pub secret: String,
    pub kind: IdentityKind,
    pub created_at: DateTime<Utc>,
    /// Absent means the shared default endpoints apply.
    pub endpoints: Option<IntegrationEndpoints>,
    #[serde(default)]
    pub used_scans: u32,
    #[serde(default)]
    pub used_jobs: u32,
    pub scan_limit: QuotaLimit,
    pub job_limit: QuotaLimit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Input for registering a new tenant account. Id, timestamp and limit
/// defaulting are applied by [`Identity::provision`].
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub organization_name: String,
    pub login_name: String,
    pub secret: String,
    pub kind: IdentityKind,
    pub endpoints: Option<IntegrationEndpoints>,
    /// Trial-only ceiling overrides; ignored for other kinds.
    pub scan_limit: Option<u32>,
    pub job_limit: Option<u32>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Identity {
    /// Turn registration input into a full record: fresh UUID, current
    /// timestamp, counters at zero, and limits resolved from the kind.
    pub fn provision(new: NewIdentity, default_max_scans: u32, default_max_jobs: u32) -> Self {
        let (scan_limit, job_limit) = match new.kind {
            IdentityKind::Trial => (
                QuotaLimit::Limited(new.scan_limit.unwrap_or(default_max_scans)),
                QuotaLimit::Limited(new.job_limit.unwrap_or(default_max_jobs)),
            ),
            _ => (QuotaLimit::Unlimited, QuotaLimit::Unlimited),
        };

        Identity {
            id: Uuid::new_v4().to_string(),
            organization_name: new.organization_name,
            login_name: new.login_name,
            secret: new.secret,
            kind: new.kind,
            created_at: Utc::now(),
            endpoints: new.endpoints,
            used_scans: 0,
            used_jobs: 0,
            scan_limit,
            job_limit,
            full_name: new.full_name,
            phone: new.phone,
            email: new.email,
        }
    }

    pub fn is_administrator(&self) -> bool {
        self.kind == IdentityKind::Administrator
    }

    pub fn is_trial(&self) -> bool {
        self.kind == IdentityKind::Trial
    }
}

// ── Tests ─────────────────────────────────────────────────────
