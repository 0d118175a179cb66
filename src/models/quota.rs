//! Derived quota-exhaustion state surfaced to the UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transient exhaustion flags for the current trial session.
///
/// Held by the quota tracker, never persisted. Cleared to `None` only by an
/// explicit user acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub scans_exhausted: bool,
    pub jobs_exhausted: bool,
    pub updated_at: DateTime<Utc>,
}

impl QuotaStatus {
    pub fn new(scans_exhausted: bool, jobs_exhausted: bool) -> Self {
        Self {
            scans_exhausted,
            jobs_exhausted,
            updated_at: Utc::now(),
        }
    }
}
