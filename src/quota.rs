//! Trial usage accounting: AI resume scans and job postings.
//!
//! Two sources feed the counters. Local increments are the optimistic fast
//! path that gates a second action in the same context before the backend
//! echoes. Observed remote row counts are authoritative: whenever one
//! arrives it overwrites the local counter, so concurrent contexts that
//! both passed the pre-increment check self-heal to the real value.

use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use crate::models::{Identity, QuotaLimit, QuotaStatus};
use crate::session::SessionManager;

/// The two independently limited trial resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Scans,
    Jobs,
}

pub struct QuotaTracker {
    sessions: Arc<SessionManager>,
    status: Mutex<Option<QuotaStatus>>,
}

impl QuotaTracker {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self {
            sessions,
            status: Mutex::new(None),
        }
    }

    /// Remaining scans: `Unlimited` for non-trial identities,
    /// `Limited(limit − used)` for trials, `Limited(0)` when anonymous.
    pub fn remaining_scans(&self) -> QuotaLimit {
        match self.sessions.current() {
            None => QuotaLimit::Limited(0),
            Some(identity) if !identity.is_trial() => QuotaLimit::Unlimited,
            Some(identity) => identity.scan_limit.remaining(identity.used_scans),
        }
    }

    /// Anonymous counts as exhausted; non-trial identities never are.
    pub fn has_reached_scan_limit(&self) -> bool {
        self.reached(Resource::Scans)
    }

    pub fn has_reached_job_limit(&self) -> bool {
        self.reached(Resource::Jobs)
    }

    /// Charge one scan. The ONLY path by which scan usage advances locally:
    /// the limit check and the increment run as one step under the session
    /// lock, write through to both the session snapshot and the registry,
    /// and raise the exhausted flag when the ceiling is hit.
    ///
    /// Returns `false` when the action must not proceed (anonymous, or the
    /// ceiling is already reached); callers must not invoke the screening
    /// workflow on `false`. Non-trial identities get `true` with no
    /// mutation.
    pub fn increment_scan_usage(&self) -> bool {
        self.increment(Resource::Scans)
    }

    /// Charge one job posting; symmetric with [`Self::increment_scan_usage`].
    pub fn increment_job_usage(&self) -> bool {
        self.increment(Resource::Jobs)
    }

    /// Reconcile against the authoritative remote row count for scans.
    /// The observed count replaces the local counter outright and the
    /// exhaustion flag is recomputed from it. No-op unless a trial session
    /// with the given id is active: `tenant_id` names the tenant whose rows
    /// were counted, so an observation arriving after an identity switch
    /// cannot write into the wrong session.
    pub fn apply_observed_scan_count(&self, tenant_id: &str, observed: u32) {
        self.apply_observed(Resource::Scans, tenant_id, observed)
    }

    pub fn apply_observed_job_count(&self, tenant_id: &str, observed: u32) {
        self.apply_observed(Resource::Jobs, tenant_id, observed)
    }

    /// Exhaustion flags for the UI, if any resource has ever tripped since
    /// the last acknowledgement.
    pub fn quota_status(&self) -> Option<QuotaStatus> {
        self.lock_status().clone()
    }

    /// UI dismissal. Clears the status to `None`; counters and limits are
    /// untouched.
    pub fn acknowledge_quota(&self) {
        *self.lock_status() = None;
    }

    // ── internals ─────────────────────────────────────────────

    fn reached(&self, resource: Resource) -> bool {
        match self.sessions.current() {
            None => true,
            Some(identity) if !identity.is_trial() => false,
            Some(identity) => {
                let (limit, used) = Self::pick(&identity, resource);
                limit.reached(used)
            }
        }
    }

    fn increment(&self, resource: Resource) -> bool {
        self.sessions.mutate(|slot| match slot {
            None => (false, false),
            Some(identity) if !identity.is_trial() => (true, false),
            Some(identity) => {
                let (limit, used) = Self::pick(identity, resource);
                if limit.reached(used) {
                    debug!(?resource, used, "trial increment rejected at limit");
                    return (false, false);
                }
                let used = used + 1;
                Self::store_used(identity, resource, used);
                if limit.reached(used) {
                    self.raise_exhausted(resource);
                    info!(?resource, used, "trial limit reached");
                }
                (true, true)
            }
        })
    }

    fn apply_observed(&self, resource: Resource, tenant_id: &str, observed: u32) {
        self.sessions.mutate(|slot| match slot {
            Some(identity) if identity.is_trial() && identity.id != tenant_id => {
                debug!(
                    ?resource,
                    observed, "dropping observation for a different tenant"
                );
                ((), false)
            }
            Some(identity) if identity.is_trial() => {
                let (limit, used) = Self::pick(identity, resource);
                let exhausted = limit.reached(observed);
                self.set_exhausted(resource, exhausted);
                if used == observed {
                    return ((), false);
                }
                debug!(?resource, local = used, observed, "reconciled counter from remote");
                Self::store_used(identity, resource, observed);
                ((), true)
            }
            _ => ((), false),
        })
    }

    fn pick(identity: &Identity, resource: Resource) -> (QuotaLimit, u32) {
        match resource {
            Resource::Scans => (identity.scan_limit, identity.used_scans),
            Resource::Jobs => (identity.job_limit, identity.used_jobs),
        }
    }

    fn store_used(identity: &mut Identity, resource: Resource, used: u32) {
        match resource {
            Resource::Scans => identity.used_scans = used,
            Resource::Jobs => identity.used_jobs = used,
        }
    }

    /// Latch a flag on. Used by the increment path, which only ever trips
    /// a limit, never untrips one.
    fn raise_exhausted(&self, resource: Resource) {
        self.set_exhausted(resource, true);
    }

    /// Recompute a flag in either direction (reconciliation may lower the
    /// count back under the ceiling). A status record is only created when
    /// a flag actually goes up.
    fn set_exhausted(&self, resource: Resource, exhausted: bool) {
        let mut status = self.lock_status();
        match status.as_mut() {
            Some(existing) => {
                match resource {
                    Resource::Scans => existing.scans_exhausted = exhausted,
                    Resource::Jobs => existing.jobs_exhausted = exhausted,
                }
                existing.updated_at = chrono::Utc::now();
            }
            None if exhausted => {
                *status = Some(match resource {
                    Resource::Scans => QuotaStatus::new(true, false),
                    Resource::Jobs => QuotaStatus::new(false, true),
                });
            }
            None => {}
        }
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, Option<QuotaStatus>> {
        self.status.lock().expect("quota status lock poisoned")
    }
}

// ── Tests ─────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::{IdentityKind, NewIdentity};
    use crate::registry::IdentityRegistry;
    use crate::store::MemoryStore;

    fn setup_with_trial(scan_limit: u32, job_limit: u32) -> (Arc<SessionManager>, QuotaTracker) {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(IdentityRegistry::new(store.clone(), Config::for_tests()));
        registry.initialize().unwrap();
        registry
            .insert(NewIdentity {
                organization_name: "Acme".into(),
                login_name: "t@x.com".into(),
                secret: "pw".into(),
                kind: IdentityKind::Trial,
                endpoints: None,
                scan_limit: Some(scan_limit),
                job_limit: Some(job_limit),
                full_name: None,
                phone: None,
                email: None,
            })
            .unwrap();
        let sessions = Arc::new(SessionManager::new(store, registry));
        assert!(sessions.login("t@x.com", "pw"));
        let quota = QuotaTracker::new(sessions.clone());
        (sessions, quota)
    }

    #[test]
    fn increments_cap_exactly_at_the_limit() {
        let (sessions, quota) = setup_with_trial(5, 1);

        for n in 1..=5 {
            assert!(quota.increment_scan_usage(), "increment {n} should pass");
        }
        assert_eq!(sessions.current().unwrap().used_scans, 5);
        assert!(quota.has_reached_scan_limit());

        // sixth call rejected with no mutation
        assert!(!quota.increment_scan_usage());
        assert_eq!(sessions.current().unwrap().used_scans, 5);
    }

    #[test]
    fn job_limit_of_one_rejects_the_second_posting() {
        let (_, quota) = setup_with_trial(5, 1);
        assert!(!quota.has_reached_job_limit());
        assert!(quota.increment_job_usage());
        assert!(quota.has_reached_job_limit());
        assert!(!quota.increment_job_usage());
        assert!(quota.quota_status().unwrap().jobs_exhausted);
    }

    #[test]
    fn non_trial_identities_are_never_limited() {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(IdentityRegistry::new(store.clone(), Config::for_tests()));
        registry.initialize().unwrap();
        let sessions = Arc::new(SessionManager::new(store, registry));
        assert!(sessions.login("admin@hireforce.dev", "test-admin-secret"));
        let quota = QuotaTracker::new(sessions.clone());

        for _ in 0..10 {
            assert!(quota.increment_scan_usage());
            assert!(quota.increment_job_usage());
        }
        let session = sessions.current().unwrap();
        assert_eq!(session.used_scans, 0);
        assert_eq!(session.used_jobs, 0);
        assert_eq!(quota.remaining_scans(), QuotaLimit::Unlimited);
        assert!(!quota.has_reached_scan_limit());
        assert!(quota.quota_status().is_none());
    }

    #[test]
    fn anonymous_context_has_no_quota() {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(IdentityRegistry::new(store.clone(), Config::for_tests()));
        registry.initialize().unwrap();
        let sessions = Arc::new(SessionManager::new(store, registry));
        let quota = QuotaTracker::new(sessions);

        assert!(!quota.increment_scan_usage());
        assert!(quota.has_reached_scan_limit());
        assert_eq!(quota.remaining_scans(), QuotaLimit::Limited(0));
    }

    #[test]
    fn increments_write_through_to_session_and_registry() {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(IdentityRegistry::new(store.clone(), Config::for_tests()));
        registry.initialize().unwrap();
        let created = registry
            .insert(NewIdentity {
                organization_name: "Acme".into(),
                login_name: "t@x.com".into(),
                secret: "pw".into(),
                kind: IdentityKind::Trial,
                endpoints: None,
                scan_limit: Some(5),
                job_limit: Some(1),
                full_name: None,
                phone: None,
                email: None,
            })
            .unwrap();
        let sessions = Arc::new(SessionManager::new(store, registry.clone()));
        assert!(sessions.login("t@x.com", "pw"));
        let quota = QuotaTracker::new(sessions.clone());

        assert!(quota.increment_scan_usage());
        assert_eq!(sessions.current().unwrap().used_scans, 1);
        assert_eq!(registry.find_by_id(&created.id).unwrap().used_scans, 1);
    }

    #[test]
    fn remote_observation_overrides_local_optimism() {
        let (sessions, quota) = setup_with_trial(5, 1);
        let tenant_id = sessions.current().unwrap().id;

        assert!(quota.increment_scan_usage());
        assert_eq!(sessions.current().unwrap().used_scans, 1);

        // backend reports three candidate rows for this tenant
        quota.apply_observed_scan_count(&tenant_id, 3);
        assert_eq!(sessions.current().unwrap().used_scans, 3);
        assert!(!quota.has_reached_scan_limit());

        quota.apply_observed_scan_count(&tenant_id, 5);
        assert!(quota.has_reached_scan_limit());
        assert!(quota.quota_status().unwrap().scans_exhausted);
    }

    #[test]
    fn reconciliation_can_lower_a_tripped_flag() {
        let (sessions, quota) = setup_with_trial(1, 1);
        let tenant_id = sessions.current().unwrap().id;
        assert!(quota.increment_scan_usage());
        assert!(quota.quota_status().unwrap().scans_exhausted);

        // a candidate row was deleted remotely
        quota.apply_observed_scan_count(&tenant_id, 0);
        assert!(!quota.quota_status().unwrap().scans_exhausted);
        assert!(!quota.has_reached_scan_limit());
    }

    #[test]
    fn observation_is_ignored_for_non_trial_sessions() {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(IdentityRegistry::new(store.clone(), Config::for_tests()));
        registry.initialize().unwrap();
        let sessions = Arc::new(SessionManager::new(store, registry));
        assert!(sessions.login("admin@hireforce.dev", "test-admin-secret"));
        let admin_id = sessions.current().unwrap().id;
        let quota = QuotaTracker::new(sessions.clone());

        quota.apply_observed_scan_count(&admin_id, 99);
        assert_eq!(sessions.current().unwrap().used_scans, 0);
        assert!(quota.quota_status().is_none());
    }

    #[test]
    fn observation_for_a_different_tenant_is_dropped() {
        let (sessions, quota) = setup_with_trial(5, 1);
        assert!(quota.increment_scan_usage());

        // a count for the previous tenant lands after an identity switch
        quota.apply_observed_scan_count("someone-else", 5);
        assert_eq!(sessions.current().unwrap().used_scans, 1);
        assert!(!quota.has_reached_scan_limit());
        assert!(quota.quota_status().is_none());
    }

    #[test]
    fn acknowledge_clears_status_but_not_counters() {
        let (sessions, quota) = setup_with_trial(1, 1);
        assert!(quota.increment_scan_usage());
        assert!(quota.quota_status().is_some());

        quota.acknowledge_quota();
        assert!(quota.quota_status().is_none());
        assert_eq!(sessions.current().unwrap().used_scans, 1);
        assert!(quota.has_reached_scan_limit());
    }

    #[test]
    fn remaining_scans_counts_down() {
        let (_, quota) = setup_with_trial(5, 1);
        assert_eq!(quota.remaining_scans(), QuotaLimit::Limited(5));
        quota.increment_scan_usage();
        quota.increment_scan_usage();
        assert_eq!(quota.remaining_scans(), QuotaLimit::Limited(3));
    }
}
