//! Durable registry of tenant identities.
//!
//! The registry is an ordered JSON list behind one logical storage key,
//! shared across contexts without a transaction: every operation is a
//! read-modify-write and the last writer wins. A registry value that fails
//! to parse falls back to the default seed set in memory and is only
//! re-persisted by the next write.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::CoreError;
use crate::models::{Identity, IdentityKind, NewIdentity, QuotaLimit};
use crate::store::{StateStore, REGISTRY_KEY, SESSION_KEY};

/// Id of the protected administrator seed record.
pub const ADMIN_ID: &str = "admin-001";
/// Id of the paid demo tenant seed record.
pub const DEMO_ID: &str = "tenant-001";

/// Registry of tenant accounts over a pluggable [`StateStore`].
pub struct IdentityRegistry {
    store: Arc<dyn StateStore>,
    config: Config,
}

impl IdentityRegistry {
    pub fn new(store: Arc<dyn StateStore>, config: Config) -> Self {
        Self { store, config }
    }

    /// Seed the registry with the administrator and the paid demo tenant if
    /// no registry exists yet. Idempotent: never overwrites existing data.
    pub fn initialize(&self) -> Result<(), CoreError> {
        if self.store.load(REGISTRY_KEY).is_none() {
            let seeds = self.seed_identities();
            self.persist(&seeds)?;
            info!(count = seeds.len(), "identity registry seeded");
        }
        Ok(())
    }

    /// First identity whose login matches case-insensitively with a
    /// byte-exact secret. `None` is an authentication failure, not an error.
    pub fn find_by_credentials(&self, login_name: &str, secret: &str) -> Option<Identity> {
        self.list_all()
            .into_iter()
            .find(|identity| {
                identity.login_name.eq_ignore_ascii_case(login_name) && identity.secret == secret
            })
    }

    /// Every identity, in registry order. A corrupt registry yields the
    /// default seed set (in memory only).
    pub fn list_all(&self) -> Vec<Identity> {
        match self.store.load(REGISTRY_KEY) {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(identities) => identities,
                Err(e) => {
                    warn!(error = %e, "identity registry unparsable, serving seed defaults");
                    self.seed_identities()
                }
            },
            None => self.seed_identities(),
        }
    }

    pub fn list_by_kind(&self, kind: IdentityKind) -> Vec<Identity> {
        self.list_all()
            .into_iter()
            .filter(|identity| identity.kind == kind)
            .collect()
    }

    pub fn find_by_id(&self, id: &str) -> Option<Identity> {
        self.list_all().into_iter().find(|i| i.id == id)
    }

    /// Register a new identity: fresh id and timestamp, quota defaults
    /// resolved by kind, and — for trials without their own endpoints —
    /// the shared default endpoint triple attached.
    pub fn insert(&self, new: NewIdentity) -> Result<Identity, CoreError> {
        let mut new = new;
        if new.kind == IdentityKind::Trial && new.endpoints.is_none() {
            new.endpoints = Some(self.config.shared_endpoints.clone());
        }

        let identity = Identity::provision(
            new,
            self.config.default_max_scans,
            self.config.default_max_jobs,
        );

        let mut identities = self.list_all();
        identities.push(identity.clone());
        self.persist(&identities)?;

        info!(id = %identity.id, kind = ?identity.kind, "identity registered");
        Ok(identity)
    }

    /// Write an updated record back over the one with the same id. Used by
    /// the quota write-through path; a missing id is a lost update (another
    /// context removed the record) and is logged, not raised.
    pub fn update_record(&self, updated: &Identity) -> Result<(), CoreError> {
        let mut identities = self.list_all();
        match identities.iter_mut().find(|i| i.id == updated.id) {
            Some(slot) => *slot = updated.clone(),
            None => {
                debug!(id = %updated.id, "update for identity no longer in registry");
                return Ok(());
            }
        }
        self.persist(&identities)
    }

    /// Delete a record by id. The administrator record is silently kept.
    ///
    /// Always reports `true`, even for an absent id: callers treat delete
    /// as idempotent and only distinguish storage failures.
    pub fn remove(&self, id: &str) -> Result<bool, CoreError> {
        let identities: Vec<Identity> = self
            .list_all()
            .into_iter()
            .filter(|identity| identity.id != id || identity.is_administrator())
            .collect();
        self.persist(&identities)?;
        Ok(true)
    }

    /// Destroy the registry and the persisted session, then reseed.
    /// Recovery path for corrupted persisted state.
    pub fn reset(&self) -> Result<(), CoreError> {
        self.store.remove(REGISTRY_KEY)?;
        self.store.remove(SESSION_KEY)?;
        self.persist(&self.seed_identities())?;
        info!("identity registry reset to seed defaults");
        Ok(())
    }

    fn persist(&self, identities: &[Identity]) -> Result<(), CoreError> {
        let raw = serde_json::to_string(identities)?;
        self.store.save(REGISTRY_KEY, &raw)
    }

    fn seed_identities(&self) -> Vec<Identity> {
        let now = chrono::Utc::now();
        vec![
            Identity {
                id: ADMIN_ID.into(),
                organization_name: "HireForce".into(),
                login_name: self.config.admin_login.clone(),
                secret: self.config.admin_secret.clone(),
                kind: IdentityKind::Administrator,
                created_at: now,
                endpoints: None,
                used_scans: 0,
                used_jobs: 0,
                scan_limit: QuotaLimit::Unlimited,
                job_limit: QuotaLimit::Unlimited,
                full_name: None,
                phone: None,
                email: None,
            },
            Identity {
                id: DEMO_ID.into(),
                organization_name: "HireFlow Demo".into(),
                login_name: "demo@hireflow.dev".into(),
                secret: "DemoPass123!".into(),
                kind: IdentityKind::Paid,
                created_at: now,
                endpoints: Some(self.config.shared_endpoints.clone()),
                used_scans: 0,
                used_jobs: 0,
                scan_limit: QuotaLimit::Unlimited,
                job_limit: QuotaLimit::Unlimited,
                full_name: None,
                phone: None,
                email: None,
            },
        ]
    }
}

/// Random 8-character alphanumeric login/secret pair, used by admin
/// provisioning of trial accounts.
pub fn generate_credentials() -> (String, String) {
    let mut rng = rand::thread_rng();
    let mut take = |n: usize| -> String {
        (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(n)
            .map(char::from)
            .collect()
    };
    (take(8), take(8))
}

// ── Tests ─────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IntegrationEndpoints;
    use crate::store::MemoryStore;

    fn registry() -> IdentityRegistry {
        IdentityRegistry::new(Arc::new(MemoryStore::new()), Config::for_tests())
    }

    fn trial(login: &str) -> NewIdentity {
        NewIdentity {
            organization_name: "Acme".into(),
            login_name: login.into(),
            secret: "pw".into(),
            kind: IdentityKind::Trial,
            endpoints: None,
            scan_limit: None,
            job_limit: None,
            full_name: None,
            phone: None,
            email: None,
        }
    }

    #[test]
    fn initialize_seeds_exactly_admin_and_demo() {
        let registry = registry();
        registry.initialize().unwrap();
        let all = registry.list_all();
        assert_eq!(all.len(), 2);
        assert_eq!(
            registry.list_by_kind(IdentityKind::Administrator).len(),
            1
        );
        assert_eq!(registry.list_by_kind(IdentityKind::Paid).len(), 1);
    }

    #[test]
    fn initialize_is_idempotent() {
        let registry = registry();
        registry.initialize().unwrap();
        registry.insert(trial("t@x.com")).unwrap();
        registry.initialize().unwrap();
        assert_eq!(registry.list_all().len(), 3);
    }

    #[test]
    fn login_name_matches_case_insensitively_secret_exactly() {
        let registry = registry();
        registry.initialize().unwrap();
        registry.insert(trial("Recruiter@Acme.com")).unwrap();

        assert!(registry
            .find_by_credentials("recruiter@acme.COM", "pw")
            .is_some());
        assert!(registry
            .find_by_credentials("recruiter@acme.com", "PW")
            .is_none());
    }

    #[test]
    fn trial_without_endpoints_gets_shared_defaults() {
        let registry = registry();
        registry.initialize().unwrap();
        let created = registry.insert(trial("t@x.com")).unwrap();
        assert_eq!(
            created.endpoints,
            Some(Config::for_tests().shared_endpoints)
        );
    }

    #[test]
    fn trial_with_own_endpoints_keeps_them() {
        let registry = registry();
        let own = IntegrationEndpoints {
            workflow_url: "https://own.test/hook".into(),
            data_store_url: "https://own.test".into(),
            data_store_key: "own-key".into(),
        };
        let mut input = trial("t@x.com");
        input.endpoints = Some(own.clone());
        let created = registry.insert(input).unwrap();
        assert_eq!(created.endpoints, Some(own));
    }

    #[test]
    fn remove_never_deletes_the_administrator() {
        let registry = registry();
        registry.initialize().unwrap();
        let admin_before = registry.find_by_id(ADMIN_ID).unwrap();

        // reported success either way — known quirk
        assert!(registry.remove(ADMIN_ID).unwrap());
        assert!(registry.remove("no-such-id").unwrap());

        let admin_after = registry.find_by_id(ADMIN_ID).unwrap();
        assert_eq!(admin_after, admin_before);
    }

    #[test]
    fn remove_deletes_non_admin_records() {
        let registry = registry();
        registry.initialize().unwrap();
        let created = registry.insert(trial("t@x.com")).unwrap();
        assert!(registry.remove(&created.id).unwrap());
        assert!(registry.find_by_id(&created.id).is_none());
    }

    #[test]
    fn corrupt_registry_serves_seeds_without_persisting() {
        let store = Arc::new(MemoryStore::new());
        let registry = IdentityRegistry::new(store.clone(), Config::for_tests());
        store.save(REGISTRY_KEY, "{not json").unwrap();

        assert_eq!(registry.list_all().len(), 2);
        // the corrupt value is still in place until the next write
        assert_eq!(store.load(REGISTRY_KEY).as_deref(), Some("{not json"));

        registry.insert(trial("t@x.com")).unwrap();
        assert_eq!(registry.list_all().len(), 3);
    }

    #[test]
    fn reset_reseeds_and_clears_session_key() {
        let store = Arc::new(MemoryStore::new());
        let registry = IdentityRegistry::new(store.clone(), Config::for_tests());
        registry.initialize().unwrap();
        registry.insert(trial("t@x.com")).unwrap();
        store.save(SESSION_KEY, "{}").unwrap();

        registry.reset().unwrap();
        assert_eq!(registry.list_all().len(), 2);
        assert_eq!(store.load(SESSION_KEY), None);
    }

    #[test]
    fn generated_credentials_are_eight_alphanumeric_chars() {
        let (login, secret) = generate_credentials();
        assert_eq!(login.len(), 8);
        assert_eq!(secret.len(), 8);
        assert!(login.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
