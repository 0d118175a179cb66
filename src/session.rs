//! Authenticated identity for the current context.
//!
//! The session is a snapshot copy of an [`Identity`] taken at login time,
//! persisted under its own storage key and mirrored in memory. Other
//! contexts sharing the same store propagate changes through the host, which
//! calls [`SessionManager::sync_from_storage`]; in-process consumers watch
//! the [`SessionBus`]. This channel is eventually consistent: concurrent
//! logins in two contexts race and the last write observed wins per context.

use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::events::SessionBus;
use crate::models::Identity;
use crate::registry::IdentityRegistry;
use crate::store::{StateStore, SESSION_KEY};

pub struct SessionManager {
    store: Arc<dyn StateStore>,
    registry: Arc<IdentityRegistry>,
    current: Mutex<Option<Identity>>,
    bus: SessionBus,
}

impl SessionManager {
    pub fn new(store: Arc<dyn StateStore>, registry: Arc<IdentityRegistry>) -> Self {
        Self {
            store,
            registry,
            current: Mutex::new(None),
            bus: SessionBus::new(),
        }
    }

    /// Bus publishing on every session change (login, logout, write-through
    /// counter update, external sync).
    pub fn bus(&self) -> &SessionBus {
        &self.bus
    }

    /// Load any persisted session on startup. A snapshot that fails to
    /// parse is cleared and the session stays anonymous; never an error.
    pub fn restore(&self) {
        let restored = self.read_persisted();
        let mut current = self.lock_current();
        *current = restored;
        if current.is_some() {
            debug!("session restored from persisted storage");
        }
    }

    /// Authenticate against the registry. On a match the full identity
    /// becomes the session and is persisted. A failed attempt returns
    /// `false` and leaves any existing session untouched — it does NOT
    /// log out.
    pub fn login(&self, login_name: &str, secret: &str) -> bool {
        let Some(found) = self.registry.find_by_credentials(login_name, secret) else {
            info!(login_name, "login rejected: no matching credentials");
            return false;
        };

        {
            let mut current = self.lock_current();
            self.persist(&found);
            *current = Some(found);
        }
        self.bus.publish();
        info!(login_name, "login succeeded");
        true
    }

    /// Clear the session in memory and in storage. Idempotent.
    pub fn logout(&self) {
        let had_session = {
            let mut current = self.lock_current();
            if let Err(e) = self.store.remove(SESSION_KEY) {
                warn!(error = %e, "failed to clear persisted session");
            }
            current.take().is_some()
        };
        if had_session {
            self.bus.publish();
            info!("logged out");
        }
    }

    /// Snapshot of the current session, if authenticated.
    pub fn current(&self) -> Option<Identity> {
        self.lock_current().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock_current().is_some()
    }

    /// Re-read the persisted session after another context changed it.
    /// Corrupt storage logs out; a differing snapshot replaces the local
    /// one (last write observed wins for this context).
    pub fn sync_from_storage(&self) {
        let observed = self.read_persisted();
        let changed = {
            let mut current = self.lock_current();
            if *current == observed {
                false
            } else {
                debug!(
                    authenticated = observed.is_some(),
                    "session updated from another context"
                );
                *current = observed;
                true
            }
        };
        if changed {
            self.bus.publish();
        }
    }

    /// Run a mutation against the session slot as one logical step under the
    /// session lock. When the closure reports a change, the new snapshot is
    /// written through to storage and to the registry record, then the bus
    /// publishes. This is the quota tracker's at-most-once enforcement hook:
    /// check and increment happen inside one closure invocation.
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut Option<Identity>) -> (R, bool)) -> R {
        let (result, changed) = {
            let mut current = self.lock_current();
            let (result, changed) = f(&mut current);
            if changed {
                if let Some(identity) = current.as_ref() {
                    self.persist(identity);
                    if let Err(e) = self.registry.update_record(identity) {
                        warn!(error = %e, "registry write-through failed");
                    }
                }
            }
            (result, changed)
        };
        if changed {
            self.bus.publish();
        }
        result
    }

    fn read_persisted(&self) -> Option<Identity> {
        let raw = self.store.load(SESSION_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!(error = %e, "persisted session unparsable, clearing it");
                if let Err(e) = self.store.remove(SESSION_KEY) {
                    warn!(error = %e, "failed to clear corrupt session");
                }
                None
            }
        }
    }

    fn persist(&self, identity: &Identity) {
        match serde_json::to_string(identity) {
            Ok(raw) => {
                if let Err(e) = self.store.save(SESSION_KEY, &raw) {
                    warn!(error = %e, "failed to persist session");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize session"),
        }
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<Identity>> {
        self.current.lock().expect("session lock poisoned")
    }
}

// ── Tests ─────────────────────────────────────────────────────
