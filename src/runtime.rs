//! Explicit construction and lifecycle for the core.
//!
//! Everything is dependency-injected: a [`CoreRuntime`] owns one registry,
//! one session manager, one quota tracker, and the active-endpoints cell,
//! all over the [`StateStore`] the host supplies. Tests build isolated
//! runtimes instead of sharing process globals. Dropping the runtime tears
//! down its bus subscriptions.

use std::sync::Arc;

use crate::capability::{self, Capabilities, ViewModeToggle};
use crate::config::Config;
use crate::errors::CoreError;
use crate::events::Subscription;
use crate::intake::IntakeService;
use crate::quota::QuotaTracker;
use crate::reconcile::QuotaReconciler;
use crate::registry::IdentityRegistry;
use crate::remote::{BlobStore, RowStore, WorkflowClient};
use crate::session::SessionManager;
use crate::store::StateStore;
use crate::tenant::ActiveEndpoints;

pub struct CoreRuntime {
    config: Config,
    pub registry: Arc<IdentityRegistry>,
    pub sessions: Arc<SessionManager>,
    pub quota: Arc<QuotaTracker>,
    pub view_mode: Arc<ViewModeToggle>,
    pub endpoints: ActiveEndpoints,
    _endpoint_sub: Subscription,
}

impl CoreRuntime {
    /// Seed the registry if empty, restore any persisted session, and wire
    /// the active-endpoints cell to follow every session change
    /// synchronously.
    pub fn init(store: Arc<dyn StateStore>, config: Config) -> Result<Self, CoreError> {
        let registry = Arc::new(IdentityRegistry::new(store.clone(), config.clone()));
        registry.initialize()?;

        let sessions = Arc::new(SessionManager::new(store, registry.clone()));
        let quota = Arc::new(QuotaTracker::new(sessions.clone()));
        let endpoints = ActiveEndpoints::new(config.shared_endpoints.clone());

        // Weak: the bus lives inside SessionManager, so a strong capture
        // would cycle and leak the manager.
        let endpoint_sub = {
            let cell = endpoints.clone();
            let weak_sessions = Arc::downgrade(&sessions);
            sessions.bus().subscribe(move || {
                if let Some(sessions) = weak_sessions.upgrade() {
                    cell.apply_session(sessions.current().as_ref());
                }
            })
        };

        sessions.restore();
        endpoints.apply_session(sessions.current().as_ref());

        Ok(Self {
            config,
            registry,
            sessions,
            quota,
            view_mode: Arc::new(ViewModeToggle::new()),
            endpoints,
            _endpoint_sub: endpoint_sub,
        })
    }

    /// Capability flags for the current session under the current view mode.
    pub fn capabilities(&self) -> Capabilities {
        capability::resolve(self.sessions.current().as_ref(), self.view_mode.mode())
    }

    /// Start count reconciliation against the given row store for the
    /// current trial session. `None` for anonymous or non-trial sessions.
    /// The caller drops the reconciler on logout or identity switch.
    pub fn start_reconciler(&self, rows: Arc<dyn RowStore>) -> Option<QuotaReconciler> {
        let session = self.sessions.current()?;
        if !session.is_trial() {
            return None;
        }
        Some(QuotaReconciler::start(
            rows,
            self.quota.clone(),
            session.id,
        ))
    }

    /// Build the intake service over the host's remote backends.
    pub fn intake(&self, rows: Arc<dyn RowStore>, blobs: Arc<dyn BlobStore>) -> IntakeService {
        IntakeService::new(
            rows,
            blobs,
            WorkflowClient::new(self.config.workflow_signing_secret.clone()),
            self.quota.clone(),
            self.sessions.clone(),
            self.endpoints.clone(),
        )
    }

    /// Destructive recovery: reseed the registry, drop the session.
    pub fn reset(&self) -> Result<(), CoreError> {
        self.registry.reset()?;
        self.sessions.sync_from_storage();
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────
