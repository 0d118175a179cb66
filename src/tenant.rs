//! Tenant endpoint resolution.
//!
//! Every data operation must target the endpoint triple of the identity that
//! issued it. The resolved value lives in a process-wide [`ActiveEndpoints`]
//! cell set synchronously on each session change (the runtime wires it to
//! the session bus), not re-resolved per call — a tenant switch therefore
//! never leaves a window where one tenant's operation uses another's
//! configuration.

use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::models::{Identity, IntegrationEndpoints};

/// Endpoint triple for a session.
///
/// Administrator sessions get `None`: no tenant override, platform-level
/// defaults apply. Any other authenticated identity yields its own
/// endpoints, falling back to the shared defaults when it has none.
/// Anonymous yields `None`.
pub fn resolve_endpoints(
    session: Option<&Identity>,
    shared: &IntegrationEndpoints,
) -> Option<IntegrationEndpoints> {
    let identity = session?;
    if identity.is_administrator() {
        return None;
    }
    Some(
        identity
            .endpoints
            .clone()
            .unwrap_or_else(|| shared.clone()),
    )
}

/// Process-wide slot holding the currently resolved tenant endpoints.
#[derive(Clone)]
pub struct ActiveEndpoints {
    shared: IntegrationEndpoints,
    current: Arc<RwLock<Option<IntegrationEndpoints>>>,
}

impl ActiveEndpoints {
    pub fn new(shared: IntegrationEndpoints) -> Self {
        Self {
            shared,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Re-resolve for a session change. Must run synchronously with the
    /// change itself.
    pub fn apply_session(&self, session: Option<&Identity>) {
        let resolved = resolve_endpoints(session, &self.shared);
        debug!(tenant_override = resolved.is_some(), "active endpoints re-resolved");
        *self.current.write().expect("endpoints lock poisoned") = resolved;
    }

    /// The tenant-specific override, if one is active.
    pub fn tenant_override(&self) -> Option<IntegrationEndpoints> {
        self.current
            .read()
            .expect("endpoints lock poisoned")
            .clone()
    }

    /// The triple data operations must use right now: the tenant override
    /// when present, otherwise the shared defaults.
    pub fn effective(&self) -> IntegrationEndpoints {
        self.tenant_override().unwrap_or_else(|| self.shared.clone())
    }
}
