//! Coarse-grained permission flags derived from the session.
//!
//! Pure derivation, recomputed on every session change; quota is deliberately
//! not consulted here. The view-mode toggle is an orthogonal, in-memory demo
//! switch that can only further restrict the display-level read-write flag —
//! it never changes the underlying identity.

use std::sync::Mutex;

use crate::models::{Identity, IdentityKind};

/// Display-level edit mode, independent of the authenticated identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    ReadWrite,
    ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub is_administrator: bool,
    pub is_paid: bool,
    pub is_trial: bool,
    pub is_authenticated: bool,
    /// Display-only; false when the demo toggle is set to read-only.
    pub is_read_write: bool,
}

impl Capabilities {
    pub fn is_read_only(&self) -> bool {
        !self.is_read_write
    }
}

/// Derive the capability flags for a session under a view mode.
pub fn resolve(session: Option<&Identity>, mode: ViewMode) -> Capabilities {
    let kind = session.map(|identity| identity.kind);
    Capabilities {
        is_administrator: kind == Some(IdentityKind::Administrator),
        is_paid: kind == Some(IdentityKind::Paid),
        is_trial: kind == Some(IdentityKind::Trial),
        is_authenticated: session.is_some(),
        is_read_write: mode == ViewMode::ReadWrite,
    }
}

/// Non-persisted toggle; defaults to read-write on every startup.
#[derive(Default)]
pub struct ViewModeToggle {
    mode: Mutex<ViewMode>,
}

impl ViewModeToggle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ViewMode {
        *self.mode.lock().expect("view mode lock poisoned")
    }

    pub fn set(&self, mode: ViewMode) {
        *self.mode.lock().expect("view mode lock poisoned") = mode;
    }
}
