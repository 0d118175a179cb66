//! HireForce Core — session, tenancy and trial-quota engine for the
//! HireForce recruiting dashboard.
//!
//! The UI renders directly from the hosted row store; this crate owns the
//! parts with actual invariants: who is logged in, which tenant endpoints
//! data operations must target, and how many trial actions remain —
//! consistent across contexts sharing persisted storage and against
//! eventually-consistent authoritative counts from the backend.

pub mod capability;
pub mod config;
pub mod errors;
pub mod events;
pub mod intake;
pub mod models;
pub mod quota;
pub mod reconcile;
pub mod registry;
pub mod remote;
pub mod runtime;
pub mod session;
pub mod store;
pub mod tenant;

pub use errors::CoreError;
pub use runtime::CoreRuntime;
