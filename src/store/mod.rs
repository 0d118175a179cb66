//! Persisted key/value state shared by every context on the same profile.
//!
//! Two logical keys exist: the identity registry and the session snapshot.
//! Both hold plain serialized JSON with no schema versioning; a value that
//! fails to parse is treated as absent by the callers, never as a hard error.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::errors::CoreError;

/// Logical key holding the ordered identity registry.
pub const REGISTRY_KEY: &str = "hireforce_users";
/// Logical key holding the persisted session snapshot.
pub const SESSION_KEY: &str = "hireforce_auth";

/// Backend for the persisted state. Reads are infallible (`None` covers both
/// "missing" and "unreadable"); writes surface real I/O failures.
///
/// Implementations are shared across contexts without a transaction or lock:
/// read-modify-write races lose updates, last writer wins.
pub trait StateStore: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&self, key: &str, value: &str) -> Result<(), CoreError>;
    fn remove(&self, key: &str) -> Result<(), CoreError>;
}
