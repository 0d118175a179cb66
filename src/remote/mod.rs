//! Interfaces to the external collaborators: the hosted row store, the blob
//! store for resumes, and the AI screening workflow webhook. The core only
//! depends on the traits; hosts plug in their backends.

pub mod blob_store;
pub mod memory;
pub mod row_store;
pub mod workflow;

pub use blob_store::{BlobStore, MemoryBlobStore};
pub use memory::MemoryRowStore;
pub use row_store::{ChangeGuard, Filter, OrderBy, RowStore, UnknownColumn};
pub use workflow::{ScreeningRequest, WorkflowClient};
