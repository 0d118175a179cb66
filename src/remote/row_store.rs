//! Abstraction over the hosted row store (candidates, jobs).

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// A query referenced a column the table does not have. Implementations
/// must surface this as the error source so callers can tell a schema
/// mismatch apart from a transient backend failure.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("column '{0}' does not exist")]
pub struct UnknownColumn(pub String);

/// Column equality filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub equals: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, equals: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            equals: equals.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

impl OrderBy {
    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }
}

/// Callback fired when anything in a subscribed table changes. Deliveries
/// carry no payload: the consumer re-queries and replaces its prior state
/// with the full snapshot, never merges.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Row store contract. A tenant-scoping filter on a column the underlying
/// table does not have must fail with [`UnknownColumn`] so the caller can
/// fall back to an unscoped query (the reconciler does).
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn query(
        &self,
        table: &str,
        filter: Option<&Filter>,
        order: Option<&OrderBy>,
    ) -> anyhow::Result<Vec<Value>>;

    /// Insert one row; returns the stored row (with server-assigned fields).
    async fn insert(&self, table: &str, row: Value) -> anyhow::Result<Value>;

    async fn update(&self, table: &str, filter: &Filter, patch: Value) -> anyhow::Result<()>;

    async fn delete(&self, table: &str, filter: &Filter) -> anyhow::Result<()>;

    /// Watch a table for changes. Delivery stops when the guard drops.
    fn subscribe(&self, table: &str, on_change: ChangeCallback) -> ChangeGuard;
}

/// Active table subscription; unsubscribes on drop. Must be dropped when the
/// owning session context is torn down so callbacks cannot write into a
/// stale session.
pub struct ChangeGuard {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl ChangeGuard {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }
}

impl Drop for ChangeGuard {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}
