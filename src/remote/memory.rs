//! In-memory [`RowStore`]: the reference implementation used by tests and
//! local development. Mirrors the hosted store's semantics — full-snapshot
//! change notifications, server-assigned ids, and tenant-scoping errors on
//! unknown filter columns.

use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use super::row_store::{ChangeCallback, ChangeGuard, Filter, OrderBy, RowStore, UnknownColumn};

#[derive(Default)]
struct Subscribers {
    next_id: AtomicU64,
    by_table: Mutex<HashMap<String, HashMap<u64, ChangeCallback>>>,
}

#[derive(Default)]
pub struct MemoryRowStore {
    tables: DashMap<String, Vec<Value>>,
    subscribers: Arc<Subscribers>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn notify(&self, table: &str) {
        let callbacks: Vec<ChangeCallback> = {
            let by_table = self
                .subscribers
                .by_table
                .lock()
                .expect("row store subscriber lock poisoned");
            by_table
                .get(table)
                .map(|subs| subs.values().cloned().collect())
                .unwrap_or_default()
        };
        for callback in callbacks {
            callback();
        }
    }

    fn matches(row: &Value, filter: &Filter) -> anyhow::Result<bool> {
        match row.get(&filter.column) {
            Some(value) => Ok(*value == filter.equals),
            // behave like a real store: an unknown column is a typed query
            // error, letting callers degrade to an unscoped query
            None => Err(UnknownColumn(filter.column.clone()).into()),
        }
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn query(
        &self,
        table: &str,
        filter: Option<&Filter>,
        order: Option<&OrderBy>,
    ) -> anyhow::Result<Vec<Value>> {
        let rows = self
            .tables
            .get(table)
            .map(|t| t.clone())
            .unwrap_or_default();

        let mut selected = Vec::with_capacity(rows.len());
        for row in rows {
            match filter {
                Some(f) => {
                    if Self::matches(&row, f)? {
                        selected.push(row);
                    }
                }
                None => selected.push(row),
            }
        }

        if let Some(order) = order {
            selected.sort_by(|a, b| {
                let left = a.get(&order.column).map(value_sort_key);
                let right = b.get(&order.column).map(value_sort_key);
                let cmp = left.partial_cmp(&right).unwrap_or(std::cmp::Ordering::Equal);
                if order.ascending {
                    cmp
                } else {
                    cmp.reverse()
                }
            });
        }

        Ok(selected)
    }

    async fn insert(&self, table: &str, mut row: Value) -> anyhow::Result<Value> {
        let obj = row
            .as_object_mut()
            .ok_or_else(|| anyhow::anyhow!("row must be a JSON object"))?;
        obj.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));

        self.tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        self.notify(table);
        Ok(row)
    }

    async fn update(&self, table: &str, filter: &Filter, patch: Value) -> anyhow::Result<()> {
        let patch = patch
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("patch must be a JSON object"))?
            .clone();

        if let Some(mut rows) = self.tables.get_mut(table) {
            for row in rows.iter_mut() {
                if Self::matches(row, filter)? {
                    if let Some(obj) = row.as_object_mut() {
                        for (key, value) in &patch {
                            obj.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
        }
        self.notify(table);
        Ok(())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> anyhow::Result<()> {
        if let Some(mut rows) = self.tables.get_mut(table) {
            let mut kept = Vec::with_capacity(rows.len());
            for row in rows.drain(..) {
                if !Self::matches(&row, filter).unwrap_or(false) {
                    kept.push(row);
                }
            }
            *rows = kept;
        }
        self.notify(table);
        Ok(())
    }

    fn subscribe(&self, table: &str, on_change: ChangeCallback) -> ChangeGuard {
        let id = self.subscribers.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut by_table = self
                .subscribers
                .by_table
                .lock()
                .expect("row store subscriber lock poisoned");
            by_table
                .entry(table.to_string())
                .or_default()
                .insert(id, on_change);
        }

        let subscribers = Arc::clone(&self.subscribers);
        let table = table.to_string();
        ChangeGuard::new(move || {
            if let Ok(mut by_table) = subscribers.by_table.lock() {
                if let Some(subs) = by_table.get_mut(&table) {
                    subs.remove(&id);
                }
            }
        })
    }
}

/// Total order over JSON scalars for `ORDER BY` emulation.
fn value_sort_key(value: &Value) -> String {
    match value {
        Value::Number(n) => format!("{:020.6}", n.as_f64().unwrap_or(0.0)),
        other => other.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn insert_assigns_id_and_query_filters() {
        let store = MemoryRowStore::new();
        let row = store
            .insert("candidates", json!({"full_name": "Ada", "tenant_id": "t1"}))
            .await
            .unwrap();
        assert!(row["id"].is_string());

        store
            .insert("candidates", json!({"full_name": "Grace", "tenant_id": "t2"}))
            .await
            .unwrap();

        let scoped = store
            .query("candidates", Some(&Filter::eq("tenant_id", "t1")), None)
            .await
            .unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0]["full_name"], "Ada");
    }

    #[tokio::test]
    async fn filtering_on_missing_column_is_a_typed_error() {
        let store = MemoryRowStore::new();
        store
            .insert("jobs", json!({"title": "Engineer"}))
            .await
            .unwrap();
        let error = store
            .query("jobs", Some(&Filter::eq("tenant_id", "t1")), None)
            .await
            .unwrap_err();
        assert_eq!(
            error.downcast_ref::<UnknownColumn>(),
            Some(&UnknownColumn("tenant_id".into()))
        );
    }

    #[tokio::test]
    async fn subscription_fires_on_every_mutation_until_dropped() {
        let store = MemoryRowStore::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let guard = store.subscribe(
            "jobs",
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        store.insert("jobs", json!({"title": "A"})).await.unwrap();
        store
            .update("jobs", &Filter::eq("title", "A"), json!({"status": "Closed"}))
            .await
            .unwrap();
        store
            .delete("jobs", &Filter::eq("title", "A"))
            .await
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);

        drop(guard);
        store.insert("jobs", json!({"title": "B"})).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn order_by_descending_sorts_rows() {
        let store = MemoryRowStore::new();
        for created in ["2024-01-01", "2024-03-01", "2024-02-01"] {
            store
                .insert("jobs", json!({"created_at": created}))
                .await
                .unwrap();
        }
        let rows = store
            .query("jobs", None, Some(&OrderBy::descending("created_at")))
            .await
            .unwrap();
        assert_eq!(rows[0]["created_at"], "2024-03-01");
        assert_eq!(rows[2]["created_at"], "2024-01-01");
    }
}
