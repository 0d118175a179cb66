//! Feeds authoritative remote row counts back into the quota tracker.
//!
//! The row store delivers "something changed" signals; on each one the
//! reconciler re-queries the affected table, counts this tenant's rows, and
//! overwrites the tracker's local counter. Errors are caught here and
//! logged — prior known-good counters stay in place until a successful
//! observation arrives.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::quota::QuotaTracker;
use crate::remote::{ChangeGuard, Filter, RowStore, UnknownColumn};

/// Table holding candidate rows (one per AI scan).
pub const CANDIDATES_TABLE: &str = "candidates";
/// Table holding job postings.
pub const JOBS_TABLE: &str = "jobs";
/// Tenant-scoping column; tables without it are counted unscoped.
pub const TENANT_COLUMN: &str = "tenant_id";

/// The two table subscriptions for one trial session. Dropping the
/// reconciler (logout, identity switch) stops all deliveries so stale
/// callbacks cannot write into the next session.
pub struct QuotaReconciler {
    _candidates: ChangeGuard,
    _jobs: ChangeGuard,
}

impl QuotaReconciler {
    /// Subscribe to both quota-bearing tables and run one immediate
    /// observation per table. Requires a tokio runtime.
    pub fn start(
        rows: Arc<dyn RowStore>,
        quota: Arc<QuotaTracker>,
        tenant_id: String,
    ) -> Self {
        let candidates = Self::watch(&rows, &quota, &tenant_id, CANDIDATES_TABLE);
        let jobs = Self::watch(&rows, &quota, &tenant_id, JOBS_TABLE);

        observe_later(rows.clone(), quota.clone(), tenant_id.clone(), CANDIDATES_TABLE);
        observe_later(rows, quota, tenant_id, JOBS_TABLE);

        Self {
            _candidates: candidates,
            _jobs: jobs,
        }
    }

    fn watch(
        rows: &Arc<dyn RowStore>,
        quota: &Arc<QuotaTracker>,
        tenant_id: &str,
        table: &'static str,
    ) -> ChangeGuard {
        let rows_for_callback = rows.clone();
        let quota = quota.clone();
        let tenant_id = tenant_id.to_string();
        rows.subscribe(
            table,
            Arc::new(move || {
                observe_later(
                    rows_for_callback.clone(),
                    quota.clone(),
                    tenant_id.clone(),
                    table,
                );
            }),
        )
    }
}

/// Spawn one observation pass for a table.
fn observe_later(
    rows: Arc<dyn RowStore>,
    quota: Arc<QuotaTracker>,
    tenant_id: String,
    table: &'static str,
) {
    tokio::spawn(async move {
        match observed_count(rows.as_ref(), table, &tenant_id).await {
            Ok(count) => {
                debug!(table, count, "observed remote row count");
                match table {
                    CANDIDATES_TABLE => quota.apply_observed_scan_count(&tenant_id, count),
                    JOBS_TABLE => quota.apply_observed_job_count(&tenant_id, count),
                    _ => {}
                }
            }
            Err(e) => {
                warn!(table, error = %e, "remote observation failed, keeping local counters");
            }
        }
    });
}

/// Count this tenant's rows. A scoped query on a table without the tenant
/// column degrades to an unscoped count; any other scoped failure is an
/// error — an unscoped fallback there would report the global row count
/// as this tenant's usage.
async fn observed_count(rows: &dyn RowStore, table: &str, tenant_id: &str) -> anyhow::Result<u32> {
    let scoped = Filter::eq(TENANT_COLUMN, tenant_id);
    let result = match rows.query(table, Some(&scoped), None).await {
        Ok(found) => found,
        Err(e) if e.downcast_ref::<UnknownColumn>().is_some() => {
            debug!(table, error = %e, "table has no tenant column, counting unscoped");
            rows.query(table, None, None).await?
        }
        Err(e) => return Err(e),
    };
    Ok(result.len() as u32)
}

// ── Tests ─────────────────────────────────────────────────────
