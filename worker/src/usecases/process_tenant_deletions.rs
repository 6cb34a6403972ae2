use anyhow::Result;
use chrono::{DateTime, Utc};
use crates::domain::{
    repositories::deletion_queue::DeletionQueueRepository,
    value_objects::erasure::{self, ErasureResult},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const REPORTED_ID_LIMIT: usize = 20;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ProcessTenantDeletionsResult {
    pub due: usize,
    pub deferred_by_buffer: usize,
    pub erased: usize,
    /// Erased tenants where at least one dependent table could not be purged.
    pub erased_with_failures: usize,
    /// Due at scan time but renewed, overridden or dequeued before the lock.
    pub skipped: usize,
    pub failed: usize,
    pub erased_ids: Vec<Uuid>,
    pub failed_ids: Vec<Uuid>,
}

pub struct ProcessTenantDeletionsUseCase<D>
where
    D: DeletionQueueRepository + Send + Sync + 'static,
{
    deletion_repo: Arc<D>,
    buffer_days: u32,
}

impl<D> ProcessTenantDeletionsUseCase<D>
where
    D: DeletionQueueRepository + Send + Sync + 'static,
{
    pub fn new(deletion_repo: Arc<D>, buffer_days: u32) -> Self {
        Self {
            deletion_repo,
            buffer_days,
        }
    }

    pub async fn run(&self, now: DateTime<Utc>) -> Result<ProcessTenantDeletionsResult> {
        let entries = self.deletion_repo.list_due(now).await?;

        let mut result = ProcessTenantDeletionsResult {
            due: entries.len(),
            ..Default::default()
        };

        let due_by = erasure::due_cutoff(now, self.buffer_days);

        for entry in entries {
            let tenant_id = entry.tenant_id;

            let due_by = match due_by {
                Some(due_by) if erasure::is_due(entry.scheduled_delete_at, self.buffer_days, now) => {
                    due_by
                }
                _ => {
                    debug!(
                        %tenant_id,
                        effective_delete_at = ?erasure::effective_delete_at(entry.scheduled_delete_at, self.buffer_days),
                        "process_tenant_deletions: held back by buffer"
                    );
                    result.deferred_by_buffer += 1;
                    continue;
                }
            };

            match self.deletion_repo.erase_tenant(tenant_id, due_by, now).await {
                Ok(ErasureResult::Skipped(skip)) => {
                    info!(%tenant_id, ?skip, "process_tenant_deletions: no longer due; skipped");
                    result.skipped += 1;
                }
                Ok(ErasureResult::Erased(outcome)) => {
                    result.erased += 1;
                    if result.erased_ids.len() < REPORTED_ID_LIMIT {
                        result.erased_ids.push(tenant_id);
                    }

                    if outcome.failures.is_empty() {
                        info!(
                            %tenant_id,
                            rows_deleted = outcome.rows_deleted,
                            "process_tenant_deletions: tenant erased"
                        );
                    } else {
                        result.erased_with_failures += 1;
                        let failed_tables = outcome
                            .failures
                            .iter()
                            .map(|f| f.table.as_str())
                            .collect::<Vec<_>>()
                            .join(", ");
                        warn!(
                            %tenant_id,
                            rows_deleted = outcome.rows_deleted,
                            %failed_tables,
                            "process_tenant_deletions: tenant erased with table failures"
                        );
                    }
                }
                Err(err) => {
                    // Rolled back; the entry stays scheduled and is retried next cycle.
                    error!(
                        %tenant_id,
                        error = ?err,
                        "process_tenant_deletions: erasure failed; will retry"
                    );
                    result.failed += 1;
                    if result.failed_ids.len() < REPORTED_ID_LIMIT {
                        result.failed_ids.push(tenant_id);
                    }
                }
            }
        }

        if result.due > 0 {
            info!(
                due = result.due,
                deferred_by_buffer = result.deferred_by_buffer,
                erased = result.erased,
                erased_with_failures = result.erased_with_failures,
                skipped = result.skipped,
                failed = result.failed,
                "process_tenant_deletions: pass finished"
            );
        }

        Ok(result)
    }
}
