use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{PgConnection, RunQueryDsl, prelude::*, sql_query, sql_types, update};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::task;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::{
        entities::deletion_queue::DeletionQueueEntity,
        repositories::deletion_queue::DeletionQueueRepository,
        value_objects::{
            enums::{
                deletion_statuses::DeletionStatus, subscription_statuses::SubscriptionStatus,
            },
            erasure::{ErasureFailure, ErasureOutcome, ErasureResult, ErasureSkip, ErasureStep},
            subscriptions::{
                AUDIT_ENTITY_TENANT, AUDIT_TENANT_DELETED, AuditEntry, DeletionQueueEntry,
            },
        },
    },
    infra::db::{
        postgres::{
            postgres_connection::PgPoolSquad,
            schema::{deletion_queue, tenant_subscriptions, tenants},
        },
        repositories::transition_log,
    },
};

pub struct DeletionQueuePostgres {
    db_pool: Arc<PgPoolSquad>,
    steps: &'static [ErasureStep],
    /// Upper bound on one tenant's erasure transaction.
    time_budget: Duration,
}

impl DeletionQueuePostgres {
    pub fn new(
        db_pool: Arc<PgPoolSquad>,
        steps: &'static [ErasureStep],
        time_budget: Duration,
    ) -> Self {
        Self {
            db_pool,
            steps,
            time_budget,
        }
    }
}

/// Deletes one table's rows inside a savepoint so a failure does not abort the
/// enclosing transaction.
fn purge_step(conn: &mut PgConnection, step: &ErasureStep, tenant_id: Uuid) -> Result<usize> {
    // Table and column names come from a static list, never from input.
    let statement = format!(
        "DELETE FROM {} WHERE {} = $1",
        step.table, step.tenant_column
    );

    let deleted = conn.transaction::<usize, diesel::result::Error, _>(|conn| {
        sql_query(statement)
            .bind::<sql_types::Uuid, _>(tenant_id)
            .execute(conn)
    })?;

    Ok(deleted)
}

/// Time left of an erasure's budget, `None` once it is spent.
fn remaining_budget(budget: Duration, elapsed: Duration) -> Option<Duration> {
    budget.checked_sub(elapsed).filter(|left| !left.is_zero())
}

/// Caps the next statements at `timeout`. SET does not take bind parameters.
fn set_statement_timeout(conn: &mut PgConnection, timeout: Duration) -> Result<()> {
    sql_query(format!(
        "SET LOCAL statement_timeout = {}",
        timeout.as_millis().max(1)
    ))
    .execute(conn)?;
    Ok(())
}

/// Shrinks the statement timeout to what is left of the budget so the whole
/// transaction, not each statement, is bounded.
fn enter_budgeted_step(
    conn: &mut PgConnection,
    budget: Duration,
    started: Instant,
    tenant_id: Uuid,
) -> Result<()> {
    let left = remaining_budget(budget, started.elapsed()).ok_or_else(|| {
        anyhow!("erasure of tenant {tenant_id} exceeded its {budget:?} budget")
    })?;
    set_statement_timeout(conn, left)
}

/// Locks the subscription row, then the queue row (the same order a renewal
/// takes them), and checks both still call for erasure.
fn lock_erasure_target(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    due_by: DateTime<Utc>,
) -> Result<Option<ErasureSkip>> {
    let subscription_status = tenant_subscriptions::table
        .find(tenant_id)
        .select(tenant_subscriptions::status)
        .for_update()
        .first::<String>(conn)
        .optional()?;

    if let Some(raw) = subscription_status {
        let status = raw
            .parse::<SubscriptionStatus>()
            .with_context(|| format!("invalid subscription row for tenant {tenant_id}"))?;
        if status != SubscriptionStatus::Blocked {
            return Ok(Some(ErasureSkip::NotBlocked(status)));
        }
    }

    let queued = deletion_queue::table
        .find(tenant_id)
        .filter(deletion_queue::status.eq(DeletionStatus::Scheduled.to_string()))
        .filter(deletion_queue::scheduled_delete_at.le(due_by))
        .select(deletion_queue::tenant_id)
        .for_update()
        .first::<Uuid>(conn)
        .optional()?;

    Ok(queued.is_none().then_some(ErasureSkip::NotQueued))
}

fn erase_tenant_in_tx(
    conn: &mut PgConnection,
    steps: &[ErasureStep],
    time_budget: Duration,
    tenant_id: Uuid,
    due_by: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<ErasureResult> {
    let started = Instant::now();

    sql_query(format!(
        "SET LOCAL idle_in_transaction_session_timeout = {}",
        time_budget.as_millis().max(1)
    ))
    .execute(conn)?;
    set_statement_timeout(conn, time_budget)?;

    if let Some(skip) = lock_erasure_target(conn, tenant_id, due_by)? {
        info!(%tenant_id, ?skip, "tenant_erasure: no longer due; skipped");
        return Ok(ErasureResult::Skipped(skip));
    }

    let marked = update(deletion_queue::table.find(tenant_id))
        .set(deletion_queue::status.eq(DeletionStatus::Processing.to_string()))
        .execute(conn)?;
    if marked != 1 {
        bail!("deletion queue entry for tenant {tenant_id} vanished under lock");
    }

    let mut outcome = ErasureOutcome {
        tenant_id,
        rows_deleted: 0,
        tables_purged: 0,
        failures: Vec::new(),
        tenant_row_deleted: false,
    };

    for step in steps {
        enter_budgeted_step(conn, time_budget, started, tenant_id)?;
        match purge_step(conn, step, tenant_id) {
            Ok(deleted) => {
                outcome.rows_deleted += deleted;
                outcome.tables_purged += 1;
            }
            Err(err) => {
                warn!(
                    %tenant_id,
                    table = step.table,
                    db_error = ?err,
                    "tenant_erasure: failed to purge table; continuing"
                );
                outcome.failures.push(ErasureFailure {
                    table: step.table.to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    enter_budgeted_step(conn, time_budget, started, tenant_id)?;
    let deleted_tenants = diesel::delete(tenants::table.find(tenant_id))
        .execute(conn)
        .with_context(|| format!("failed to delete tenant row {tenant_id}"))?;
    outcome.tenant_row_deleted = deleted_tenants > 0;

    // Platform-level entry: the tenant's own audit rows are gone by now.
    transition_log::append_audit_log(
        conn,
        None,
        &AuditEntry {
            user_id: None,
            action: AUDIT_TENANT_DELETED.to_string(),
            entity_type: AUDIT_ENTITY_TENANT.to_string(),
            details: outcome.audit_details(),
        },
        now,
    )?;

    info!(
        %tenant_id,
        rows_deleted = outcome.rows_deleted,
        tables_purged = outcome.tables_purged,
        failed_tables = outcome.failures.len(),
        tenant_row_deleted = outcome.tenant_row_deleted,
        "tenant_erasure: transaction ready to commit"
    );

    Ok(ErasureResult::Erased(outcome))
}

#[async_trait]
impl DeletionQueueRepository for DeletionQueuePostgres {
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<DeletionQueueEntry>> {
        // Diesel is synchronous; run DB work on the blocking threadpool.
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<DeletionQueueEntry>> {
            let mut conn = db_pool.get()?;

            let rows = deletion_queue::table
                .filter(deletion_queue::status.eq(DeletionStatus::Scheduled.to_string()))
                .filter(deletion_queue::scheduled_delete_at.le(now))
                .order(deletion_queue::scheduled_delete_at.asc())
                .select(DeletionQueueEntity::as_select())
                .load::<DeletionQueueEntity>(&mut conn)?;

            rows.into_iter()
                .map(|row| {
                    let tenant_id = row.tenant_id;
                    DeletionQueueEntry::try_from(row).with_context(|| {
                        format!("invalid deletion queue row for tenant {tenant_id}")
                    })
                })
                .collect()
        })
        .await??)
    }

    async fn erase_tenant(
        &self,
        tenant_id: Uuid,
        due_by: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<ErasureResult> {
        let db_pool = Arc::clone(&self.db_pool);
        let steps = self.steps;
        let time_budget = self.time_budget;

        Ok(task::spawn_blocking(move || -> Result<ErasureResult> {
            let mut conn = db_pool.get()?;
            conn.transaction::<ErasureResult, anyhow::Error, _>(|conn| {
                erase_tenant_in_tx(conn, steps, time_budget, tenant_id, due_by, now)
            })
        })
        .await??)
    }
}
