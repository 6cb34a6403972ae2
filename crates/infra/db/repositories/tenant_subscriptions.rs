use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{PgConnection, RunQueryDsl, delete, insert_into, prelude::*, update};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain::{
        entities::{
            deletion_queue::InsertDeletionQueueEntity,
            tenant_subscriptions::TenantSubscriptionEntity,
        },
        repositories::tenant_subscriptions::TenantSubscriptionRepository,
        value_objects::{
            enums::{
                deletion_statuses::DeletionStatus, subscription_statuses::SubscriptionStatus,
            },
            renewals::{self, RENEWAL_REASON, RenewalCommand, RenewalOutcome},
            subscriptions::{
                AUDIT_ENTITY_SUBSCRIPTION, AUDIT_RENEWED, AUDIT_STATUS_CHANGE, AuditEntry,
                SubscriptionRecord, TransitionCommand,
            },
            transitions::{self, BlockedAtChange, DeletionQueueChange, TransitionResult},
        },
    },
    infra::db::{
        postgres::{
            postgres_connection::PgPoolSquad,
            schema::{deletion_queue, tenant_subscriptions},
        },
        repositories::transition_log,
    },
};

pub struct TenantSubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl TenantSubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn to_record(entity: TenantSubscriptionEntity) -> Result<SubscriptionRecord> {
    let tenant_id = entity.tenant_id;
    SubscriptionRecord::try_from(entity)
        .with_context(|| format!("invalid subscription row for tenant {tenant_id}"))
}

/// Row-level lock held until the surrounding transaction ends.
fn lock_subscription(
    conn: &mut PgConnection,
    tenant_id: Uuid,
) -> Result<Option<SubscriptionRecord>> {
    tenant_subscriptions::table
        .find(tenant_id)
        .select(TenantSubscriptionEntity::as_select())
        .for_update()
        .first::<TenantSubscriptionEntity>(conn)
        .optional()?
        .map(to_record)
        .transpose()
}

fn schedule_deletion(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    scheduled_delete_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<()> {
    let entry = InsertDeletionQueueEntity {
        tenant_id,
        scheduled_delete_at,
        status: DeletionStatus::Scheduled.to_string(),
        created_at: now,
    };

    insert_into(deletion_queue::table)
        .values(&entry)
        .on_conflict(deletion_queue::tenant_id)
        .do_update()
        .set((
            deletion_queue::scheduled_delete_at.eq(scheduled_delete_at),
            deletion_queue::status.eq(DeletionStatus::Scheduled.to_string()),
        ))
        .execute(conn)?;

    Ok(())
}

fn remove_deletion_entry(conn: &mut PgConnection, tenant_id: Uuid) -> Result<()> {
    delete(deletion_queue::table.filter(deletion_queue::tenant_id.eq(tenant_id))).execute(conn)?;
    Ok(())
}

fn apply_transition_in_tx(
    conn: &mut PgConnection,
    command: &TransitionCommand,
) -> Result<TransitionResult> {
    let Some(record) = lock_subscription(conn, command.tenant_id)? else {
        return Ok(TransitionResult::NotFound);
    };

    let planned = if command.from_timeline {
        transitions::plan_timeline_transition(
            &record,
            command.new_status,
            &command.reason,
            command.now,
        )
    } else {
        transitions::plan_transition(&record, command.new_status, &command.reason, command.now)
    };

    let Some(plan) = planned else {
        return Ok(TransitionResult::Unchanged(record.status));
    };

    update(tenant_subscriptions::table.find(command.tenant_id))
        .set((
            tenant_subscriptions::status.eq(plan.new_status.to_string()),
            tenant_subscriptions::last_status_change_at.eq(Some(plan.changed_at)),
        ))
        .execute(conn)?;

    if let Some(fee) = plan.late_fee_minor {
        update(tenant_subscriptions::table.find(command.tenant_id))
            .set(tenant_subscriptions::late_fee_minor.eq(fee))
            .execute(conn)?;
    }

    match plan.blocked_at {
        BlockedAtChange::Keep => {}
        BlockedAtChange::Set(at) => {
            update(tenant_subscriptions::table.find(command.tenant_id))
                .set(tenant_subscriptions::blocked_at.eq(Some(at)))
                .execute(conn)?;
        }
        BlockedAtChange::Clear => {
            update(tenant_subscriptions::table.find(command.tenant_id))
                .set(tenant_subscriptions::blocked_at.eq::<Option<DateTime<Utc>>>(None))
                .execute(conn)?;
        }
    }

    transition_log::append_subscription_event(
        conn,
        command.tenant_id,
        Some(plan.old_status),
        plan.new_status,
        &plan.reason,
        plan.changed_at,
    )?;

    transition_log::append_audit_log(
        conn,
        Some(command.tenant_id),
        &AuditEntry {
            user_id: command.actor_user_id,
            action: AUDIT_STATUS_CHANGE.to_string(),
            entity_type: AUDIT_ENTITY_SUBSCRIPTION.to_string(),
            details: plan.audit_details(),
        },
        plan.changed_at,
    )?;

    if let Some(extra) = command.extra_audit.as_ref() {
        transition_log::append_audit_log(conn, Some(command.tenant_id), extra, plan.changed_at)?;
    }

    match plan.deletion_queue {
        DeletionQueueChange::Keep => {}
        DeletionQueueChange::Schedule {
            scheduled_delete_at,
        } => schedule_deletion(conn, command.tenant_id, scheduled_delete_at, plan.changed_at)?,
        DeletionQueueChange::Remove => remove_deletion_entry(conn, command.tenant_id)?,
    }

    Ok(TransitionResult::Applied(plan))
}

fn renew_in_tx(conn: &mut PgConnection, command: &RenewalCommand) -> Result<Option<RenewalOutcome>> {
    let Some(record) = lock_subscription(conn, command.tenant_id)? else {
        return Ok(None);
    };

    let plan = renewals::plan_renewal(&record, command)
        .ok_or_else(|| anyhow!("renewal period end overflows for tenant {}", command.tenant_id))?;

    update(tenant_subscriptions::table.find(command.tenant_id))
        .set((
            tenant_subscriptions::plan_id.eq(command.plan_id),
            tenant_subscriptions::currency.eq(command.currency.as_str()),
            tenant_subscriptions::status.eq(SubscriptionStatus::Active.to_string()),
            tenant_subscriptions::current_period_start.eq(plan.period_start),
            tenant_subscriptions::current_period_end.eq(plan.period_end),
            tenant_subscriptions::late_fee_minor.eq(0_i64),
            tenant_subscriptions::blocked_at.eq::<Option<DateTime<Utc>>>(None),
            tenant_subscriptions::last_status_change_at.eq(Some(command.now)),
        ))
        .execute(conn)?;

    transition_log::append_subscription_event(
        conn,
        command.tenant_id,
        Some(plan.old_status),
        SubscriptionStatus::Active,
        RENEWAL_REASON,
        command.now,
    )?;

    transition_log::append_audit_log(
        conn,
        Some(command.tenant_id),
        &AuditEntry {
            user_id: Some(command.actor_user_id),
            action: AUDIT_RENEWED.to_string(),
            entity_type: AUDIT_ENTITY_SUBSCRIPTION.to_string(),
            details: plan.audit_details(command),
        },
        command.now,
    )?;

    remove_deletion_entry(conn, command.tenant_id)?;

    Ok(Some(RenewalOutcome::from_plan(&plan, command)))
}

#[async_trait]
impl TenantSubscriptionRepository for TenantSubscriptionPostgres {
    async fn find_by_tenant_id(&self, tenant_id: Uuid) -> Result<Option<SubscriptionRecord>> {
        // Diesel is synchronous; run DB work on the blocking threadpool.
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<SubscriptionRecord>> {
            let mut conn = db_pool.get()?;

            tenant_subscriptions::table
                .find(tenant_id)
                .select(TenantSubscriptionEntity::as_select())
                .first::<TenantSubscriptionEntity>(&mut conn)
                .optional()?
                .map(to_record)
                .transpose()
        })
        .await??)
    }

    async fn list_non_blocked(&self) -> Result<Vec<SubscriptionRecord>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<SubscriptionRecord>> {
            let mut conn = db_pool.get()?;

            tenant_subscriptions::table
                .filter(tenant_subscriptions::status.ne(SubscriptionStatus::Blocked.to_string()))
                .select(TenantSubscriptionEntity::as_select())
                .load::<TenantSubscriptionEntity>(&mut conn)?
                .into_iter()
                .map(to_record)
                .collect()
        })
        .await??)
    }

    async fn apply_transition(&self, command: TransitionCommand) -> Result<TransitionResult> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<TransitionResult> {
            let mut conn = db_pool.get()?;
            conn.transaction::<TransitionResult, anyhow::Error, _>(|conn| {
                apply_transition_in_tx(conn, &command)
            })
        })
        .await??)
    }

    async fn renew(&self, command: RenewalCommand) -> Result<Option<RenewalOutcome>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<RenewalOutcome>> {
            let mut conn = db_pool.get()?;
            conn.transaction::<Option<RenewalOutcome>, anyhow::Error, _>(|conn| {
                renew_in_tx(conn, &command)
            })
        })
        .await??)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::value_objects::{
            enums::plan_durations::PlanDuration, transitions::DELETION_RETENTION_DAYS,
        },
        infra::db::postgres::test_database::{self, SubscriptionSeed, db_now},
    };
    use chrono::Duration;

    macro_rules! pool_or_skip {
        () => {
            match test_database::maybe_pool() {
                Some(pool) => pool,
                None => {
                    eprintln!("skipping: TEST_DATABASE_URL/DATABASE_URL unset or unreachable");
                    return;
                }
            }
        };
    }

    fn timeline_command(
        tenant_id: Uuid,
        target: SubscriptionStatus,
        now: DateTime<Utc>,
    ) -> TransitionCommand {
        TransitionCommand {
            tenant_id,
            new_status: target,
            reason: "Automatic transition based on timeline".to_string(),
            actor_user_id: None,
            extra_audit: None,
            from_timeline: true,
            now,
        }
    }

    fn renewal(tenant_id: Uuid, plan_id: Uuid, now: DateTime<Utc>) -> RenewalCommand {
        RenewalCommand {
            tenant_id,
            actor_user_id: Uuid::new_v4(),
            plan_id,
            plan_name: "Monthly".to_string(),
            duration: PlanDuration::Monthly,
            currency: "USD".to_string(),
            now,
        }
    }

    fn lapsed_read_only(now: DateTime<Utc>) -> SubscriptionSeed {
        SubscriptionSeed {
            status: SubscriptionStatus::ReadOnly,
            period_end: now - Duration::days(22),
            blocked_at: None,
            late_fee_minor: 500,
        }
    }

    #[tokio::test]
    async fn blocking_schedules_deletion_ninety_days_out() {
        let pool = pool_or_skip!();
        let now = db_now();
        let seeded = test_database::seed_tenant(&pool, lapsed_read_only(now)).unwrap();
        let repo = TenantSubscriptionPostgres::new(Arc::clone(&pool));

        let result = repo
            .apply_transition(timeline_command(seeded.tenant_id, SubscriptionStatus::Blocked, now))
            .await
            .unwrap();
        assert!(matches!(result, TransitionResult::Applied(_)));

        let row = test_database::subscription_row(&pool, seeded.tenant_id)
            .unwrap()
            .unwrap();
        assert_eq!(row.status, "blocked");
        assert_eq!(row.blocked_at, Some(now));
        assert_eq!(row.last_status_change_at, Some(now));

        let queued = test_database::queue_row(&pool, seeded.tenant_id)
            .unwrap()
            .unwrap();
        assert_eq!(queued.status, "scheduled");
        assert_eq!(
            queued.scheduled_delete_at,
            now + Duration::days(DELETION_RETENTION_DAYS)
        );
        assert_eq!(test_database::event_count(&pool, seeded.tenant_id).unwrap(), 1);
    }

    #[tokio::test]
    async fn renewal_clears_block_fee_and_pending_deletion() {
        let pool = pool_or_skip!();
        let now = db_now();
        let blocked_at = now - Duration::days(3);
        let seeded = test_database::seed_tenant(
            &pool,
            SubscriptionSeed {
                status: SubscriptionStatus::Blocked,
                period_end: now - Duration::days(24),
                blocked_at: Some(blocked_at),
                late_fee_minor: 500,
            },
        )
        .unwrap();
        test_database::seed_queue_entry(&pool, seeded.tenant_id, blocked_at + Duration::days(90))
            .unwrap();
        let repo = TenantSubscriptionPostgres::new(Arc::clone(&pool));

        let outcome = repo
            .renew(renewal(seeded.tenant_id, seeded.plan_id, now))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome.previous_status, SubscriptionStatus::Blocked);
        assert!(outcome.late_fee_cleared);

        let row = test_database::subscription_row(&pool, seeded.tenant_id)
            .unwrap()
            .unwrap();
        assert_eq!(row.status, "active");
        assert_eq!(row.blocked_at, None);
        assert_eq!(row.late_fee_minor, 0);
        assert_eq!(row.current_period_start, now);
        assert!(test_database::queue_row(&pool, seeded.tenant_id).unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_timeline_target_leaves_a_renewed_row_alone() {
        let pool = pool_or_skip!();
        let now = db_now();
        // What the row looks like right after a renewal committed.
        let seeded = test_database::seed_tenant(
            &pool,
            SubscriptionSeed {
                status: SubscriptionStatus::Active,
                period_end: now + Duration::days(30),
                blocked_at: None,
                late_fee_minor: 0,
            },
        )
        .unwrap();
        let repo = TenantSubscriptionPostgres::new(Arc::clone(&pool));

        let result = repo
            .apply_transition(timeline_command(seeded.tenant_id, SubscriptionStatus::Blocked, now))
            .await
            .unwrap();

        assert_eq!(result, TransitionResult::Unchanged(SubscriptionStatus::Active));
        let row = test_database::subscription_row(&pool, seeded.tenant_id)
            .unwrap()
            .unwrap();
        assert_eq!(row.status, "active");
        assert_eq!(row.blocked_at, None);
        assert!(test_database::queue_row(&pool, seeded.tenant_id).unwrap().is_none());
        assert_eq!(test_database::event_count(&pool, seeded.tenant_id).unwrap(), 0);
    }

    #[tokio::test]
    async fn racing_sweep_and_renewal_always_end_renewed() {
        let pool = pool_or_skip!();
        let now = db_now();
        let repo = TenantSubscriptionPostgres::new(Arc::clone(&pool));

        for _ in 0..10 {
            let seeded = test_database::seed_tenant(&pool, lapsed_read_only(now)).unwrap();

            let (swept, renewed) = tokio::join!(
                repo.apply_transition(timeline_command(
                    seeded.tenant_id,
                    SubscriptionStatus::Blocked,
                    now
                )),
                repo.renew(renewal(seeded.tenant_id, seeded.plan_id, now)),
            );
            swept.unwrap();
            renewed.unwrap().unwrap();

            let row = test_database::subscription_row(&pool, seeded.tenant_id)
                .unwrap()
                .unwrap();
            assert_eq!(row.status, "active");
            assert_eq!(row.blocked_at, None);
            assert_eq!(row.late_fee_minor, 0);
            assert!(test_database::queue_row(&pool, seeded.tenant_id).unwrap().is_none());
        }
    }
}
