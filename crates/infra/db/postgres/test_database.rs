//! Live Postgres fixtures for repository tests.
//!
//! Tests using these skip themselves when neither `TEST_DATABASE_URL` nor
//! `DATABASE_URL` is set, or the database cannot be reached. Every fixture
//! uses fresh ids, so tests can share one database and run in parallel.

use anyhow::Result;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use diesel::{connection::SimpleConnection, insert_into, prelude::*};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::{
    domain::{
        entities::{
            deletion_queue::DeletionQueueEntity, tenant_subscriptions::TenantSubscriptionEntity,
        },
        value_objects::enums::{
            deletion_statuses::DeletionStatus, subscription_statuses::SubscriptionStatus,
        },
    },
    infra::db::postgres::{
        postgres_connection::{self, PgPoolSquad},
        schema::{audit_logs, deletion_queue, plans, subscription_events, tenant_subscriptions, tenants},
    },
};

const LIFECYCLE_SCHEMA: &str = include_str!(
    "../../../../migrations/2026-01-01-000000_subscription_lifecycle/up.sql"
);

static SCHEMA_READY: Mutex<bool> = Mutex::new(false);

pub fn maybe_pool() -> Option<Arc<PgPoolSquad>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()?;

    let pool = postgres_connection::establish_connection(&database_url).ok()?;

    let mut ready = SCHEMA_READY.lock().ok()?;
    if !*ready {
        let mut conn = pool.get().ok()?;
        conn.batch_execute(LIFECYCLE_SCHEMA).ok()?;
        *ready = true;
    }

    Some(Arc::new(pool))
}

/// Postgres keeps microseconds; comparing against full-precision instants would flake.
pub fn db_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub struct SeededTenant {
    pub tenant_id: Uuid,
    pub plan_id: Uuid,
}

pub struct SubscriptionSeed {
    pub status: SubscriptionStatus,
    pub period_end: DateTime<Utc>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub late_fee_minor: i64,
}

pub fn seed_tenant(pool: &PgPoolSquad, seed: SubscriptionSeed) -> Result<SeededTenant> {
    let mut conn = pool.get()?;
    let tenant_id = Uuid::new_v4();
    let plan_id = Uuid::new_v4();
    let now = db_now();

    insert_into(plans::table)
        .values((
            plans::id.eq(plan_id),
            plans::code.eq(format!("plan-{plan_id}")),
            plans::name.eq("Monthly"),
            plans::duration_type.eq("monthly"),
            plans::is_active.eq(true),
            plans::is_public.eq(true),
        ))
        .execute(&mut conn)?;

    insert_into(tenants::table)
        .values((
            tenants::id.eq(tenant_id),
            tenants::name.eq(format!("tenant-{tenant_id}")),
            tenants::created_at.eq(now),
        ))
        .execute(&mut conn)?;

    insert_into(tenant_subscriptions::table)
        .values((
            tenant_subscriptions::tenant_id.eq(tenant_id),
            tenant_subscriptions::plan_id.eq(plan_id),
            tenant_subscriptions::currency.eq("USD"),
            tenant_subscriptions::status.eq(seed.status.to_string()),
            tenant_subscriptions::current_period_start.eq(seed.period_end - Duration::days(30)),
            tenant_subscriptions::current_period_end.eq(seed.period_end),
            tenant_subscriptions::blocked_at.eq(seed.blocked_at),
            tenant_subscriptions::late_fee_minor.eq(seed.late_fee_minor),
            tenant_subscriptions::last_status_change_at.eq(seed.blocked_at),
        ))
        .execute(&mut conn)?;

    Ok(SeededTenant { tenant_id, plan_id })
}

pub fn seed_queue_entry(
    pool: &PgPoolSquad,
    tenant_id: Uuid,
    scheduled_delete_at: DateTime<Utc>,
) -> Result<()> {
    let mut conn = pool.get()?;
    insert_into(deletion_queue::table)
        .values((
            deletion_queue::tenant_id.eq(tenant_id),
            deletion_queue::scheduled_delete_at.eq(scheduled_delete_at),
            deletion_queue::status.eq(DeletionStatus::Scheduled.to_string()),
            deletion_queue::created_at.eq(db_now()),
        ))
        .execute(&mut conn)?;
    Ok(())
}

pub fn subscription_row(
    pool: &PgPoolSquad,
    tenant_id: Uuid,
) -> Result<Option<TenantSubscriptionEntity>> {
    let mut conn = pool.get()?;
    Ok(tenant_subscriptions::table
        .find(tenant_id)
        .select(TenantSubscriptionEntity::as_select())
        .first(&mut conn)
        .optional()?)
}

pub fn queue_row(pool: &PgPoolSquad, tenant_id: Uuid) -> Result<Option<DeletionQueueEntity>> {
    let mut conn = pool.get()?;
    Ok(deletion_queue::table
        .find(tenant_id)
        .select(DeletionQueueEntity::as_select())
        .first(&mut conn)
        .optional()?)
}

pub fn tenant_exists(pool: &PgPoolSquad, tenant_id: Uuid) -> Result<bool> {
    let mut conn = pool.get()?;
    let count: i64 = tenants::table
        .filter(tenants::id.eq(tenant_id))
        .count()
        .get_result(&mut conn)?;
    Ok(count > 0)
}

pub fn event_count(pool: &PgPoolSquad, tenant_id: Uuid) -> Result<i64> {
    let mut conn = pool.get()?;
    Ok(subscription_events::table
        .filter(subscription_events::tenant_id.eq(tenant_id))
        .count()
        .get_result(&mut conn)?)
}

/// Platform-level audit rows mentioning the tenant.
pub fn platform_audit_count(pool: &PgPoolSquad, tenant_id: Uuid, action: &str) -> Result<i64> {
    let mut conn = pool.get()?;
    Ok(audit_logs::table
        .filter(audit_logs::tenant_id.is_null())
        .filter(audit_logs::action.eq(action))
        .filter(audit_logs::details.like(format!("%{tenant_id}%")))
        .count()
        .get_result(&mut conn)?)
}
