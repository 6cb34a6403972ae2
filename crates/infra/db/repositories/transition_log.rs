//! Append-only writes shared by every lifecycle transaction.
//!
//! These take the caller's connection so the rows commit or roll back with
//! the status change they describe.

use anyhow::Result;
use chrono::{DateTime, Utc};
use diesel::{PgConnection, RunQueryDsl, insert_into};
use uuid::Uuid;

use crate::{
    domain::{
        entities::{
            audit_logs::InsertAuditLogEntity,
            subscription_events::InsertSubscriptionEventEntity,
        },
        value_objects::{
            enums::subscription_statuses::SubscriptionStatus, subscriptions::AuditEntry,
        },
    },
    infra::db::postgres::schema::{audit_logs, subscription_events},
};

pub fn append_subscription_event(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    old_status: Option<SubscriptionStatus>,
    new_status: SubscriptionStatus,
    reason: &str,
    created_at: DateTime<Utc>,
) -> Result<()> {
    let event = InsertSubscriptionEventEntity {
        id: Uuid::new_v4(),
        tenant_id,
        old_status: old_status.map(|s| s.to_string()),
        new_status: new_status.to_string(),
        reason: Some(reason.to_string()),
        created_at,
    };

    insert_into(subscription_events::table)
        .values(&event)
        .execute(conn)?;

    Ok(())
}

/// `tenant_id` is `None` for platform-level entries that must outlive the tenant.
pub fn append_audit_log(
    conn: &mut PgConnection,
    tenant_id: Option<Uuid>,
    entry: &AuditEntry,
    created_at: DateTime<Utc>,
) -> Result<()> {
    let row = InsertAuditLogEntity {
        id: Uuid::new_v4(),
        tenant_id,
        user_id: entry.user_id,
        action: entry.action.clone(),
        entity_type: entry.entity_type.clone(),
        details: Some(entry.details.clone()),
        created_at,
    };

    insert_into(audit_logs::table).values(&row).execute(conn)?;

    Ok(())
}
