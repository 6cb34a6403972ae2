use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    entities::{
        deletion_queue::DeletionQueueEntity, plans::PlanEntity,
        subscription_events::SubscriptionEventEntity,
        tenant_subscriptions::TenantSubscriptionEntity,
    },
    value_objects::{
        enums::{
            deletion_statuses::{DeletionStatus, UnknownDeletionStatus},
            subscription_statuses::{SubscriptionStatus, UnknownSubscriptionStatus},
        },
        late_fees::format_minor,
        status_clock::{self, StatusTimeline},
    },
};

pub const AUDIT_STATUS_CHANGE: &str = "subscription_status_change";
pub const AUDIT_RENEWED: &str = "subscription_renewed";
pub const AUDIT_ADMIN_OVERRIDE: &str = "admin_subscription_override";
pub const AUDIT_TENANT_DELETED: &str = "tenant_deleted";
pub const AUDIT_ENTITY_SUBSCRIPTION: &str = "subscription";
pub const AUDIT_ENTITY_TENANT: &str = "tenant";

/// One tenant's subscription with a typed status.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionRecord {
    pub tenant_id: Uuid,
    pub plan_id: Uuid,
    pub currency: String,
    /// Last computed value; a hint only. Use `status_clock::compute_status` for decisions.
    pub status: SubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub late_fee_minor: i64,
    pub last_status_change_at: Option<DateTime<Utc>>,
}

impl TryFrom<TenantSubscriptionEntity> for SubscriptionRecord {
    type Error = UnknownSubscriptionStatus;

    fn try_from(entity: TenantSubscriptionEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            tenant_id: entity.tenant_id,
            plan_id: entity.plan_id,
            currency: entity.currency,
            status: entity.status.parse()?,
            current_period_start: entity.current_period_start,
            current_period_end: entity.current_period_end,
            blocked_at: entity.blocked_at,
            late_fee_minor: entity.late_fee_minor,
            last_status_change_at: entity.last_status_change_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeletionQueueEntry {
    pub tenant_id: Uuid,
    pub scheduled_delete_at: DateTime<Utc>,
    pub status: DeletionStatus,
}

impl TryFrom<DeletionQueueEntity> for DeletionQueueEntry {
    type Error = UnknownDeletionStatus;

    fn try_from(entity: DeletionQueueEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            tenant_id: entity.tenant_id,
            scheduled_delete_at: entity.scheduled_delete_at,
            status: entity.status.parse()?,
        })
    }
}

/// An audit-log row written inside a lifecycle transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub user_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionCommand {
    pub tenant_id: Uuid,
    pub new_status: SubscriptionStatus,
    pub reason: String,
    pub actor_user_id: Option<Uuid>,
    pub extra_audit: Option<AuditEntry>,
    /// Target was derived from the timeline on an unlocked snapshot. The write
    /// path recomputes it from the locked row and skips when they disagree.
    pub from_timeline: bool,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanDto {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub duration_type: String,
}

impl From<PlanEntity> for PlanDto {
    fn from(plan: PlanEntity) -> Self {
        Self {
            id: plan.id,
            code: plan.code,
            name: plan.name,
            duration_type: plan.duration_type,
        }
    }
}

/// Response body of the current-subscription endpoints. `status` is always freshly computed.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionStatusView {
    pub tenant_id: Uuid,
    pub status: SubscriptionStatus,
    pub stored_status: SubscriptionStatus,
    pub plan: Option<PlanDto>,
    pub currency: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub renewal_window_end_at: DateTime<Utc>,
    pub grace_end_at: DateTime<Utc>,
    pub read_only_end_at: DateTime<Utc>,
    pub days_until_end: i64,
    pub blocked_at: Option<DateTime<Utc>>,
    pub late_fee_minor: i64,
    pub late_fee_amount: String,
    pub has_late_fee: bool,
}

impl SubscriptionStatusView {
    pub fn build(record: &SubscriptionRecord, plan: Option<PlanDto>, now: DateTime<Utc>) -> Self {
        let StatusTimeline {
            renewal_window_end_at,
            grace_end_at,
            read_only_end_at,
        } = StatusTimeline::from_period_end(record.current_period_end);

        Self {
            tenant_id: record.tenant_id,
            status: status_clock::compute_status(record, now),
            stored_status: record.status,
            plan,
            currency: record.currency.clone(),
            current_period_start: record.current_period_start,
            current_period_end: record.current_period_end,
            renewal_window_end_at,
            grace_end_at,
            read_only_end_at,
            days_until_end: (record.current_period_end - now).num_days(),
            blocked_at: record.blocked_at,
            late_fee_minor: record.late_fee_minor,
            late_fee_amount: format_minor(record.late_fee_minor),
            has_late_fee: record.late_fee_minor > 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionEventDto {
    pub id: Uuid,
    pub old_status: Option<String>,
    pub new_status: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<SubscriptionEventEntity> for SubscriptionEventDto {
    fn from(event: SubscriptionEventEntity) -> Self {
        Self {
            id: event.id,
            old_status: event.old_status,
            new_status: event.new_status,
            reason: event.reason,
            created_at: event.created_at,
        }
    }
}
