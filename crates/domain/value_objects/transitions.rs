use chrono::{DateTime, Duration, Utc};

use crate::domain::value_objects::{
    enums::subscription_statuses::SubscriptionStatus,
    late_fees::late_fee_minor,
    status_clock,
    subscriptions::SubscriptionRecord,
};

/// Days a blocked tenant's data is retained before erasure.
pub const DELETION_RETENTION_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockedAtChange {
    Keep,
    Set(DateTime<Utc>),
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionQueueChange {
    Keep,
    /// Upsert the tenant's entry as `scheduled`, overwriting any stale schedule.
    Schedule { scheduled_delete_at: DateTime<Utc> },
    Remove,
}

/// Every write a status change performs. Applied as one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan {
    pub old_status: SubscriptionStatus,
    pub new_status: SubscriptionStatus,
    pub changed_at: DateTime<Utc>,
    pub reason: String,
    /// `Some` when a late fee is assessed by this transition.
    pub late_fee_minor: Option<i64>,
    pub blocked_at: BlockedAtChange,
    pub deletion_queue: DeletionQueueChange,
}

impl TransitionPlan {
    pub fn audit_details(&self) -> String {
        format!("{} -> {}: {}", self.old_status, self.new_status, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionResult {
    NotFound,
    Unchanged(SubscriptionStatus),
    Applied(TransitionPlan),
}

/// Returns `None` when the record already has `new_status`.
pub fn plan_transition(
    record: &SubscriptionRecord,
    new_status: SubscriptionStatus,
    reason: &str,
    now: DateTime<Utc>,
) -> Option<TransitionPlan> {
    if record.status == new_status {
        return None;
    }

    // Fees are never reduced here; only a renewal clears them.
    let late_fee_minor = (new_status == SubscriptionStatus::GracePenalty
        && record.late_fee_minor == 0)
        .then(|| late_fee_minor(&record.currency));

    let (blocked_at, deletion_queue) = if new_status == SubscriptionStatus::Blocked {
        (
            BlockedAtChange::Set(now),
            DeletionQueueChange::Schedule {
                scheduled_delete_at: now + Duration::days(DELETION_RETENTION_DAYS),
            },
        )
    } else if record.status == SubscriptionStatus::Blocked {
        (BlockedAtChange::Clear, DeletionQueueChange::Remove)
    } else {
        (BlockedAtChange::Keep, DeletionQueueChange::Keep)
    };

    Some(TransitionPlan {
        old_status: record.status,
        new_status,
        changed_at: now,
        reason: reason.to_string(),
        late_fee_minor,
        blocked_at,
        deletion_queue,
    })
}

/// Like `plan_transition`, for a target computed from an earlier read. The
/// locked `record` wins: if the clock no longer yields `new_status` for it
/// (a renewal or override committed in between), nothing is planned.
pub fn plan_timeline_transition(
    record: &SubscriptionRecord,
    new_status: SubscriptionStatus,
    reason: &str,
    now: DateTime<Utc>,
) -> Option<TransitionPlan> {
    if status_clock::compute_status(record, now) != new_status {
        return None;
    }
    plan_transition(record, new_status, reason, now)
}
