use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::{
    enums::{plan_durations::PlanDuration, subscription_statuses::SubscriptionStatus},
    late_fees::format_minor,
    subscriptions::SubscriptionRecord,
};

pub const RENEWAL_REASON: &str = "Manual renewal via billing page";

#[derive(Debug, Clone, PartialEq)]
pub struct RenewalCommand {
    pub tenant_id: Uuid,
    pub actor_user_id: Uuid,
    pub plan_id: Uuid,
    pub plan_name: String,
    pub duration: PlanDuration,
    pub currency: String,
    pub now: DateTime<Utc>,
}

/// Writes performed by a renewal, computed under the subscription row lock.
#[derive(Debug, Clone, PartialEq)]
pub struct RenewalPlan {
    pub old_status: SubscriptionStatus,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub cleared_late_fee_minor: i64,
}

impl RenewalPlan {
    pub fn audit_details(&self, command: &RenewalCommand) -> String {
        let late_fee = if self.cleared_late_fee_minor > 0 {
            format!(
                " (Late fee cleared: {} {})",
                format_minor(self.cleared_late_fee_minor),
                command.currency
            )
        } else {
            String::new()
        };

        format!(
            "Renewed to plan {}, period: {} - {}{}",
            command.plan_name,
            self.period_start.format("%Y-%m-%d"),
            self.period_end.format("%Y-%m-%d"),
            late_fee
        )
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenewalOutcome {
    pub plan_id: Uuid,
    pub plan_name: String,
    pub previous_status: SubscriptionStatus,
    pub status: SubscriptionStatus,
    pub new_period_start: DateTime<Utc>,
    pub new_period_end: DateTime<Utc>,
    pub late_fee_cleared: bool,
    pub late_fee_amount: String,
}

impl RenewalOutcome {
    pub fn from_plan(plan: &RenewalPlan, command: &RenewalCommand) -> Self {
        Self {
            plan_id: command.plan_id,
            plan_name: command.plan_name.clone(),
            previous_status: plan.old_status,
            status: SubscriptionStatus::Active,
            new_period_start: plan.period_start,
            new_period_end: plan.period_end,
            late_fee_cleared: plan.cleared_late_fee_minor > 0,
            late_fee_amount: format_minor(plan.cleared_late_fee_minor),
        }
    }
}

/// `None` when the period end overflows the calendar.
pub fn plan_renewal(record: &SubscriptionRecord, command: &RenewalCommand) -> Option<RenewalPlan> {
    let period_end = command.duration.period_end(command.now)?;

    Some(RenewalPlan {
        old_status: record.status,
        period_start: command.now,
        period_end,
        cleared_late_fee_minor: record.late_fee_minor,
    })
}
