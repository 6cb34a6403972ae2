//! Derives a tenant's lifecycle status from its billing period.
//!
//! After `current_period_end` a tenant walks through three fixed seven-day
//! windows (renewal, grace penalty, read-only) before being blocked. The
//! function is pure: the caller supplies `now`.

use chrono::{DateTime, Duration, Utc};

use crate::domain::value_objects::{
    enums::subscription_statuses::SubscriptionStatus, subscriptions::SubscriptionRecord,
};

pub const RENEWAL_WINDOW_DAYS: i64 = 7;
pub const GRACE_PENALTY_DAYS: i64 = 7;
pub const READ_ONLY_DAYS: i64 = 7;

/// Exclusive end instants of each escalation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTimeline {
    pub renewal_window_end_at: DateTime<Utc>,
    pub grace_end_at: DateTime<Utc>,
    pub read_only_end_at: DateTime<Utc>,
}

impl StatusTimeline {
    pub fn from_period_end(period_end: DateTime<Utc>) -> Self {
        let renewal_window_end_at = period_end + Duration::days(RENEWAL_WINDOW_DAYS);
        let grace_end_at = renewal_window_end_at + Duration::days(GRACE_PENALTY_DAYS);
        let read_only_end_at = grace_end_at + Duration::days(READ_ONLY_DAYS);

        Self {
            renewal_window_end_at,
            grace_end_at,
            read_only_end_at,
        }
    }
}

pub fn compute_status(record: &SubscriptionRecord, now: DateTime<Utc>) -> SubscriptionStatus {
    // Trials never expire through the clock.
    if record.status == SubscriptionStatus::Trialing {
        return SubscriptionStatus::Trialing;
    }

    if now <= record.current_period_end {
        return SubscriptionStatus::Active;
    }

    let timeline = StatusTimeline::from_period_end(record.current_period_end);
    if now < timeline.renewal_window_end_at {
        SubscriptionStatus::RenewalWindow
    } else if now < timeline.grace_end_at {
        SubscriptionStatus::GracePenalty
    } else if now < timeline.read_only_end_at {
        SubscriptionStatus::ReadOnly
    } else {
        SubscriptionStatus::Blocked
    }
}
