//! Ordered fan-out for erasing a tenant's data.
//!
//! Steps run leaf tables first. Keep this list in dependency order and add
//! every new tenant-scoped table to it. The `deletion_queue` entry is not a
//! step: it goes with the final `tenants` row through `ON DELETE CASCADE`.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::enums::subscription_statuses::SubscriptionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErasureStep {
    pub table: &'static str,
    pub tenant_column: &'static str,
}

const fn step(table: &'static str) -> ErasureStep {
    ErasureStep {
        table,
        tenant_column: "tenant_id",
    }
}

pub const TENANT_ERASURE_STEPS: &[ErasureStep] = &[
    step("subscription_events"),
    step("tenant_subscriptions"),
    step("refresh_tokens"),
    step("pos_devices"),
    step("audit_logs"),
    step("offline_sync_map"),
    step("sale_return_items"),
    step("sale_returns"),
    step("purchase_return_items"),
    step("purchase_returns"),
    step("adjustment_items"),
    step("adjustments"),
    step("stock_ledger"),
    step("purchase_items"),
    step("purchases"),
    step("suppliers"),
    step("sale_items"),
    step("sales"),
    step("inventory_stock"),
    step("product_variants"),
    step("products"),
    step("users"),
];

pub const ERASURE_REASON: &str = "Automatic deletion after 90-day grace period";

/// When the sweep may erase an entry: the stored schedule plus the configured buffer.
/// `None` when that instant is past the representable range.
pub fn effective_delete_at(
    scheduled_delete_at: DateTime<Utc>,
    buffer_days: u32,
) -> Option<DateTime<Utc>> {
    Duration::try_days(i64::from(buffer_days))
        .and_then(|buffer| scheduled_delete_at.checked_add_signed(buffer))
}

/// An entry whose effective time cannot be represented is never due.
pub fn is_due(scheduled_delete_at: DateTime<Utc>, buffer_days: u32, now: DateTime<Utc>) -> bool {
    effective_delete_at(scheduled_delete_at, buffer_days).is_some_and(|at| now >= at)
}

/// Latest stored schedule that is due at `now` once the buffer is applied.
/// `None` means no entry can be due.
pub fn due_cutoff(now: DateTime<Utc>, buffer_days: u32) -> Option<DateTime<Utc>> {
    Duration::try_days(i64::from(buffer_days)).and_then(|buffer| now.checked_sub_signed(buffer))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErasureFailure {
    pub table: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErasureOutcome {
    pub tenant_id: Uuid,
    pub rows_deleted: usize,
    pub tables_purged: usize,
    pub failures: Vec<ErasureFailure>,
    /// False when the tenant row was already gone.
    pub tenant_row_deleted: bool,
}

/// Why an erasure stopped before touching any data.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErasureSkip {
    /// The queue entry is gone, no longer `scheduled`, or not yet due.
    NotQueued,
    /// The subscription left `blocked` (renewal or override).
    NotBlocked(SubscriptionStatus),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErasureResult {
    Skipped(ErasureSkip),
    Erased(ErasureOutcome),
}

impl ErasureOutcome {
    pub fn audit_details(&self) -> String {
        let mut details = format!(
            "{} (tenant {}, {} rows across {} tables)",
            ERASURE_REASON, self.tenant_id, self.rows_deleted, self.tables_purged
        );

        if !self.failures.is_empty() {
            let failed = self
                .failures
                .iter()
                .map(|f| format!("{}: {}", f.table, f.error))
                .collect::<Vec<_>>()
                .join("; ");
            details.push_str(&format!("; failed tables: {}", failed));
        }

        details
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn position(table: &str) -> usize {
        TENANT_ERASURE_STEPS
            .iter()
            .position(|s| s.table == table)
            .unwrap_or_else(|| panic!("{table} missing from erasure steps"))
    }

    #[test]
    fn children_are_erased_before_parents() {
        let child_parent = [
            ("subscription_events", "tenant_subscriptions"),
            ("sale_return_items", "sale_returns"),
            ("sale_returns", "sales"),
            ("offline_sync_map", "sales"),
            ("sale_items", "sales"),
            ("purchase_return_items", "purchase_returns"),
            ("purchase_items", "purchases"),
            ("purchases", "suppliers"),
            ("adjustment_items", "adjustments"),
            ("stock_ledger", "products"),
            ("inventory_stock", "product_variants"),
            ("product_variants", "products"),
            ("refresh_tokens", "users"),
            ("audit_logs", "users"),
        ];

        for (child, parent) in child_parent {
            assert!(
                position(child) < position(parent),
                "{child} must be erased before {parent}"
            );
        }
    }

    #[test]
    fn tenant_row_and_queue_entry_are_not_steps() {
        assert!(
            TENANT_ERASURE_STEPS
                .iter()
                .all(|s| s.table != "tenants" && s.table != "deletion_queue")
        );
        assert_eq!(TENANT_ERASURE_STEPS.last().map(|s| s.table), Some("users"));
    }

    #[test]
    fn buffer_days_push_the_effective_time_back() {
        let scheduled = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();

        assert!(is_due(scheduled, 0, scheduled));
        assert!(!is_due(scheduled, 0, scheduled - Duration::seconds(1)));
        assert!(!is_due(scheduled, 2, scheduled + Duration::days(1)));
        assert!(is_due(scheduled, 2, scheduled + Duration::days(2)));
    }

    #[test]
    fn huge_buffer_is_never_due_and_does_not_panic() {
        let scheduled = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();

        assert_eq!(effective_delete_at(scheduled, u32::MAX), None);
        assert!(!is_due(scheduled, u32::MAX, scheduled));
        assert!(!is_due(scheduled, 200_000_000, scheduled + Duration::days(365)));
        assert_eq!(due_cutoff(scheduled, u32::MAX), None);
    }

    #[test]
    fn due_cutoff_agrees_with_is_due() {
        let now = Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap();
        let cutoff = due_cutoff(now, 3).unwrap();

        assert_eq!(cutoff, now - Duration::days(3));
        assert!(is_due(cutoff, 3, now));
        assert!(!is_due(cutoff + Duration::seconds(1), 3, now));
    }

    #[test]
    fn audit_details_list_failed_tables() {
        let outcome = ErasureOutcome {
            tenant_id: Uuid::nil(),
            rows_deleted: 42,
            tables_purged: 20,
            failures: vec![ErasureFailure {
                table: "pos_devices".to_string(),
                error: "relation \"pos_devices\" does not exist".to_string(),
            }],
            tenant_row_deleted: true,
        };

        let details = outcome.audit_details();
        assert!(details.starts_with(ERASURE_REASON));
        assert!(details.contains("42 rows across 20 tables"));
        assert!(details.contains("failed tables: pos_devices: relation"));
    }
}
