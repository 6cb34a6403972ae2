use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::{erasure::ErasureResult, subscriptions::DeletionQueueEntry};

#[async_trait]
#[automock]
pub trait DeletionQueueRepository {
    /// Entries still `scheduled` whose stored delete time is at or before `now`.
    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<DeletionQueueEntry>>;

    /// Erases every tenant-scoped row and the tenant itself in one transaction.
    ///
    /// Under row locks the entry must still be `scheduled` with a delete time at
    /// or before `due_by`, and the subscription must still be `blocked`;
    /// otherwise nothing is touched and the skip is returned. Per-table failures
    /// are collected in the outcome; a failed tenant-row delete rolls everything
    /// back and is returned as an error.
    async fn erase_tenant(
        &self,
        tenant_id: Uuid,
        due_by: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<ErasureResult>;
}
