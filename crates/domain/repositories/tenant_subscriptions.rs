use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::{
    renewals::{RenewalCommand, RenewalOutcome},
    subscriptions::{SubscriptionRecord, TransitionCommand},
    transitions::TransitionResult,
};

#[async_trait]
#[automock]
pub trait TenantSubscriptionRepository {
    async fn find_by_tenant_id(&self, tenant_id: Uuid) -> Result<Option<SubscriptionRecord>>;

    /// Every subscription whose stored status is not `blocked`.
    async fn list_non_blocked(&self) -> Result<Vec<SubscriptionRecord>>;

    /// Locks the tenant's row and applies the status change, its event, its audit
    /// entries, the late fee and the deletion-queue change in one transaction.
    async fn apply_transition(&self, command: TransitionCommand) -> Result<TransitionResult>;

    /// Returns `None` when the tenant has no subscription.
    async fn renew(&self, command: RenewalCommand) -> Result<Option<RenewalOutcome>>;
}
