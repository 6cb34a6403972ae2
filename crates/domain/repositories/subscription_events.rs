use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscription_events::SubscriptionEventEntity;

#[async_trait]
#[automock]
pub trait SubscriptionEventRepository {
    /// Newest first.
    async fn list_for_tenant(
        &self,
        tenant_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SubscriptionEventEntity>>;
}
