use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    entities::subscription_events::SubscriptionEventEntity,
    repositories::subscription_events::SubscriptionEventRepository,
};
use crate::infra::db::postgres::{postgres_connection::PgPoolSquad, schema::subscription_events};

pub struct SubscriptionEventPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionEventPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionEventRepository for SubscriptionEventPostgres {
    async fn list_for_tenant(
        &self,
        tenant_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SubscriptionEventEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = subscription_events::table
            .filter(subscription_events::tenant_id.eq(tenant_id))
            .order((
                subscription_events::created_at.desc(),
                subscription_events::id.desc(),
            ))
            .limit(limit)
            .select(SubscriptionEventEntity::as_select())
            .load::<SubscriptionEventEntity>(&mut conn)?;

        Ok(rows)
    }
}
