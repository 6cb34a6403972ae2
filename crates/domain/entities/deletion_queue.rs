use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::deletion_queue;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = deletion_queue)]
#[diesel(primary_key(tenant_id))]
pub struct DeletionQueueEntity {
    pub tenant_id: Uuid,
    pub scheduled_delete_at: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = deletion_queue)]
pub struct InsertDeletionQueueEntity {
    pub tenant_id: Uuid,
    pub scheduled_delete_at: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}
