use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::subscription_events;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = subscription_events)]
pub struct SubscriptionEventEntity {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub old_status: Option<String>,
    pub new_status: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = subscription_events)]
pub struct InsertSubscriptionEventEntity {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub old_status: Option<String>,
    pub new_status: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
