use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::audit_logs;

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = audit_logs)]
pub struct InsertAuditLogEntity {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub entity_type: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}
