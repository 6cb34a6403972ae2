use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::tenant_subscriptions;

/// Raw row. `status` is converted to `SubscriptionStatus` at the repository boundary.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = tenant_subscriptions)]
#[diesel(primary_key(tenant_id))]
pub struct TenantSubscriptionEntity {
    pub tenant_id: Uuid,
    pub plan_id: Uuid,
    pub currency: String,
    pub status: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub blocked_at: Option<DateTime<Utc>>,
    pub late_fee_minor: i64,
    pub last_status_change_at: Option<DateTime<Utc>>,
}
