use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::plan_durations::PlanDuration,
    infra::db::postgres::schema::plans,
};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plans)]
pub struct PlanEntity {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub duration_type: String,
    pub is_active: bool,
    pub is_public: bool,
}

impl PlanEntity {
    pub fn duration(&self) -> PlanDuration {
        PlanDuration::from_str(&self.duration_type)
    }
}
