pub mod deletion_statuses;
pub mod plan_durations;
pub mod subscription_statuses;
pub mod user_roles;
