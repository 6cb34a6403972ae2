pub mod deletion_queue;
pub mod plans;
pub mod subscription_events;
pub mod tenant_subscriptions;
pub mod users;
