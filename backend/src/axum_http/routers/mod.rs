pub mod admin_subscriptions;
pub mod billing;
