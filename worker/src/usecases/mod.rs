pub mod process_tenant_deletions;
pub mod reconcile_subscriptions;
