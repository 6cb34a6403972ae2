pub mod access_policy;
pub mod enums;
pub mod erasure;
pub mod late_fees;
pub mod renewals;
pub mod status_clock;
pub mod subscriptions;
pub mod transitions;
