use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Billing standing of a tenant. Stored as snake_case text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    RenewalWindow,
    GracePenalty,
    ReadOnly,
    Blocked,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown subscription status: {0}")]
pub struct UnknownSubscriptionStatus(pub String);

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 6] = [
        SubscriptionStatus::Trialing,
        SubscriptionStatus::Active,
        SubscriptionStatus::RenewalWindow,
        SubscriptionStatus::GracePenalty,
        SubscriptionStatus::ReadOnly,
        SubscriptionStatus::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::RenewalWindow => "renewal_window",
            SubscriptionStatus::GracePenalty => "grace_penalty",
            SubscriptionStatus::ReadOnly => "read_only",
            SubscriptionStatus::Blocked => "blocked",
        }
    }
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = UnknownSubscriptionStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubscriptionStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownSubscriptionStatus(s.to_string()))
    }
}
