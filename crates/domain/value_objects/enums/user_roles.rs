use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    PlatformAdmin,
    Owner,
    Manager,
    Cashier,
}

impl UserRole {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "platform_admin" => Some(UserRole::PlatformAdmin),
            "owner" => Some(UserRole::Owner),
            "manager" => Some(UserRole::Manager),
            "cashier" => Some(UserRole::Cashier),
            _ => None,
        }
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role = match self {
            UserRole::PlatformAdmin => "platform_admin",
            UserRole::Owner => "owner",
            UserRole::Manager => "manager",
            UserRole::Cashier => "cashier",
        };
        write!(f, "{}", role)
    }
}
