use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeletionStatus {
    #[default]
    Scheduled,
    Processing,
    Done,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown deletion status: {0}")]
pub struct UnknownDeletionStatus(pub String);

impl Display for DeletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            DeletionStatus::Scheduled => "scheduled",
            DeletionStatus::Processing => "processing",
            DeletionStatus::Done => "done",
        };
        write!(f, "{}", status)
    }
}

impl FromStr for DeletionStatus {
    type Err = UnknownDeletionStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(DeletionStatus::Scheduled),
            "processing" => Ok(DeletionStatus::Processing),
            "done" => Ok(DeletionStatus::Done),
            other => Err(UnknownDeletionStatus(other.to_string())),
        }
    }
}
