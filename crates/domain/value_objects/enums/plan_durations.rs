use std::fmt::Display;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

/// Billing period length class of a plan.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlanDuration {
    #[default]
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "quarterly")]
    Quarterly,
    #[serde(rename = "half_yearly")]
    HalfYearly,
    #[serde(rename = "yearly")]
    Yearly,
    #[serde(rename = "2y")]
    TwoYear,
}

impl PlanDuration {
    /// Unknown duration classes renew as monthly.
    pub fn from_str(value: &str) -> Self {
        match value {
            "quarterly" => PlanDuration::Quarterly,
            "half_yearly" => PlanDuration::HalfYearly,
            "yearly" => PlanDuration::Yearly,
            "2y" => PlanDuration::TwoYear,
            _ => PlanDuration::Monthly,
        }
    }

    pub fn months(&self) -> u32 {
        match self {
            PlanDuration::Monthly => 1,
            PlanDuration::Quarterly => 3,
            PlanDuration::HalfYearly => 6,
            PlanDuration::Yearly => 12,
            PlanDuration::TwoYear => 24,
        }
    }

    /// Calendar-month arithmetic; the day is clamped to the end of shorter months.
    pub fn period_end(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        start.checked_add_months(Months::new(self.months()))
    }
}

impl Display for PlanDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let duration = match self {
            PlanDuration::Monthly => "monthly",
            PlanDuration::Quarterly => "quarterly",
            PlanDuration::HalfYearly => "half_yearly",
            PlanDuration::Yearly => "yearly",
            PlanDuration::TwoYear => "2y",
        };
        write!(f, "{}", duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unknown_duration_falls_back_to_monthly() {
        assert_eq!(PlanDuration::from_str("4y"), PlanDuration::Monthly);
        assert_eq!(PlanDuration::from_str(""), PlanDuration::Monthly);
        assert_eq!(PlanDuration::from_str("2y"), PlanDuration::TwoYear);
    }

    #[test]
    fn period_end_adds_calendar_months() {
        let start = Utc.with_ymd_and_hms(2026, 1, 31, 9, 30, 0).unwrap();

        assert_eq!(
            PlanDuration::Monthly.period_end(start),
            Some(Utc.with_ymd_and_hms(2026, 2, 28, 9, 30, 0).unwrap())
        );
        assert_eq!(
            PlanDuration::HalfYearly.period_end(start),
            Some(Utc.with_ymd_and_hms(2026, 7, 31, 9, 30, 0).unwrap())
        );
        assert_eq!(
            PlanDuration::TwoYear.period_end(start),
            Some(Utc.with_ymd_and_hms(2028, 1, 31, 9, 30, 0).unwrap())
        );
    }
}
