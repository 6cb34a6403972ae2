//! Maps a freshly computed lifecycle status to what a request may do.

use serde::Serialize;

use crate::domain::value_objects::enums::subscription_statuses::SubscriptionStatus;

pub const CODE_READ_ONLY: &str = "SUBSCRIPTION_READ_ONLY";
pub const CODE_BLOCKED: &str = "SUBSCRIPTION_BLOCKED";

const EXEMPT_PREFIXES: [&str; 3] = ["/api/v1/public", "/api/v1/auth", "/api/v1/admin"];
const BILLING_PREFIX: &str = "/api/v1/billing";
const EXPORT_PREFIX: &str = "/api/v1/export";

const BLOCKED_ALLOWED: [(&str, &str); 3] = [
    ("GET", "/api/v1/billing/current"),
    ("GET", "/api/v1/billing/plans"),
    ("POST", "/api/v1/billing/renew"),
];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AccessDenial {
    pub error: &'static str,
    pub status: SubscriptionStatus,
    pub code: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(AccessDenial),
}

/// Public, auth and platform-admin routes are never gated by a tenant's subscription.
pub fn is_exempt_path(path: &str) -> bool {
    EXEMPT_PREFIXES
        .iter()
        .any(|prefix| is_under(path, prefix))
}

pub fn evaluate(status: SubscriptionStatus, method: &str, path: &str) -> AccessDecision {
    match status {
        SubscriptionStatus::Trialing
        | SubscriptionStatus::Active
        | SubscriptionStatus::RenewalWindow
        | SubscriptionStatus::GracePenalty => AccessDecision::Allow,
        SubscriptionStatus::ReadOnly => {
            if is_read(method) || is_under(path, BILLING_PREFIX) {
                AccessDecision::Allow
            } else {
                AccessDecision::Deny(AccessDenial {
                    error: "Your subscription is in read-only mode. Please renew to continue making changes.",
                    status,
                    code: CODE_READ_ONLY,
                })
            }
        }
        SubscriptionStatus::Blocked => {
            let allowed = BLOCKED_ALLOWED
                .iter()
                .any(|(m, p)| method.eq_ignore_ascii_case(m) && path == *p)
                || (method.eq_ignore_ascii_case("GET") && is_export_endpoint(path));

            if allowed {
                AccessDecision::Allow
            } else {
                AccessDecision::Deny(AccessDenial {
                    error: "Your subscription is blocked. Please renew immediately to restore access.",
                    status,
                    code: CODE_BLOCKED,
                })
            }
        }
    }
}

fn is_read(method: &str) -> bool {
    method.eq_ignore_ascii_case("GET") || method.eq_ignore_ascii_case("HEAD")
}

fn is_export_endpoint(path: &str) -> bool {
    path.strip_prefix(EXPORT_PREFIX)
        .is_some_and(|rest| rest.len() > 1 && rest.starts_with('/'))
}

fn is_under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn denied_code(decision: AccessDecision) -> Option<&'static str> {
        match decision {
            AccessDecision::Allow => None,
            AccessDecision::Deny(denial) => Some(denial.code),
        }
    }

    #[test]
    fn good_standing_allows_everything() {
        for status in [
            SubscriptionStatus::Trialing,
            SubscriptionStatus::Active,
            SubscriptionStatus::RenewalWindow,
            SubscriptionStatus::GracePenalty,
        ] {
            assert_eq!(
                evaluate(status, "DELETE", "/api/v1/products/1"),
                AccessDecision::Allow
            );
        }
    }

    #[test]
    fn read_only_allows_reads_and_billing() {
        let status = SubscriptionStatus::ReadOnly;

        assert_eq!(evaluate(status, "GET", "/api/v1/sales"), AccessDecision::Allow);
        assert_eq!(
            evaluate(status, "POST", "/api/v1/billing/renew"),
            AccessDecision::Allow
        );
        assert_eq!(
            evaluate(status, "POST", "/api/v1/billing/choose-plan"),
            AccessDecision::Allow
        );
        assert_eq!(
            denied_code(evaluate(status, "POST", "/api/v1/pos/sales")),
            Some(CODE_READ_ONLY)
        );
        assert_eq!(
            denied_code(evaluate(status, "POST", "/api/v1/billingfake")),
            Some(CODE_READ_ONLY)
        );
    }

    #[test]
    fn blocked_allows_only_the_renewal_surface_and_exports() {
        let status = SubscriptionStatus::Blocked;

        for (method, path) in [
            ("GET", "/api/v1/billing/current"),
            ("GET", "/api/v1/billing/plans"),
            ("POST", "/api/v1/billing/renew"),
            ("GET", "/api/v1/export/sales.csv"),
        ] {
            assert_eq!(evaluate(status, method, path), AccessDecision::Allow, "{method} {path}");
        }

        for (method, path) in [
            ("GET", "/api/v1/products"),
            ("POST", "/api/v1/billing/current"),
            ("GET", "/api/v1/billing/events"),
            ("POST", "/api/v1/export/sales.csv"),
            ("GET", "/api/v1/export"),
        ] {
            assert_eq!(
                denied_code(evaluate(status, method, path)),
                Some(CODE_BLOCKED),
                "{method} {path}"
            );
        }
    }

    #[test]
    fn exempt_paths_are_matched_by_segment() {
        assert!(is_exempt_path("/api/v1/auth/login"));
        assert!(is_exempt_path("/api/v1/admin"));
        assert!(is_exempt_path("/api/v1/public/pages/home"));
        assert!(!is_exempt_path("/api/v1/administrators"));
        assert!(!is_exempt_path("/api/v1/billing/current"));
    }
}
