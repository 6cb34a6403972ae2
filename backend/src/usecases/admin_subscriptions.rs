use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use crates::{
    application::lifecycle_transitioner::{
        LifecycleError, LifecycleTransitioner, TransitionContext, TransitionOutcome,
    },
    domain::{
        repositories::{plans::PlanRepository, tenant_subscriptions::TenantSubscriptionRepository},
        value_objects::{
            enums::subscription_statuses::SubscriptionStatus,
            subscriptions::{
                AUDIT_ADMIN_OVERRIDE, AUDIT_ENTITY_SUBSCRIPTION, AuditEntry, PlanDto,
                SubscriptionStatusView,
            },
        },
    },
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_OVERRIDE_REASON: &str = "Manual override by platform admin";

#[derive(Debug, Clone, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SetStatusResponse {
    pub tenant_id: Uuid,
    pub status: SubscriptionStatus,
    pub changed: bool,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum AdminSubscriptionError {
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Subscription not found")]
    SubscriptionNotFound,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AdminSubscriptionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdminSubscriptionError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            AdminSubscriptionError::SubscriptionNotFound => StatusCode::NOT_FOUND,
            AdminSubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LifecycleError> for AdminSubscriptionError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::SubscriptionNotFound => AdminSubscriptionError::SubscriptionNotFound,
            LifecycleError::Internal(err) => AdminSubscriptionError::Internal(err),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, AdminSubscriptionError>;

pub fn override_reason(reason: Option<&str>) -> String {
    match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => format!("Admin override: {reason}"),
        None => DEFAULT_OVERRIDE_REASON.to_string(),
    }
}

pub struct AdminSubscriptionUseCase<S, P>
where
    S: TenantSubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    plan_repo: Arc<P>,
    transitioner: LifecycleTransitioner<S>,
}

impl<S, P> AdminSubscriptionUseCase<S, P>
where
    S: TenantSubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>, plan_repo: Arc<P>) -> Self {
        let transitioner = LifecycleTransitioner::new(Arc::clone(&subscription_repo));
        Self {
            subscription_repo,
            plan_repo,
            transitioner,
        }
    }

    pub async fn subscription(
        &self,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> UseCaseResult<SubscriptionStatusView> {
        let record = self
            .subscription_repo
            .find_by_tenant_id(tenant_id)
            .await?
            .ok_or(AdminSubscriptionError::SubscriptionNotFound)?;

        let plan = self
            .plan_repo
            .find_by_id(record.plan_id)
            .await?
            .map(PlanDto::from);

        Ok(SubscriptionStatusView::build(&record, plan, now))
    }

    pub async fn set_status(
        &self,
        tenant_id: Uuid,
        admin_user_id: Uuid,
        request: SetStatusRequest,
        now: DateTime<Utc>,
    ) -> UseCaseResult<SetStatusResponse> {
        let status: SubscriptionStatus = request
            .status
            .trim()
            .parse()
            .map_err(|_| AdminSubscriptionError::InvalidStatus(request.status.clone()))?;

        let reason = override_reason(request.reason.as_deref());

        let context = TransitionContext {
            actor_user_id: Some(admin_user_id),
            extra_audit: Some(AuditEntry {
                user_id: Some(admin_user_id),
                action: AUDIT_ADMIN_OVERRIDE.to_string(),
                entity_type: AUDIT_ENTITY_SUBSCRIPTION.to_string(),
                details: format!("Set status to {status}: {reason}"),
            }),
            from_timeline: false,
        };

        let outcome = self
            .transitioner
            .apply_with(tenant_id, status, &reason, context, now)
            .await?;

        info!(
            %tenant_id,
            %admin_user_id,
            status = %status,
            changed = outcome.is_applied(),
            "admin_subscriptions: status override handled"
        );

        Ok(SetStatusResponse {
            tenant_id,
            status,
            changed: matches!(outcome, TransitionOutcome::Applied(_)),
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crates::domain::{
        repositories::{
            plans::MockPlanRepository, tenant_subscriptions::MockTenantSubscriptionRepository,
        },
        value_objects::transitions::{
            BlockedAtChange, DeletionQueueChange, TransitionPlan, TransitionResult,
        },
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn request(status: &str, reason: Option<&str>) -> SetStatusRequest {
        SetStatusRequest {
            status: status.to_string(),
            reason: reason.map(str::to_string),
        }
    }

    #[test]
    fn reason_defaults_when_blank() {
        assert_eq!(override_reason(None), DEFAULT_OVERRIDE_REASON);
        assert_eq!(override_reason(Some("   ")), DEFAULT_OVERRIDE_REASON);
        assert_eq!(
            override_reason(Some("paid by bank transfer")),
            "Admin override: paid by bank transfer"
        );
    }

    #[tokio::test]
    async fn unknown_status_is_rejected_without_writing() {
        let mut subscription_repo = MockTenantSubscriptionRepository::new();
        subscription_repo.expect_apply_transition().never();

        let use_case =
            AdminSubscriptionUseCase::new(Arc::new(subscription_repo), Arc::new(MockPlanRepository::new()));
        let err = use_case
            .set_status(Uuid::new_v4(), Uuid::new_v4(), request("expired", None), now())
            .await
            .unwrap_err();

        assert!(matches!(err, AdminSubscriptionError::InvalidStatus(ref s) if s == "expired"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn override_runs_through_transition_with_admin_audit() {
        let tenant_id = Uuid::new_v4();
        let admin = Uuid::new_v4();

        let mut subscription_repo = MockTenantSubscriptionRepository::new();
        subscription_repo
            .expect_apply_transition()
            .withf(move |cmd| {
                let audit = cmd.extra_audit.as_ref();
                cmd.tenant_id == tenant_id
                    && cmd.new_status == SubscriptionStatus::Active
                    && cmd.reason == "Admin override: paid by bank transfer"
                    && cmd.actor_user_id == Some(admin)
                    && audit.map(|a| a.action.as_str()) == Some(AUDIT_ADMIN_OVERRIDE)
                    && audit.and_then(|a| a.user_id) == Some(admin)
            })
            .times(1)
            .returning(move |cmd| {
                Box::pin(async move {
                    Ok(TransitionResult::Applied(TransitionPlan {
                        old_status: SubscriptionStatus::Blocked,
                        new_status: cmd.new_status,
                        changed_at: cmd.now,
                        reason: cmd.reason.clone(),
                        late_fee_minor: None,
                        blocked_at: BlockedAtChange::Clear,
                        deletion_queue: DeletionQueueChange::Remove,
                    }))
                })
            });

        let use_case =
            AdminSubscriptionUseCase::new(Arc::new(subscription_repo), Arc::new(MockPlanRepository::new()));
        let response = use_case
            .set_status(
                tenant_id,
                admin,
                request("active", Some("paid by bank transfer")),
                now(),
            )
            .await
            .unwrap();

        assert_eq!(response.status, SubscriptionStatus::Active);
        assert!(response.changed);
    }

    #[tokio::test]
    async fn override_for_missing_subscription_is_not_found() {
        let mut subscription_repo = MockTenantSubscriptionRepository::new();
        subscription_repo
            .expect_apply_transition()
            .returning(|_| Box::pin(async move { Ok(TransitionResult::NotFound) }));

        let use_case =
            AdminSubscriptionUseCase::new(Arc::new(subscription_repo), Arc::new(MockPlanRepository::new()));
        let err = use_case
            .set_status(Uuid::new_v4(), Uuid::new_v4(), request("blocked", None), now())
            .await
            .unwrap_err();

        assert!(matches!(err, AdminSubscriptionError::SubscriptionNotFound));
    }
}
