use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use crates::{
    application::lifecycle_transitioner::{LifecycleError, LifecycleTransitioner},
    domain::{
        repositories::{
            plans::PlanRepository, subscription_events::SubscriptionEventRepository,
            tenant_subscriptions::TenantSubscriptionRepository,
        },
        value_objects::{
            late_fees::is_valid_currency_code,
            renewals::{RenewalCommand, RenewalOutcome},
            subscriptions::{PlanDto, SubscriptionEventDto, SubscriptionStatusView},
        },
    },
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

pub const DEFAULT_EVENT_LIMIT: i64 = 50;
pub const MAX_EVENT_LIMIT: i64 = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct RenewRequest {
    pub plan_id: Uuid,
    pub currency: String,
}

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Subscription not found")]
    SubscriptionNotFound,

    #[error("Plan not found or inactive")]
    PlanNotFound,

    #[error("Currency must be a 3-letter code")]
    InvalidCurrency,

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl BillingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BillingError::SubscriptionNotFound | BillingError::PlanNotFound => {
                StatusCode::NOT_FOUND
            }
            BillingError::InvalidCurrency => StatusCode::BAD_REQUEST,
            BillingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LifecycleError> for BillingError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::SubscriptionNotFound => BillingError::SubscriptionNotFound,
            LifecycleError::Internal(err) => BillingError::Internal(err),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, BillingError>;

/// Clamps a requested page size to `1..=MAX_EVENT_LIMIT`.
pub fn event_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_EVENT_LIMIT)
        .clamp(1, MAX_EVENT_LIMIT)
}

pub struct BillingUseCase<S, P, E>
where
    S: TenantSubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    E: SubscriptionEventRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    plan_repo: Arc<P>,
    event_repo: Arc<E>,
    transitioner: LifecycleTransitioner<S>,
}

impl<S, P, E> BillingUseCase<S, P, E>
where
    S: TenantSubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    E: SubscriptionEventRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>, plan_repo: Arc<P>, event_repo: Arc<E>) -> Self {
        let transitioner = LifecycleTransitioner::new(Arc::clone(&subscription_repo));
        Self {
            subscription_repo,
            plan_repo,
            event_repo,
            transitioner,
        }
    }

    pub async fn current(
        &self,
        tenant_id: Uuid,
        now: DateTime<Utc>,
    ) -> UseCaseResult<SubscriptionStatusView> {
        let record = self
            .subscription_repo
            .find_by_tenant_id(tenant_id)
            .await
            .map_err(|err| {
                error!(%tenant_id, db_error = ?err, "billing: failed to load subscription");
                BillingError::Internal(err)
            })?
            .ok_or(BillingError::SubscriptionNotFound)?;

        let plan = self
            .plan_repo
            .find_by_id(record.plan_id)
            .await?
            .map(PlanDto::from);

        Ok(SubscriptionStatusView::build(&record, plan, now))
    }

    pub async fn plans(&self) -> UseCaseResult<Vec<PlanDto>> {
        let plans = self.plan_repo.list_active_public().await?;
        Ok(plans.into_iter().map(PlanDto::from).collect())
    }

    pub async fn events(
        &self,
        tenant_id: Uuid,
        limit: Option<i64>,
    ) -> UseCaseResult<Vec<SubscriptionEventDto>> {
        let events = self
            .event_repo
            .list_for_tenant(tenant_id, event_limit(limit))
            .await?;

        Ok(events.into_iter().map(SubscriptionEventDto::from).collect())
    }

    pub async fn renew(
        &self,
        tenant_id: Uuid,
        actor_user_id: Uuid,
        request: RenewRequest,
        now: DateTime<Utc>,
    ) -> UseCaseResult<RenewalOutcome> {
        let currency = request.currency.trim().to_ascii_uppercase();
        if !is_valid_currency_code(&currency) {
            return Err(BillingError::InvalidCurrency);
        }

        let plan = self
            .plan_repo
            .find_active_by_id(request.plan_id)
            .await?
            .ok_or(BillingError::PlanNotFound)?;

        let command = RenewalCommand {
            tenant_id,
            actor_user_id,
            plan_id: plan.id,
            duration: plan.duration(),
            plan_name: plan.name,
            currency,
            now,
        };

        let outcome = self.transitioner.renew(command).await?;
        info!(
            %tenant_id,
            %actor_user_id,
            plan_id = %outcome.plan_id,
            "billing: renewal completed"
        );

        Ok(outcome)
    }
}
