//! The single write path for subscription status.
//!
//! Sweeps, renewals and the admin override all go through here so that every
//! status change carries its event, audit entries, late fee and deletion-queue
//! change in the same transaction.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{
    repositories::tenant_subscriptions::TenantSubscriptionRepository,
    value_objects::{
        enums::subscription_statuses::SubscriptionStatus,
        renewals::{RenewalCommand, RenewalOutcome},
        subscriptions::{AuditEntry, TransitionCommand},
        transitions::{DeletionQueueChange, TransitionPlan, TransitionResult},
    },
};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("subscription not found")]
    SubscriptionNotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LifecycleError {
    /// HTTP status for callers that surface this error directly.
    pub fn status_code(&self) -> u16 {
        match self {
            LifecycleError::SubscriptionNotFound => 404,
            LifecycleError::Internal(_) => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The stored status already matched; nothing was written.
    Unchanged(SubscriptionStatus),
    Applied(TransitionPlan),
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

/// Who asked for the change and what extra audit trail it should leave.
#[derive(Debug, Clone, Default)]
pub struct TransitionContext {
    pub actor_user_id: Option<Uuid>,
    pub extra_audit: Option<AuditEntry>,
    /// The target came from the status clock on an earlier read.
    pub from_timeline: bool,
}

pub struct LifecycleTransitioner<R>
where
    R: TenantSubscriptionRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<R>,
}

impl<R> LifecycleTransitioner<R>
where
    R: TenantSubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<R>) -> Self {
        Self { subscription_repo }
    }

    /// System-initiated transition with no acting user.
    pub async fn apply(
        &self,
        tenant_id: Uuid,
        new_status: SubscriptionStatus,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, LifecycleError> {
        self.apply_with(
            tenant_id,
            new_status,
            reason,
            TransitionContext::default(),
            now,
        )
        .await
    }

    /// Transition decided by the status clock on an unlocked read. Reported as
    /// `Unchanged` when the locked row no longer leads to `new_status`.
    pub async fn apply_from_timeline(
        &self,
        tenant_id: Uuid,
        new_status: SubscriptionStatus,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, LifecycleError> {
        let context = TransitionContext {
            from_timeline: true,
            ..Default::default()
        };
        self.apply_with(tenant_id, new_status, reason, context, now)
            .await
    }

    pub async fn apply_with(
        &self,
        tenant_id: Uuid,
        new_status: SubscriptionStatus,
        reason: &str,
        context: TransitionContext,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, LifecycleError> {
        let command = TransitionCommand {
            tenant_id,
            new_status,
            reason: reason.to_string(),
            actor_user_id: context.actor_user_id,
            extra_audit: context.extra_audit,
            from_timeline: context.from_timeline,
            now,
        };

        let result = self
            .subscription_repo
            .apply_transition(command)
            .await
            .map_err(|err| {
                error!(
                    %tenant_id,
                    new_status = %new_status,
                    db_error = ?err,
                    "lifecycle: transition failed; rolled back"
                );
                LifecycleError::Internal(err)
            })?;

        match result {
            TransitionResult::NotFound => {
                warn!(%tenant_id, new_status = %new_status, "lifecycle: no subscription for tenant");
                Err(LifecycleError::SubscriptionNotFound)
            }
            TransitionResult::Unchanged(status) => Ok(TransitionOutcome::Unchanged(status)),
            TransitionResult::Applied(plan) => {
                info!(
                    %tenant_id,
                    old_status = %plan.old_status,
                    new_status = %plan.new_status,
                    reason = %plan.reason,
                    late_fee_minor = ?plan.late_fee_minor,
                    "lifecycle: status changed"
                );
                if let DeletionQueueChange::Schedule {
                    scheduled_delete_at,
                } = plan.deletion_queue
                {
                    info!(%tenant_id, %scheduled_delete_at, "lifecycle: tenant scheduled for deletion");
                }
                Ok(TransitionOutcome::Applied(plan))
            }
        }
    }

    /// Starts a fresh period on the given plan and returns the tenant to `active`,
    /// clearing any late fee and pending deletion.
    pub async fn renew(&self, command: RenewalCommand) -> Result<RenewalOutcome, LifecycleError> {
        let tenant_id = command.tenant_id;

        let outcome = self
            .subscription_repo
            .renew(command)
            .await
            .map_err(|err| {
                error!(%tenant_id, db_error = ?err, "lifecycle: renewal failed; rolled back");
                LifecycleError::Internal(err)
            })?
            .ok_or(LifecycleError::SubscriptionNotFound)?;

        info!(
            %tenant_id,
            plan_id = %outcome.plan_id,
            previous_status = %outcome.previous_status,
            new_period_end = %outcome.new_period_end,
            late_fee_cleared = outcome.late_fee_cleared,
            "lifecycle: subscription renewed"
        );

        Ok(outcome)
    }
}
