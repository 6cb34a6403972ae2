use anyhow::Result;
use chrono::{DateTime, Utc};
use crates::{
    application::lifecycle_transitioner::{LifecycleTransitioner, TransitionOutcome},
    domain::{
        repositories::tenant_subscriptions::TenantSubscriptionRepository,
        value_objects::status_clock,
    },
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

const REPORTED_ID_LIMIT: usize = 20;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ReconcileSubscriptionsResult {
    pub scanned: usize,
    pub drifted: usize,
    pub transitioned: usize,
    pub failed: usize,
    pub transitioned_ids: Vec<Uuid>,
    pub failed_ids: Vec<Uuid>,
}

pub fn automatic_reason(period_end: DateTime<Utc>) -> String {
    format!(
        "Automatic transition based on timeline (period ended: {})",
        period_end.format("%Y-%m-%d")
    )
}

pub struct ReconcileSubscriptionsUseCase<R>
where
    R: TenantSubscriptionRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<R>,
    transitioner: LifecycleTransitioner<R>,
}

impl<R> ReconcileSubscriptionsUseCase<R>
where
    R: TenantSubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<R>) -> Self {
        let transitioner = LifecycleTransitioner::new(Arc::clone(&subscription_repo));
        Self {
            subscription_repo,
            transitioner,
        }
    }

    /// One pass over every non-blocked subscription. A failing tenant is logged
    /// and counted; it never stops the pass.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<ReconcileSubscriptionsResult> {
        let records = self.subscription_repo.list_non_blocked().await?;

        let mut result = ReconcileSubscriptionsResult {
            scanned: records.len(),
            ..Default::default()
        };

        for record in records {
            let target = status_clock::compute_status(&record, now);
            if target == record.status {
                continue;
            }
            result.drifted += 1;

            let tenant_id = record.tenant_id;
            let reason = automatic_reason(record.current_period_end);

            match self
                .transitioner
                .apply_from_timeline(tenant_id, target, &reason, now)
                .await
            {
                Ok(TransitionOutcome::Applied(_)) => {
                    result.transitioned += 1;
                    if result.transitioned_ids.len() < REPORTED_ID_LIMIT {
                        result.transitioned_ids.push(tenant_id);
                    }
                }
                Ok(TransitionOutcome::Unchanged(status)) => {
                    // Another writer got there between the scan and the row lock.
                    debug!(%tenant_id, %status, "reconcile_subscriptions: already transitioned");
                }
                Err(err) => {
                    error!(
                        %tenant_id,
                        from = %record.status,
                        to = %target,
                        error = ?err,
                        "reconcile_subscriptions: transition failed; continuing"
                    );
                    result.failed += 1;
                    if result.failed_ids.len() < REPORTED_ID_LIMIT {
                        result.failed_ids.push(tenant_id);
                    }
                }
            }
        }

        info!(
            scanned = result.scanned,
            drifted = result.drifted,
            transitioned = result.transitioned,
            failed = result.failed,
            "reconcile_subscriptions: pass finished"
        );

        Ok(result)
    }
}
