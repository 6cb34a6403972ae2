use anyhow::Result;
use chrono::Utc;
use crates::domain::repositories::{
    deletion_queue::DeletionQueueRepository,
    tenant_subscriptions::TenantSubscriptionRepository,
};
use std::{sync::Arc, time::Duration};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use crate::usecases::{
    process_tenant_deletions::ProcessTenantDeletionsUseCase,
    reconcile_subscriptions::ReconcileSubscriptionsUseCase,
};

/// Reconciles immediately on start, then every `period`.
pub async fn run_reconciliation<R>(
    usecase: Arc<ReconcileSubscriptionsUseCase<R>>,
    period: Duration,
) -> Result<()>
where
    R: TenantSubscriptionRepository + Send + Sync + 'static,
{
    info!(period_secs = period.as_secs(), "reconcile_subscriptions: loop started");

    // The first tick completes at once.
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(err) = usecase.run(Utc::now()).await {
            error!(error = ?err, "reconcile_subscriptions: pass failed");
        }
    }
}

/// Sweeps the deletion queue every `period`, first run one period after start.
pub async fn run_deletions<D>(
    usecase: Arc<ProcessTenantDeletionsUseCase<D>>,
    period: Duration,
) -> Result<()>
where
    D: DeletionQueueRepository + Send + Sync + 'static,
{
    info!(period_secs = period.as_secs(), "process_tenant_deletions: loop started");

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if let Err(err) = usecase.run(Utc::now()).await {
            error!(error = ?err, "process_tenant_deletions: pass failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::domain::repositories::{
        deletion_queue::MockDeletionQueueRepository,
        tenant_subscriptions::MockTenantSubscriptionRepository,
    };

    #[tokio::test(start_paused = true)]
    async fn reconciliation_runs_at_start_and_on_each_tick() {
        let mut repo = MockTenantSubscriptionRepository::new();
        repo.expect_list_non_blocked()
            .times(3)
            .returning(|| Box::pin(async move { Ok(vec![]) }));
        let usecase = Arc::new(ReconcileSubscriptionsUseCase::new(Arc::new(repo)));

        let handle = tokio::spawn(run_reconciliation(
            Arc::clone(&usecase),
            Duration::from_secs(300),
        ));

        // Start, +300s, +600s.
        tokio::time::sleep(Duration::from_secs(601)).await;
        handle.abort();
        let _ = handle.await;
        // Dropping the last handle verifies the call count.
        drop(usecase);
    }

    #[tokio::test(start_paused = true)]
    async fn deletion_sweep_waits_one_period_before_first_run() {
        let mut repo = MockDeletionQueueRepository::new();
        repo.expect_list_due()
            .times(2)
            .returning(|_| Box::pin(async move { Ok(vec![]) }));
        let usecase = Arc::new(ProcessTenantDeletionsUseCase::new(Arc::new(repo), 0));

        let handle = tokio::spawn(run_deletions(Arc::clone(&usecase), Duration::from_secs(60)));

        // +60s, +120s.
        tokio::time::sleep(Duration::from_secs(150)).await;
        handle.abort();
        let _ = handle.await;
        drop(usecase);
    }
}
