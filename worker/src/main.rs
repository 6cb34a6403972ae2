use anyhow::Result;
use crates::{
    domain::value_objects::erasure::TENANT_ERASURE_STEPS,
    infra::db::{
        postgres::postgres_connection,
        repositories::{
            deletion_queue::DeletionQueuePostgres,
            tenant_subscriptions::TenantSubscriptionPostgres,
        },
    },
};
use std::{sync::Arc, time::Duration};
use tracing::{error, info};
use worker::{
    axum_http::{self, routers::internal_sweeps::SweepRouteState},
    background_worker::sweep_loop,
    config,
    usecases::{
        process_tenant_deletions::ProcessTenantDeletionsUseCase,
        reconcile_subscriptions::ReconcileSubscriptionsUseCase,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Worker exited with error: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    crates::observability::init_observability("worker")?;

    let dotenvy_env = Arc::new(config::config_loader::load()?);
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let db_pool_arc = Arc::new(postgres_pool);
    let sweeps = &dotenvy_env.sweeps;

    let subscription_repository =
        Arc::new(TenantSubscriptionPostgres::new(Arc::clone(&db_pool_arc)));
    let deletion_repository = Arc::new(DeletionQueuePostgres::new(
        Arc::clone(&db_pool_arc),
        TENANT_ERASURE_STEPS,
        Duration::from_secs(sweeps.erasure_statement_timeout_secs),
    ));

    let reconcile_usecase = Arc::new(ReconcileSubscriptionsUseCase::new(subscription_repository));
    let deletion_usecase = Arc::new(ProcessTenantDeletionsUseCase::new(
        deletion_repository,
        sweeps.delete_buffer_days,
    ));
    info!(
        delete_buffer_days = sweeps.delete_buffer_days,
        "Deletion sweep configured"
    );

    let reconciliation_loop = tokio::spawn(sweep_loop::run_reconciliation(
        Arc::clone(&reconcile_usecase),
        Duration::from_secs(sweeps.subscription_interval_secs),
    ));

    let deletion_loop = tokio::spawn(sweep_loop::run_deletions(
        Arc::clone(&deletion_usecase),
        Duration::from_secs(sweeps.deletion_interval_secs),
    ));

    let sweep_state = Arc::new(SweepRouteState {
        internal_token: dotenvy_env.internal_api.token.clone(),
        reconcile_usecase,
        deletion_usecase,
    });
    let server_config = Arc::clone(&dotenvy_env);
    let http_server =
        tokio::spawn(async move { axum_http::http_serve::start(server_config, sweep_state).await });

    tokio::select! {
        result = reconciliation_loop => result??,
        result = deletion_loop => result??,
        result = http_server => result??,
    };
    Ok(())
}
