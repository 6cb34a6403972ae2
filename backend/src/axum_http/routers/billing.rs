use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use crates::{
    domain::repositories::{
        plans::PlanRepository, subscription_events::SubscriptionEventRepository,
        tenant_subscriptions::TenantSubscriptionRepository,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            plans::PlanPostgres, subscription_events::SubscriptionEventPostgres,
            tenant_subscriptions::TenantSubscriptionPostgres,
        },
    },
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    auth::{
        AuthUser,
        guards::{require_owner, require_tenant_user},
    },
    axum_http::error_responses::AppError,
    usecases::billing::{BillingUseCase, RenewRequest},
};

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<i64>,
}

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let billing_usecase = BillingUseCase::new(
        Arc::new(TenantSubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PlanPostgres::new(Arc::clone(&db_pool))),
        Arc::new(SubscriptionEventPostgres::new(Arc::clone(&db_pool))),
    );

    router(Arc::new(billing_usecase))
}

pub fn router<S, P, E>(billing_usecase: Arc<BillingUseCase<S, P, E>>) -> Router
where
    S: TenantSubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    E: SubscriptionEventRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/current", get(current))
        .route("/plans", get(plans))
        .route("/events", get(events))
        .route("/renew", post(renew))
        .with_state(billing_usecase)
}

pub async fn current<S, P, E>(
    State(billing_usecase): State<Arc<BillingUseCase<S, P, E>>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    S: TenantSubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    E: SubscriptionEventRepository + Send + Sync + 'static,
{
    let tenant_id = require_tenant_user(&auth)?;
    let view = billing_usecase.current(tenant_id, Utc::now()).await?;

    Ok(Json(view))
}

pub async fn plans<S, P, E>(
    State(billing_usecase): State<Arc<BillingUseCase<S, P, E>>>,
    auth: AuthUser,
) -> Result<impl IntoResponse, AppError>
where
    S: TenantSubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    E: SubscriptionEventRepository + Send + Sync + 'static,
{
    require_tenant_user(&auth)?;
    let plans = billing_usecase.plans().await?;

    Ok(Json(plans))
}

pub async fn events<S, P, E>(
    State(billing_usecase): State<Arc<BillingUseCase<S, P, E>>>,
    auth: AuthUser,
    Query(query): Query<EventsQuery>,
) -> Result<impl IntoResponse, AppError>
where
    S: TenantSubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    E: SubscriptionEventRepository + Send + Sync + 'static,
{
    let tenant_id = require_tenant_user(&auth)?;
    let events = billing_usecase.events(tenant_id, query.limit).await?;

    Ok(Json(events))
}

pub async fn renew<S, P, E>(
    State(billing_usecase): State<Arc<BillingUseCase<S, P, E>>>,
    auth: AuthUser,
    Json(renew_request): Json<RenewRequest>,
) -> Result<impl IntoResponse, AppError>
where
    S: TenantSubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    E: SubscriptionEventRepository + Send + Sync + 'static,
{
    let tenant_id = require_owner(&auth)?;
    let outcome = billing_usecase
        .renew(tenant_id, auth.user_id, renew_request, Utc::now())
        .await?;

    Ok(Json(outcome))
}
