use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use crates::{
    domain::repositories::{
        plans::PlanRepository, tenant_subscriptions::TenantSubscriptionRepository,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{plans::PlanPostgres, tenant_subscriptions::TenantSubscriptionPostgres},
    },
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    auth::{AuthUser, guards::require_platform_admin},
    axum_http::error_responses::AppError,
    usecases::admin_subscriptions::{AdminSubscriptionUseCase, SetStatusRequest},
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let admin_usecase = AdminSubscriptionUseCase::new(
        Arc::new(TenantSubscriptionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(PlanPostgres::new(Arc::clone(&db_pool))),
    );

    router(Arc::new(admin_usecase))
}

pub fn router<S, P>(admin_usecase: Arc<AdminSubscriptionUseCase<S, P>>) -> Router
where
    S: TenantSubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/tenants/:tenant_id/subscription", get(subscription))
        .route("/tenants/:tenant_id/subscription/status", post(set_status))
        .with_state(admin_usecase)
}

pub async fn subscription<S, P>(
    State(admin_usecase): State<Arc<AdminSubscriptionUseCase<S, P>>>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError>
where
    S: TenantSubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    require_platform_admin(&auth)?;
    let view = admin_usecase.subscription(tenant_id, Utc::now()).await?;

    Ok(Json(view))
}

pub async fn set_status<S, P>(
    State(admin_usecase): State<Arc<AdminSubscriptionUseCase<S, P>>>,
    auth: AuthUser,
    Path(tenant_id): Path<Uuid>,
    Json(set_status_request): Json<SetStatusRequest>,
) -> Result<impl IntoResponse, AppError>
where
    S: TenantSubscriptionRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
{
    require_platform_admin(&auth)?;
    let response = admin_usecase
        .set_status(tenant_id, auth.user_id, set_status_request, Utc::now())
        .await?;

    Ok(Json(response))
}
