use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::Utc;
use crates::domain::repositories::{
    deletion_queue::DeletionQueueRepository, tenant_subscriptions::TenantSubscriptionRepository,
};
use tracing::{error, info};

use crate::usecases::{
    process_tenant_deletions::ProcessTenantDeletionsUseCase,
    reconcile_subscriptions::ReconcileSubscriptionsUseCase,
};

// Run example
//   curl -X POST "http://localhost:$SERVER_PORT_WORKER/internal/v1/subscriptions/reconcile" \
//     -H "Authorization: Bearer $INTERNAL_WORKER_TOKEN"

pub struct SweepRouteState<R, D>
where
    R: TenantSubscriptionRepository + Send + Sync + 'static,
    D: DeletionQueueRepository + Send + Sync + 'static,
{
    pub internal_token: Option<String>,
    pub reconcile_usecase: Arc<ReconcileSubscriptionsUseCase<R>>,
    pub deletion_usecase: Arc<ProcessTenantDeletionsUseCase<D>>,
}

pub fn routes<R, D>(state: Arc<SweepRouteState<R, D>>) -> Router
where
    R: TenantSubscriptionRepository + Send + Sync + 'static,
    D: DeletionQueueRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/subscriptions/reconcile", post(reconcile_subscriptions))
        .route("/tenants/deletions/run", post(run_tenant_deletions))
        .with_state(state)
}

pub async fn reconcile_subscriptions<R, D>(
    State(state): State<Arc<SweepRouteState<R, D>>>,
    headers: HeaderMap,
) -> Response
where
    R: TenantSubscriptionRepository + Send + Sync + 'static,
    D: DeletionQueueRepository + Send + Sync + 'static,
{
    if let Err(response) = authorize(&headers, state.internal_token.as_deref()) {
        return response;
    }

    info!("internal_sweeps: reconciliation triggered on demand");
    match state.reconcile_usecase.run(Utc::now()).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => {
            error!(error = ?err, "internal_sweeps: reconciliation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "reconciliation failed").into_response()
        }
    }
}

pub async fn run_tenant_deletions<R, D>(
    State(state): State<Arc<SweepRouteState<R, D>>>,
    headers: HeaderMap,
) -> Response
where
    R: TenantSubscriptionRepository + Send + Sync + 'static,
    D: DeletionQueueRepository + Send + Sync + 'static,
{
    if let Err(response) = authorize(&headers, state.internal_token.as_deref()) {
        return response;
    }

    info!("internal_sweeps: deletion sweep triggered on demand");
    match state.deletion_usecase.run(Utc::now()).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => {
            error!(error = ?err, "internal_sweeps: deletion sweep failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "deletion sweep failed").into_response()
        }
    }
}

fn authorize(headers: &HeaderMap, expected_token: Option<&str>) -> Result<(), Response> {
    let Some(expected_token) = expected_token else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "internal worker token is not configured",
        )
            .into_response());
    };

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if token == expected_token => Ok(()),
        _ => Err((StatusCode::UNAUTHORIZED, "unauthorized").into_response()),
    }
}
