//! Per-request subscription gate.
//!
//! Runs after authentication. The tenant's status is recomputed from its
//! billing period on every request; the stored status is never trusted here.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use crates::domain::{
    repositories::tenant_subscriptions::TenantSubscriptionRepository,
    value_objects::{
        access_policy::{self, AccessDecision},
        enums::subscription_statuses::SubscriptionStatus,
        status_clock,
    },
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::auth::AuthUser;

/// Status computed by the gate, available to downstream handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveSubscriptionStatus(pub SubscriptionStatus);

pub struct SubscriptionGate<R>
where
    R: TenantSubscriptionRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<R>,
}

impl<R> SubscriptionGate<R>
where
    R: TenantSubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<R>) -> Self {
        Self { subscription_repo }
    }
}

fn lookup_failed() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Failed to check subscription status" })),
    )
        .into_response()
}

pub async fn enforce_subscription<R>(
    State(gate): State<Arc<SubscriptionGate<R>>>,
    mut request: Request,
    next: Next,
) -> Response
where
    R: TenantSubscriptionRepository + Send + Sync + 'static,
{
    let path = request.uri().path().to_string();
    if access_policy::is_exempt_path(&path) {
        return next.run(request).await;
    }

    let Some(tenant_id) = request
        .extensions()
        .get::<AuthUser>()
        .and_then(|user| user.tenant_id)
    else {
        return next.run(request).await;
    };

    let record = match gate.subscription_repo.find_by_tenant_id(tenant_id).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            warn!(%tenant_id, "subscription_gate: tenant has no subscription");
            return lookup_failed();
        }
        Err(err) => {
            error!(%tenant_id, db_error = ?err, "subscription_gate: subscription lookup failed");
            return lookup_failed();
        }
    };

    let status = status_clock::compute_status(&record, Utc::now());
    let method = request.method().as_str().to_string();

    match access_policy::evaluate(status, &method, &path) {
        AccessDecision::Allow => {
            request
                .extensions_mut()
                .insert(EffectiveSubscriptionStatus(status));
            next.run(request).await
        }
        AccessDecision::Deny(denial) => {
            debug!(%tenant_id, %status, %method, %path, code = denial.code, "subscription_gate: denied");
            (StatusCode::FORBIDDEN, Json(denial)).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Extension, Router,
        body::Body,
        http::Method,
        middleware,
        routing::{get, post},
    };
    use chrono::Duration;
    use crates::domain::{
        repositories::tenant_subscriptions::MockTenantSubscriptionRepository,
        value_objects::{enums::user_roles::UserRole, subscriptions::SubscriptionRecord},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn record_overdue_by(tenant_id: Uuid, days: i64) -> SubscriptionRecord {
        let period_end = Utc::now() - Duration::days(days);
        SubscriptionRecord {
            tenant_id,
            plan_id: Uuid::new_v4(),
            currency: "USD".to_string(),
            // Stale on purpose: the gate must ignore it.
            status: SubscriptionStatus::Active,
            current_period_start: period_end - Duration::days(30),
            current_period_end: period_end,
            blocked_at: None,
            late_fee_minor: 0,
            last_status_change_at: None,
        }
    }

    fn app(repo: MockTenantSubscriptionRepository, tenant_id: Option<Uuid>) -> Router {
        let gate = Arc::new(SubscriptionGate::new(Arc::new(repo)));
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            tenant_id,
            email: "owner@example.com".to_string(),
            role: UserRole::Owner,
        };

        Router::new()
            .route("/api/v1/products", get(|| async { "list" }).post(|| async { "created" }))
            .route("/api/v1/billing/current", get(|| async { "billing" }))
            .route("/api/v1/billing/renew", post(|| async { "renewed" }))
            .route("/api/v1/export/sales", get(|| async { "export" }))
            .route("/api/v1/admin/tenants", post(|| async { "admin" }))
            .layer(middleware::from_fn_with_state(
                gate,
                enforce_subscription::<MockTenantSubscriptionRepository>,
            ))
            .layer(Extension(user))
    }

    fn repo_returning(record: Option<SubscriptionRecord>) -> MockTenantSubscriptionRepository {
        let mut repo = MockTenantSubscriptionRepository::new();
        repo.expect_find_by_tenant_id().returning(move |_| {
            let record = record.clone();
            Box::pin(async move { Ok(record) })
        });
        repo
    }

    async fn call(app: Router, method: Method, uri: &str) -> Response {
        app.oneshot(
            axum::http::Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn active_tenant_may_write() {
        let tenant_id = Uuid::new_v4();
        let app = app(repo_returning(Some(record_overdue_by(tenant_id, -5))), Some(tenant_id));

        let response = call(app, Method::POST, "/api/v1/products").await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn read_only_tenant_cannot_write_outside_billing() {
        let tenant_id = Uuid::new_v4();
        let record = record_overdue_by(tenant_id, 16);

        let denied = call(
            app(repo_returning(Some(record.clone())), Some(tenant_id)),
            Method::POST,
            "/api/v1/products",
        )
        .await;
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
        let body = body_json(denied).await;
        assert_eq!(body["code"], "SUBSCRIPTION_READ_ONLY");
        assert_eq!(body["status"], "read_only");

        let read = call(
            app(repo_returning(Some(record.clone())), Some(tenant_id)),
            Method::GET,
            "/api/v1/products",
        )
        .await;
        assert_eq!(read.status(), StatusCode::OK);

        let renew = call(
            app(repo_returning(Some(record)), Some(tenant_id)),
            Method::POST,
            "/api/v1/billing/renew",
        )
        .await;
        assert_eq!(renew.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn blocked_tenant_keeps_only_billing_and_export() {
        let tenant_id = Uuid::new_v4();
        let record = record_overdue_by(tenant_id, 30);

        for (method, uri, expected) in [
            (Method::GET, "/api/v1/products", StatusCode::FORBIDDEN),
            (Method::GET, "/api/v1/billing/current", StatusCode::OK),
            (Method::POST, "/api/v1/billing/renew", StatusCode::OK),
            (Method::GET, "/api/v1/export/sales", StatusCode::OK),
        ] {
            let response = call(
                app(repo_returning(Some(record.clone())), Some(tenant_id)),
                method,
                uri,
            )
            .await;
            assert_eq!(response.status(), expected, "{uri}");
        }
    }

    #[tokio::test]
    async fn exempt_paths_and_tenantless_requests_skip_lookup() {
        let mut repo = MockTenantSubscriptionRepository::new();
        repo.expect_find_by_tenant_id().never();
        let response = call(app(repo, Some(Uuid::new_v4())), Method::POST, "/api/v1/admin/tenants").await;
        assert_eq!(response.status(), StatusCode::OK);

        let mut repo = MockTenantSubscriptionRepository::new();
        repo.expect_find_by_tenant_id().never();
        let response = call(app(repo, None), Method::POST, "/api/v1/products").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn lookup_failure_is_a_server_error() {
        let mut repo = MockTenantSubscriptionRepository::new();
        repo.expect_find_by_tenant_id()
            .returning(|_| Box::pin(async move { Err(anyhow::anyhow!("pool timed out")) }));

        let response = call(app(repo, Some(Uuid::new_v4())), Method::GET, "/api/v1/products").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
