use crate::{
    auth::{AuthState, authenticate},
    axum_http::{
        default_routers,
        middleware::subscription_enforcement::{SubscriptionGate, enforce_subscription},
        routers,
    },
    config::config_model::DotEnvyConfig,
};
use anyhow::Result;
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::get,
};
use crates::infra::db::{
    postgres::postgres_connection::PgPoolSquad,
    repositories::{tenant_subscriptions::TenantSubscriptionPostgres, users::UserPostgres},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let auth_state = Arc::new(AuthState::new(
        config.auth.jwt_secret.clone(),
        Arc::new(UserPostgres::new(Arc::clone(&db_pool))),
    ));
    let subscription_gate = Arc::new(SubscriptionGate::new(Arc::new(
        TenantSubscriptionPostgres::new(Arc::clone(&db_pool)),
    )));

    // Layers run bottom-up: authentication first, then the subscription gate.
    let protected = Router::new()
        .nest("/api/v1/billing", routers::billing::routes(Arc::clone(&db_pool)))
        .nest(
            "/api/v1/admin",
            routers::admin_subscriptions::routes(Arc::clone(&db_pool)),
        )
        .route_layer(middleware::from_fn_with_state(
            subscription_gate,
            enforce_subscription::<TenantSubscriptionPostgres>,
        ))
        .route_layer(middleware::from_fn_with_state(
            auth_state,
            authenticate::<UserPostgres>,
        ));

    let app = Router::new()
        .merge(protected)
        .route("/api/v1/health-check", get(default_routers::health_check))
        .fallback(default_routers::not_found)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::PUT,
                    Method::DELETE,
                ])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!("Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install CTRL+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
