//! Bearer-token authentication.
//!
//! The token only proves who the caller is. Tenant and role are re-read from
//! `users` on every request so a demoted or moved user loses access at once.

pub mod guards;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use crates::domain::{
    repositories::users::UserRepository, value_objects::enums::user_roles::UserRole,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::axum_http::error_responses::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub email: String,
    pub role: UserRole,
}

#[derive(Debug)]
pub struct AuthError(anyhow::Error);

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError(err)
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| anyhow::anyhow!("JWT validation failed: {}", e))?;

    Ok(token_data.claims)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub struct AuthState<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    pub jwt_secret: String,
    pub user_repo: Arc<U>,
}

impl<U> AuthState<U>
where
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(jwt_secret: String, user_repo: Arc<U>) -> Self {
        Self {
            jwt_secret,
            user_repo,
        }
    }

    async fn resolve(&self, headers: &HeaderMap) -> Result<AuthUser, AppError> {
        let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;

        let claims = validate_jwt(token, &self.jwt_secret).map_err(|err| {
            debug!(error = %err, "auth: rejected token");
            AppError::Unauthorized
        })?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;

        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let role = UserRole::from_str(&user.role).ok_or_else(|| {
            warn!(%user_id, role = %user.role, "auth: user has unknown role");
            AppError::Unauthorized
        })?;

        Ok(AuthUser {
            user_id: user.id,
            tenant_id: user.tenant_id,
            email: user.email,
            role,
        })
    }
}

/// Middleware: resolves the caller and stores `AuthUser` in request extensions.
pub async fn authenticate<U>(
    State(state): State<Arc<AuthState<U>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    U: UserRepository + Send + Sync + 'static,
{
    let auth_user = state.resolve(request.headers()).await?;
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
