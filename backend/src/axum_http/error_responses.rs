use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::usecases::{admin_subscriptions::AdminSubscriptionError, billing::BillingError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let AppError::Internal(err) = &self {
            // Detail stays in the logs only.
            error!(status = status.as_u16(), error = ?err, "request failed");
        }

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::SubscriptionNotFound | BillingError::PlanNotFound => {
                AppError::NotFound(err.to_string())
            }
            BillingError::InvalidCurrency => AppError::BadRequest(err.to_string()),
            BillingError::Internal(err) => AppError::Internal(err),
        }
    }
}

impl From<AdminSubscriptionError> for AppError {
    fn from(err: AdminSubscriptionError) -> Self {
        match err {
            AdminSubscriptionError::InvalidStatus(_) => AppError::BadRequest(err.to_string()),
            AdminSubscriptionError::SubscriptionNotFound => AppError::NotFound(err.to_string()),
            AdminSubscriptionError::Internal(err) => AppError::Internal(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_detail() {
        let response =
            AppError::Internal(anyhow::anyhow!("password authentication failed")).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["code"], 500);
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn use_case_errors_keep_their_status() {
        assert_eq!(
            AppError::from(BillingError::InvalidCurrency).status_code(),
            BillingError::InvalidCurrency.status_code()
        );
        assert_eq!(
            AppError::from(BillingError::PlanNotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(AdminSubscriptionError::InvalidStatus("x".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
