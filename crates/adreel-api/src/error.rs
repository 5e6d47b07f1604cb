//! API error types (spec.md §7 error taxonomy, HTTP projection).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use adreel_providers::ProviderError;
use adreel_queue::QueueError;
use adreel_storage::StorageError;
use adreel_store::StoreError;
use adreel_worker::WorkerError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("insufficient credits: balance {balance_cents}c, charge {charge_cents}c")]
    InsufficientCredits { balance_cents: i64, charge_cents: i64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limited")]
    RateLimited,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Store(StoreError::InsufficientCredits { .. }) => StatusCode::PAYMENT_REQUIRED,
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::AlreadyExists(_)) | ApiError::Store(StoreError::DuplicateJob(_)) => {
                StatusCode::CONFLICT
            }
            ApiError::Store(StoreError::AuthError(_)) | ApiError::Store(StoreError::PermissionDenied(_)) => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Store(StoreError::RateLimited(_)) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_)
            | ApiError::Store(_)
            | ApiError::Worker(_)
            | ApiError::Provider(_)
            | ApiError::Storage(_)
            | ApiError::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let code = match &self {
            ApiError::InsufficientCredits { .. } | ApiError::Store(StoreError::InsufficientCredits { .. }) => {
                Some("insufficient_credits".to_string())
            }
            _ => None,
        };

        // Internal failures never leak their cause to the caller in production.
        let detail = match &self {
            ApiError::Internal(_)
            | ApiError::Store(_)
            | ApiError::Worker(_)
            | ApiError::Provider(_)
            | ApiError::Storage(_)
            | ApiError::Queue(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "an internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { detail, code })).into_response()
    }
}
