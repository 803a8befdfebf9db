//! Error types for learnsmart-api
//!
//! Every failure leaves the service as `{"success": false, "message", "code"}`
//! with a matching status. Internal details are logged, never echoed.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::services::openai_client::LlmError;
use crate::services::recommender::RecommendationError;
use crate::services::roadmap::RoadmapError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or rejected credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Conflict (409), e.g. duplicate enrollment
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Optional dependency not configured (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Content generation failed (500); the message is shown to the client
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Internal server error (500); the detail is logged only
    #[error("Internal server error: {0}")]
    Internal(String),

    /// learnsmart-common error
    #[error("Common error: {0}")]
    Common(#[from] learnsmart_common::Error),
}

impl ApiError {
    /// Internal error whose client message is fixed
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        ApiError::Internal(detail.to_string())
    }

    fn parts(self) -> (StatusCode, &'static str, String) {
        use learnsmart_common::Error as Common;

        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg)
            }
            ApiError::Generation(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "GENERATION_FAILED", msg)
            }
            ApiError::Internal(detail) => {
                error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
            ApiError::Common(err) if err.is_unique_violation() => {
                let msg = match err {
                    Common::Conflict(msg) => msg,
                    _ => "Resource already exists".to_string(),
                };
                (StatusCode::CONFLICT, "CONFLICT", msg)
            }
            ApiError::Common(Common::NotFound(msg)) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Common(Common::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(Common::Auth(msg)) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
            }
            ApiError::Common(err) => {
                error!("Internal error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "success": false,
            "message": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Common(learnsmart_common::Error::Database(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<LlmError> for ApiError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::NotConfigured => {
                ApiError::ServiceUnavailable("AI features are not configured".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<RecommendationError> for ApiError {
    fn from(err: RecommendationError) -> Self {
        match err {
            RecommendationError::Llm(llm) => llm.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<RoadmapError> for ApiError {
    fn from(err: RoadmapError) -> Self {
        match err {
            RoadmapError::Llm(LlmError::NotConfigured) => LlmError::NotConfigured.into(),
            other => {
                error!("Roadmap generation failed: {:?}", other);
                ApiError::Generation(other.to_string())
            }
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
