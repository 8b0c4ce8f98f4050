//! Error handling for the Flame Prophet backend
//!
//! Validation failures answer `{error, message}`, auth failures `{error}`,
//! and upstream or internal failures `{success: false, error}`.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::ForecastError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Request validation errors
    #[error("{error}: {message}")]
    BadRequest { error: String, message: String },

    #[error("{0}")]
    MissingFields(String),

    // Authentication errors
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    RateLimited(String),

    // Model errors
    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("Classification failed: {0}")]
    ClassificationFailed(String),

    // External service errors
    #[error("Weather provider error: {0}")]
    UpstreamProvider(String),

    #[error("Weather provider timed out: {0}")]
    UpstreamTimeout(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(error: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::BadRequest {
            error: error.into(),
            message: message.into(),
        }
    }
}

impl From<ForecastError> for AppError {
    fn from(e: ForecastError) -> Self {
        if e.is_input_error() {
            AppError::bad_request("Invalid input data", e.to_string())
        } else {
            AppError::Internal(e.to_string())
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::bad_request("Invalid input data", rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::bad_request("Invalid query parameters", rejection.body_text())
    }
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: None,
            error: error.into(),
            message: None,
        }
    }

    fn with_message(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::error(error)
        }
    }

    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: Some(false),
            ..Self::error(error)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::BadRequest { error, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_message(error.as_str(), message.as_str()),
            ),
            AppError::MissingFields(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::error(msg.as_str())),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ErrorResponse::error(msg.as_str())),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorResponse::error(msg.as_str())),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::error(msg.as_str())),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::error(msg.as_str())),
            AppError::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, ErrorResponse::error(msg.as_str())),
            AppError::ModelNotLoaded(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::with_message("Model not loaded", msg.as_str()),
            ),
            AppError::ClassificationFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::with_message("Classification failed", msg.as_str()),
            ),
            AppError::UpstreamProvider(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::failure(format!("Failed to fetch weather data: {}", msg)),
            ),
            AppError::UpstreamTimeout(msg) => (
                StatusCode::GATEWAY_TIMEOUT,
                ErrorResponse::failure(format!("Weather provider timed out: {}", msg)),
            ),
            AppError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorResponse::error(msg.as_str()))
            }
            AppError::Configuration(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::error(msg.as_str()))
            }
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::failure("A database error occurred"),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::failure(msg.as_str()),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::failure("An internal server error occurred"),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!(status = %status, "Request rejected: {}", self);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
