// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A required field was absent or blank.
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("API key quota of {0} reached")]
    QuotaExceeded(u32),

    #[error("Identity provider error: {0}")]
    IdentityProvider(String),

    /// Transport or connection failure talking to the backing store.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code used in the JSON body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "unauthorized",
            AppError::InvalidToken => "invalid_token",
            AppError::NotFound(_) => "not_found",
            AppError::MissingInput(_) => "missing_input",
            AppError::BadRequest(_) => "bad_request",
            AppError::QuotaExceeded(_) => "quota_exceeded",
            AppError::IdentityProvider(_) => "identity_provider_error",
            AppError::StorageUnavailable(_) => "storage_unavailable",
            AppError::Internal(_) => "internal_error",
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, details) = match &self {
            AppError::Unauthorized | AppError::InvalidToken => (StatusCode::UNAUTHORIZED, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, Some(msg.clone())),
            AppError::MissingInput(field) => {
                (StatusCode::BAD_REQUEST, Some(format!("'{}' is required", field)))
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Some(msg.clone())),
            AppError::QuotaExceeded(quota) => (
                StatusCode::CONFLICT,
                Some(format!("At most {} API keys are allowed", quota)),
            ),
            AppError::IdentityProvider(msg) => {
                tracing::warn!(error = %msg, "Identity provider error");
                (StatusCode::BAD_GATEWAY, None)
            }
            AppError::StorageUnavailable(msg) => {
                tracing::error!(error = %msg, "Storage error");
                (StatusCode::SERVICE_UNAVAILABLE, None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, None)
            }
        };

        let body = ErrorResponse {
            error: self.code().to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
