// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public key validation endpoint.
//!
//! Always answers with `{valid, message}`, including on failure, so callers
//! never have to parse the generic error body.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const NO_KEY_MESSAGE: &str = "No API key provided";
const ERROR_MESSAGE: &str = "Error validating key";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/validate-key", post(validate_key))
}

#[derive(Deserialize)]
pub struct ValidateKeyRequest {
    #[serde(rename = "apiKey", default)]
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ValidateKeyResponse {
    pub valid: bool,
    pub message: String,
}

impl ValidateKeyResponse {
    fn invalid(message: &str) -> Self {
        Self {
            valid: false,
            message: message.to_string(),
        }
    }
}

async fn validate_key(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ValidateKeyRequest>, JsonRejection>,
) -> (StatusCode, Json<ValidateKeyResponse>) {
    // An unreadable body is treated the same as a missing key.
    let secret = body
        .ok()
        .and_then(|Json(body)| body.api_key)
        .unwrap_or_default();

    match state.api_key_service.validate(&secret).await {
        Ok(result) => (
            StatusCode::OK,
            Json(ValidateKeyResponse {
                valid: result.valid,
                message: result.reason.to_string(),
            }),
        ),
        Err(AppError::MissingInput(_)) => (
            StatusCode::BAD_REQUEST,
            Json(ValidateKeyResponse::invalid(NO_KEY_MESSAGE)),
        ),
        Err(e) => {
            tracing::error!(error = %e, "API key validation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ValidateKeyResponse::invalid(ERROR_MESSAGE)),
            )
        }
    }
}
