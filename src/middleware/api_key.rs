// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! `x-api-key` gate for routes consumed by key holders.
//!
//! Extraction only reads the header. Metering happens in [`PresentedApiKey::authorize`],
//! which handlers call once their own input checks have passed, so a
//! malformed request never costs the caller a use.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

use crate::error::AppError;
use crate::models::api_key::secret_fingerprint;
use crate::services::ApiKeyService;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Secret presented in the `x-api-key` header, not yet validated.
#[derive(Debug, Clone)]
pub struct PresentedApiKey(String);

impl PresentedApiKey {
    /// Validate and meter the key. Unknown keys are `AppError::Unauthorized`.
    pub async fn authorize(&self, keys: &ApiKeyService) -> Result<(), AppError> {
        if keys.validate(&self.0).await?.valid {
            return Ok(());
        }
        tracing::info!(
            fingerprint = %secret_fingerprint(&self.0),
            "Rejected request with unknown API key"
        );
        Err(AppError::Unauthorized)
    }
}

impl<S> FromRequestParts<S> for PresentedApiKey
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_api_key(&parts.headers).map(Self)
    }
}

fn extract_api_key(headers: &HeaderMap) -> Result<String, AppError> {
    let Some(value) = headers.get(API_KEY_HEADER) else {
        return Err(AppError::MissingInput(API_KEY_HEADER.to_string()));
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::BadRequest("Invalid x-api-key header encoding".to_string()))?;
    if value.trim().is_empty() {
        return Err(AppError::MissingInput(API_KEY_HEADER.to_string()));
    }
    Ok(value.to_string())
}
