// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ApiKey, ApiKeyPatch};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/keys", get(list_keys).post(create_key))
        .route("/api/keys/stats", get(key_stats))
        .route(
            "/api/keys/{id}",
            get(get_key).patch(update_key).delete(delete_key),
        )
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub internal_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
    pub last_login_at: String,
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state
        .user_service
        .get_user(&user.internal_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.internal_id)))?;

    Ok(Json(UserResponse {
        internal_id: profile.internal_id,
        email: profile.email,
        display_name: profile.display_name,
        avatar_url: profile.avatar_url,
        created_at: profile.created_at,
        last_login_at: profile.last_login_at,
    }))
}

// ─── API Keys ────────────────────────────────────────────────

/// API key as returned to the dashboard.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ApiKeyResponse {
    pub id: String,
    pub name: String,
    pub value: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub usage_count: u64,
    pub created_at: String,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        Self {
            id: key.id,
            name: key.name,
            value: key.secret_value,
            usage_count: key.usage_count,
            created_at: key.created_at,
        }
    }
}

#[derive(Deserialize)]
pub struct CreateKeyRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
pub struct UpdateKeyRequest {
    name: Option<String>,
    value: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct KeyStatsResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub count: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_usage: u64,
    /// `None` when no quota is configured.
    pub quota: Option<u32>,
}

async fn list_keys(State(state): State<Arc<AppState>>) -> Result<Json<Vec<ApiKeyResponse>>> {
    let keys = state.api_key_service.list().await?;
    Ok(Json(keys.into_iter().map(ApiKeyResponse::from).collect()))
}

async fn create_key(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateKeyRequest>,
) -> Result<(StatusCode, Json<ApiKeyResponse>)> {
    let key = state.api_key_service.create(&body.name, &body.value).await?;

    tracing::info!(
        internal_id = %user.internal_id,
        key_id = %key.id,
        "API key created via dashboard"
    );

    Ok((StatusCode::CREATED, Json(key.into())))
}

async fn get_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiKeyResponse>> {
    Ok(Json(state.api_key_service.get(&id).await?.into()))
}

async fn update_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateKeyRequest>,
) -> Result<Json<ApiKeyResponse>> {
    let patch = ApiKeyPatch {
        name: body.name,
        secret_value: body.value,
    };
    Ok(Json(state.api_key_service.update(&id, patch).await?.into()))
}

async fn delete_key(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.api_key_service.delete(&id).await?;
    tracing::info!(internal_id = %user.internal_id, key_id = %id, "API key deleted via dashboard");
    Ok(StatusCode::NO_CONTENT)
}

async fn key_stats(State(state): State<Arc<AppState>>) -> Result<Json<KeyStatsResponse>> {
    let stats = state.api_key_service.stats().await?;
    Ok(Json(KeyStatsResponse {
        count: stats.count,
        total_usage: stats.total_usage,
        quota: state.api_key_service.quota(),
    }))
}
