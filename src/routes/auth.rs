// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google sign-in routes.

use axum::{
    extract::State,
    response::Redirect,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::services::google_oidc::OidcError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", post(sign_in))
        .route("/auth/logout", get(logout))
}

#[derive(Deserialize)]
pub struct SignInRequest {
    #[serde(default)]
    id_token: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SignInResponse {
    pub token: String,
    pub internal_id: String,
    pub first_login: bool,
    /// Set when the user record could not be read or written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Verify a Google ID token, reconcile the user, and start a session.
async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SignInRequest>,
) -> Result<(CookieJar, Json<SignInResponse>)> {
    if body.id_token.trim().is_empty() {
        return Err(AppError::MissingInput("id_token".to_string()));
    }

    let claims = state
        .identity_provider
        .verify(&body.id_token)
        .await
        .map_err(|e| match e {
            OidcError::Forbidden(reason) => {
                tracing::warn!(reason = %reason, "Rejected Google ID token");
                AppError::InvalidToken
            }
            OidcError::Transient(reason) => AppError::IdentityProvider(reason),
        })?;

    let outcome = state.user_service.reconcile_user(&claims).await;

    if let Some(warning) = outcome.warning() {
        tracing::warn!(
            internal_id = %outcome.internal_id(),
            warning = %warning,
            "Sign-in continuing with degraded user record"
        );
    }

    let token = create_jwt(
        outcome.internal_id(),
        &claims.email,
        &state.config.jwt_signing_key,
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .secure(!state.config.frontend_url.starts_with("http://localhost"))
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64));

    tracing::info!(
        internal_id = %outcome.internal_id(),
        first_login = outcome.is_first_login(),
        "User signed in"
    );

    Ok((
        jar.add(cookie),
        Json(SignInResponse {
            token,
            internal_id: outcome.internal_id().to_string(),
            first_login: outcome.is_first_login(),
            warning: outcome.warning().map(|w| w.to_string()),
        }),
    ))
}

/// Clear the session cookie and return to the app root.
async fn logout(jar: CookieJar) -> (CookieJar, Redirect) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Redirect::temporary("/"),
    )
}
