// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use keyvault_api::config::Config;
use keyvault_api::db::{FirestoreDb, MemoryStore};
use keyvault_api::middleware::auth::create_jwt;
use keyvault_api::models::IdentityClaims;
use keyvault_api::routes::create_router;
use keyvault_api::services::{IdentityProvider, InternalId, OidcError};
use keyvault_api::AppState;
use std::sync::Arc;

/// Internal id used for dashboard requests in route tests.
#[allow(dead_code)]
pub const TEST_INTERNAL_ID: &str = "3f2504e0-4f89-41d3-9a0c-0305e82c3301";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Identity provider that accepts tokens of the form `good:<subject>`.
///
/// `transient` makes every call fail as if Google were unreachable.
#[allow(dead_code)]
#[derive(Default)]
pub struct StaticIdentityProvider {
    pub transient: bool,
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify(&self, token: &str) -> Result<IdentityClaims, OidcError> {
        if self.transient {
            return Err(OidcError::Transient("JWKS fetch timed out".to_string()));
        }
        let subject = token
            .strip_prefix("good:")
            .ok_or_else(|| OidcError::Forbidden("unrecognized token".to_string()))?;
        Ok(IdentityClaims {
            external_subject_id: subject.to_string(),
            email: format!("{subject}@example.com"),
            display_name: Some("Test User".to_string()),
            avatar_url: None,
        })
    }
}

/// Create a test app over an in-memory store.
/// Returns the router, the shared state and the store (for outage simulation).
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, Arc<MemoryStore>) {
    create_test_app_with(Config::test_default(), StaticIdentityProvider::default())
}

#[allow(dead_code)]
pub fn create_test_app_with(
    config: Config,
    provider: StaticIdentityProvider,
) -> (axum::Router, Arc<AppState>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState::new(config, store.clone(), Arc::new(provider)));
    (create_router(state.clone()), state, store)
}

/// Session token for [`TEST_INTERNAL_ID`].
#[allow(dead_code)]
pub fn create_test_jwt(signing_key: &[u8]) -> String {
    let id = InternalId::parse(TEST_INTERNAL_ID).unwrap();
    create_jwt(&id, "test@example.com", signing_key).unwrap()
}

/// Build a JSON request with an optional bearer token.
#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a bodiless request with an optional bearer token.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// Collect a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
