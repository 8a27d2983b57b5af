// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Keyvault API Server
//!
//! Google sign-in plus API key management and validation.

use keyvault_api::{
    config::{Config, StorageBackend},
    db::{FirestoreDb, MemoryStore, Store},
    services::GoogleIdTokenVerifier,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        identity_scheme = ?config.identity_scheme,
        storage_backend = ?config.storage_backend,
        api_key_quota = ?config.api_key_quota,
        "Starting Keyvault API"
    );

    let store: Arc<dyn Store> = match config.storage_backend {
        StorageBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let identity_provider = Arc::new(GoogleIdTokenVerifier::new(&config)?);

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), store, identity_provider));

    // Build router
    let app = keyvault_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("keyvault_api=debug".parse().expect("static directive"))
        .add_directive("info".parse().expect("static directive"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
