// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Keyvault: API key management backend.
//!
//! Maps Google sign-in identities onto stable internal user ids and manages
//! the lifecycle of API keys, including the public validate-and-meter
//! endpoint.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Store;
use services::{ApiKeyService, IdentityProvider, UserService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub user_service: UserService,
    pub api_key_service: ApiKeyService,
}

impl AppState {
    /// Wire services over one store using the settings in `config`.
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        identity_provider: Arc<dyn IdentityProvider>,
    ) -> Self {
        let user_service = UserService::new(store.clone(), config.identity_scheme);
        let api_key_service = ApiKeyService::new(store.clone(), config.api_key_quota);
        Self {
            config,
            store,
            identity_provider,
            user_service,
            api_key_service,
        }
    }
}
