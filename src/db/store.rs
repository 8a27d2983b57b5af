// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage capability shared by identity reconciliation and the key lifecycle.
//!
//! Every method is a single request/response round trip. Absence is reported
//! as `None`/`false`; `Err` always means the store itself could not answer
//! (`AppError::StorageUnavailable`).

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{ApiKey, ApiKeyPatch, ApiKeyStats, NewApiKey, User};
use crate::services::identity::InternalId;

#[async_trait]
pub trait Store: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    /// Point lookup by internal id.
    async fn get_user(&self, id: &InternalId) -> Result<Option<User>, AppError>;

    /// Insert keyed by `user.internal_id`, or refresh an existing row's
    /// profile and `last_login_at`. An existing `created_at` is never
    /// overwritten.
    ///
    /// Concurrent first sign-ins for one identity converge on a single row.
    async fn upsert_user(&self, user: &User) -> Result<(), AppError>;

    /// Set `last_login_at` on an existing user. Returns `false` if absent.
    async fn touch_last_login(&self, id: &InternalId, at: &str) -> Result<bool, AppError>;

    // ─── API Keys ────────────────────────────────────────────────

    /// Insert a new key with `usage_count = 0`; the store assigns the id.
    async fn insert_api_key(&self, key: NewApiKey) -> Result<ApiKey, AppError>;

    async fn get_api_key(&self, id: &str) -> Result<Option<ApiKey>, AppError>;

    /// Exact match on the secret. Secrets are not unique; any match may be returned.
    async fn find_api_key_by_secret(&self, secret: &str) -> Result<Option<ApiKey>, AppError>;

    /// All keys, newest first.
    async fn list_api_keys(&self) -> Result<Vec<ApiKey>, AppError>;

    /// Apply a partial update. Returns the updated row, or `None` if absent.
    async fn update_api_key(
        &self,
        id: &str,
        patch: &ApiKeyPatch,
    ) -> Result<Option<ApiKey>, AppError>;

    /// Add one to `usage_count`. Returns the new count, or `None` if absent.
    ///
    /// Atomic: concurrent increments are never lost, and a key deleted
    /// concurrently is not recreated.
    async fn increment_usage(&self, id: &str) -> Result<Option<u64>, AppError>;

    /// Remove a key. Returns `false` if it did not exist.
    async fn delete_api_key(&self, id: &str) -> Result<bool, AppError>;

    /// Count and usage sum over all keys.
    async fn api_key_stats(&self) -> Result<ApiKeyStats, AppError>;

    // ─── Health ──────────────────────────────────────────────────

    /// Cheap connectivity check.
    async fn ping(&self) -> Result<(), AppError>;
}
