// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API key lifecycle and validation.
//!
//! `validate` is both the authorization check and the meter: every call that
//! finds a key increments its usage counter, with no deduplication.

use std::sync::Arc;

use crate::db::Store;
use crate::error::AppError;
use crate::models::api_key::secret_fingerprint;
use crate::models::{ApiKey, ApiKeyPatch, ApiKeyStats, KeyValidation, NewApiKey};
use crate::time_utils::now_rfc3339;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_SECRET_LEN: usize = 512;

/// Key lifecycle operations over an injected store.
#[derive(Clone)]
pub struct ApiKeyService {
    store: Arc<dyn Store>,
    quota: Option<u32>,
}

impl ApiKeyService {
    /// `quota` caps the number of live keys; `None` disables the check.
    pub fn new(store: Arc<dyn Store>, quota: Option<u32>) -> Self {
        Self { store, quota }
    }

    pub fn quota(&self) -> Option<u32> {
        self.quota
    }

    /// Check a presented secret and meter the use.
    ///
    /// Unknown secrets are `valid: false`, not an error. Storage failures are
    /// surfaced to the caller.
    pub async fn validate(&self, secret: &str) -> Result<KeyValidation, AppError> {
        if secret.trim().is_empty() {
            return Err(AppError::MissingInput("apiKey".to_string()));
        }

        let fingerprint = secret_fingerprint(secret);

        let Some(key) = self.store.find_api_key_by_secret(secret).await? else {
            tracing::info!(fingerprint = %fingerprint, "API key validation failed: not found");
            return Ok(KeyValidation::not_found());
        };

        // Deleted between lookup and increment: report it as gone.
        let Some(usage_count) = self.store.increment_usage(&key.id).await? else {
            tracing::info!(
                key_id = %key.id,
                "API key deleted during validation"
            );
            return Ok(KeyValidation::not_found());
        };

        tracing::info!(
            key_id = %key.id,
            fingerprint = %fingerprint,
            usage_count,
            "API key validated"
        );

        Ok(KeyValidation::valid())
    }

    /// Create a key with `usage_count = 0`.
    ///
    /// The secret is caller-supplied and not checked for uniqueness.
    pub async fn create(&self, name: &str, secret: &str) -> Result<ApiKey, AppError> {
        let name = require_field("name", name, MAX_NAME_LEN)?;
        let secret = require_field("value", secret, MAX_SECRET_LEN)?;

        if let Some(quota) = self.quota {
            let stats = self.store.api_key_stats().await?;
            if stats.count >= u64::from(quota) {
                tracing::warn!(count = stats.count, quota, "API key quota reached");
                return Err(AppError::QuotaExceeded(quota));
            }
        }

        let key = self
            .store
            .insert_api_key(NewApiKey {
                name: name.to_string(),
                secret_value: secret.to_string(),
                created_at: now_rfc3339(),
            })
            .await?;

        tracing::info!(
            key_id = %key.id,
            name = %key.name,
            fingerprint = %secret_fingerprint(&key.secret_value),
            "API key created"
        );

        Ok(key)
    }

    pub async fn list(&self) -> Result<Vec<ApiKey>, AppError> {
        self.store.list_api_keys().await
    }

    pub async fn get(&self, id: &str) -> Result<ApiKey, AppError> {
        self.store
            .get_api_key(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Partial update; fields absent from the patch are left as they are.
    pub async fn update(&self, id: &str, patch: ApiKeyPatch) -> Result<ApiKey, AppError> {
        let patch = ApiKeyPatch {
            name: patch
                .name
                .as_deref()
                .map(|n| require_field("name", n, MAX_NAME_LEN).map(str::to_string))
                .transpose()?,
            secret_value: patch
                .secret_value
                .as_deref()
                .map(|v| require_field("value", v, MAX_SECRET_LEN).map(str::to_string))
                .transpose()?,
        };

        if patch.is_empty() {
            return self.get(id).await;
        }

        let key = self
            .store
            .update_api_key(id, &patch)
            .await?
            .ok_or_else(|| not_found(id))?;

        tracing::info!(
            key_id = %key.id,
            renamed = patch.name.is_some(),
            rotated = patch.secret_value.is_some(),
            "API key updated"
        );

        Ok(key)
    }

    /// Remove a key. Its secret stops validating immediately.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        if !self.store.delete_api_key(id).await? {
            return Err(not_found(id));
        }
        tracing::info!(key_id = %id, "API key deleted");
        Ok(())
    }

    pub async fn stats(&self) -> Result<ApiKeyStats, AppError> {
        self.store.api_key_stats().await
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("API key {} not found", id))
}

/// Non-blank and within `max_len` bytes. The value is returned untouched:
/// secrets are matched byte for byte, so padding is part of the secret.
fn require_field<'a>(field: &str, value: &'a str, max_len: usize) -> Result<&'a str, AppError> {
    if value.trim().is_empty() {
        return Err(AppError::MissingInput(field.to_string()));
    }
    if value.len() > max_len {
        return Err(AppError::BadRequest(format!(
            "'{}' must be at most {} bytes",
            field, max_len
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn service_with_quota(quota: Option<u32>) -> (ApiKeyService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ApiKeyService::new(store.clone(), quota), store)
    }

    fn service() -> (ApiKeyService, Arc<MemoryStore>) {
        service_with_quota(None)
    }

    #[tokio::test]
    async fn test_create_then_validate_counts_usage() {
        let (keys, _) = service();
        let key = keys.create("default", "tvly-abc").await.unwrap();
        assert_eq!(key.usage_count, 0);

        let result = keys.validate("tvly-abc").await.unwrap();
        assert!(result.valid);
        assert_eq!(result.reason, KeyValidation::VALID_REASON);
        assert_eq!(keys.get(&key.id).await.unwrap().usage_count, 1);
    }

    #[tokio::test]
    async fn test_two_validations_count_twice() {
        let (keys, _) = service();
        let key = keys.create("default", "tvly-abc").await.unwrap();

        keys.validate("tvly-abc").await.unwrap();
        keys.validate("tvly-abc").await.unwrap();

        assert_eq!(keys.get(&key.id).await.unwrap().usage_count, 2);
    }

    #[tokio::test]
    async fn test_unknown_secret_is_invalid_not_error() {
        let (keys, _) = service();
        let result = keys.validate("tvly-unknown").await.unwrap();
        assert_eq!(result, KeyValidation::not_found());
    }

    #[tokio::test]
    async fn test_blank_secret_is_missing_input() {
        let (keys, _) = service();
        assert!(matches!(
            keys.validate("   ").await,
            Err(AppError::MissingInput(_))
        ));
    }

    #[tokio::test]
    async fn test_deleted_key_stops_validating() {
        let (keys, _) = service();
        let key = keys.create("default", "tvly-abc").await.unwrap();

        keys.delete(&key.id).await.unwrap();

        assert!(!keys.validate("tvly-abc").await.unwrap().valid);
        assert!(matches!(keys.get(&key.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            keys.update(
                &key.id,
                ApiKeyPatch {
                    name: Some("again".to_string()),
                    secret_value: None
                }
            )
            .await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(keys.delete(&key.id).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rotate_secret() {
        let (keys, _) = service();
        let key = keys.create("default", "tvly-old").await.unwrap();

        let updated = keys
            .update(
                &key.id,
                ApiKeyPatch {
                    name: None,
                    secret_value: Some("tvly-new".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "default");
        assert!(!keys.validate("tvly-old").await.unwrap().valid);
        assert!(keys.validate("tvly-new").await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_update_rejects_blank_fields() {
        let (keys, _) = service();
        let key = keys.create("default", "tvly-abc").await.unwrap();

        let result = keys
            .update(
                &key.id,
                ApiKeyPatch {
                    name: Some(" ".to_string()),
                    secret_value: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::MissingInput(_))));
    }

    #[tokio::test]
    async fn test_create_validates_input() {
        let (keys, _) = service();
        assert!(matches!(
            keys.create("", "tvly-abc").await,
            Err(AppError::MissingInput(f)) if f == "name"
        ));
        assert!(matches!(
            keys.create("default", "").await,
            Err(AppError::MissingInput(f)) if f == "value"
        ));
        assert!(matches!(
            keys.create(&"n".repeat(MAX_NAME_LEN + 1), "tvly-abc").await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_padded_secret_is_stored_and_matched_verbatim() {
        let (keys, _) = service();
        let key = keys.create("padded", " tvly-padded ").await.unwrap();
        assert_eq!(key.secret_value, " tvly-padded ");

        assert!(keys.validate(" tvly-padded ").await.unwrap().valid);
        assert!(!keys.validate("tvly-padded").await.unwrap().valid);
        assert_eq!(keys.get(&key.id).await.unwrap().usage_count, 1);

        let rotated = keys
            .update(
                &key.id,
                ApiKeyPatch {
                    name: None,
                    secret_value: Some("tvly-rotated\t".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(rotated.secret_value, "tvly-rotated\t");
        assert!(keys.validate("tvly-rotated\t").await.unwrap().valid);
    }

    #[tokio::test]
    async fn test_duplicate_secrets_are_allowed() {
        let (keys, _) = service();
        keys.create("one", "tvly-shared").await.unwrap();
        keys.create("two", "tvly-shared").await.unwrap();

        assert_eq!(keys.stats().await.unwrap().count, 2);
        assert!(keys.validate("tvly-shared").await.unwrap().valid);
        assert_eq!(keys.stats().await.unwrap().total_usage, 1);
    }

    #[tokio::test]
    async fn test_quota_enforced_on_create() {
        let (keys, _) = service_with_quota(Some(2));
        keys.create("one", "s1").await.unwrap();
        let second = keys.create("two", "s2").await.unwrap();

        assert!(matches!(
            keys.create("three", "s3").await,
            Err(AppError::QuotaExceeded(2))
        ));

        keys.delete(&second.id).await.unwrap();
        assert!(keys.create("three", "s3").await.is_ok());
    }

    #[tokio::test]
    async fn test_stats_track_live_keys() {
        let (keys, _) = service();
        let a = keys.create("a", "sa").await.unwrap();
        keys.create("b", "sb").await.unwrap();
        keys.create("c", "sc").await.unwrap();

        keys.validate("sa").await.unwrap();
        keys.validate("sb").await.unwrap();
        keys.validate("sb").await.unwrap();
        keys.delete(&a.id).await.unwrap();

        let stats = keys.stats().await.unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_usage, 2);
    }

    #[tokio::test]
    async fn test_storage_outage_surfaces_on_validate() {
        let (keys, store) = service();
        keys.create("default", "tvly-abc").await.unwrap();
        store.set_unavailable(true);

        assert!(matches!(
            keys.validate("tvly-abc").await,
            Err(AppError::StorageUnavailable(_))
        ));
    }
}
