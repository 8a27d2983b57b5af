// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store for local development and tests.
//!
//! Usage increments happen under the entry lock, so concurrent validations
//! of one key are never lost here.

use async_trait::async_trait;
use dashmap::DashMap;
use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, Ordering};
use subtle::ConstantTimeEq;

use crate::db::store::Store;
use crate::error::AppError;
use crate::models::{ApiKey, ApiKeyPatch, ApiKeyStats, NewApiKey, User};
use crate::services::identity::InternalId;

/// DashMap-backed implementation of [`Store`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    api_keys: DashMap<String, ApiKey>,
    unavailable: AtomicBool,
    reads_unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a storage outage: every call fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Simulate a partial outage: lookups fail while writes still succeed.
    pub fn set_reads_unavailable(&self, unavailable: bool) {
        self.reads_unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_readable(&self) -> Result<(), AppError> {
        self.check_available()?;
        if self.reads_unavailable.load(Ordering::SeqCst) {
            return Err(AppError::StorageUnavailable(
                "In-memory store reads marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::StorageUnavailable(
                "In-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of user rows (test helper).
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, id: &InternalId) -> Result<Option<User>, AppError> {
        self.check_readable()?;
        Ok(self.users.get(id.as_str()).map(|u| u.value().clone()))
    }

    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        self.check_available()?;
        self.users
            .entry(user.internal_id.clone())
            .and_modify(|existing| {
                let created_at = std::mem::take(&mut existing.created_at);
                *existing = User {
                    created_at,
                    ..user.clone()
                };
            })
            .or_insert_with(|| user.clone());
        Ok(())
    }

    async fn touch_last_login(&self, id: &InternalId, at: &str) -> Result<bool, AppError> {
        self.check_available()?;
        match self.users.get_mut(id.as_str()) {
            Some(mut user) => {
                user.last_login_at = at.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_api_key(&self, key: NewApiKey) -> Result<ApiKey, AppError> {
        self.check_available()?;
        let key = key.into_api_key(uuid::Uuid::new_v4().to_string());
        self.api_keys.insert(key.id.clone(), key.clone());
        Ok(key)
    }

    async fn get_api_key(&self, id: &str) -> Result<Option<ApiKey>, AppError> {
        self.check_readable()?;
        Ok(self.api_keys.get(id).map(|k| k.value().clone()))
    }

    async fn find_api_key_by_secret(&self, secret: &str) -> Result<Option<ApiKey>, AppError> {
        self.check_readable()?;
        let found = self
            .api_keys
            .iter()
            .find(|entry| bool::from(entry.secret_value.as_bytes().ct_eq(secret.as_bytes())))
            .map(|entry| entry.value().clone());
        Ok(found)
    }

    async fn list_api_keys(&self) -> Result<Vec<ApiKey>, AppError> {
        self.check_readable()?;
        let mut keys: Vec<ApiKey> = self.api_keys.iter().map(|e| e.value().clone()).collect();
        keys.sort_by_key(|k| Reverse((k.created_at.clone(), k.id.clone())));
        Ok(keys)
    }

    async fn update_api_key(
        &self,
        id: &str,
        patch: &ApiKeyPatch,
    ) -> Result<Option<ApiKey>, AppError> {
        self.check_available()?;
        Ok(self.api_keys.get_mut(id).map(|mut key| {
            patch.apply_to(&mut key);
            key.value().clone()
        }))
    }

    async fn increment_usage(&self, id: &str) -> Result<Option<u64>, AppError> {
        self.check_available()?;
        Ok(self.api_keys.get_mut(id).map(|mut key| {
            key.usage_count = key.usage_count.saturating_add(1);
            key.usage_count
        }))
    }

    async fn delete_api_key(&self, id: &str) -> Result<bool, AppError> {
        self.check_available()?;
        Ok(self.api_keys.remove(id).is_some())
    }

    async fn api_key_stats(&self) -> Result<ApiKeyStats, AppError> {
        self.check_readable()?;
        let keys: Vec<ApiKey> = self.api_keys.iter().map(|e| e.value().clone()).collect();
        Ok(ApiKeyStats::from_keys(&keys))
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check_available()
    }
}
