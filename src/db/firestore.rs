// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage, keyed by internal id)
//! - API keys (secret, name, usage counter)

use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreWritePrecondition;
use serde::Serialize;

use crate::db::collections;
use crate::db::store::Store;
use crate::error::AppError;
use crate::models::{ApiKey, ApiKeyPatch, ApiKeyStats, NewApiKey, User};
use crate::services::identity::InternalId;

/// Document id used by the connectivity ping. Never written.
const PING_DOCUMENT_ID: &str = "__ping__";

/// Mutable key fields for a masked update. Absent fields are neither sent
/// nor named in the mask.
#[derive(Serialize, serde::Deserialize)]
struct ApiKeyFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_value: Option<String>,
}

impl ApiKeyFields {
    fn from_patch(patch: &ApiKeyPatch) -> Self {
        Self {
            name: patch.name.clone(),
            secret_value: patch.secret_value.clone(),
        }
    }

    fn mask(&self) -> Vec<String> {
        let mut mask = Vec::with_capacity(2);
        if self.name.is_some() {
            mask.push(firestore::path!(ApiKey::name));
        }
        if self.secret_value.is_some() {
            mask.push(firestore::path!(ApiKey::secret_value));
        }
        mask
    }
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id).await.map_err(|e| {
            AppError::StorageUnavailable(format!("Failed to connect to Firestore: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::StorageUnavailable(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client for testing.
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client.as_ref().ok_or_else(|| {
            AppError::StorageUnavailable("Database not connected (offline mode)".to_string())
        })
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn get_user(&self, id: &InternalId) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id.as_str())
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))
    }

    /// Create-only insert; if the row already exists, only the profile and
    /// login fields are rewritten so the original `created_at` survives.
    async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let client = self.get_client()?;

        let inserted: Result<User, FirestoreError> = client
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.internal_id)
            .object(user)
            .execute()
            .await;

        match inserted {
            Ok(_) => return Ok(()),
            Err(FirestoreError::DataConflictError(_)) => {}
            Err(e) => return Err(AppError::StorageUnavailable(e.to_string())),
        }

        let _: User = client
            .fluent()
            .update()
            .fields(firestore::paths!(User::{email, display_name, avatar_url, last_login_at}))
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(&user.internal_id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;
        Ok(())
    }

    async fn touch_last_login(&self, id: &InternalId, at: &str) -> Result<bool, AppError> {
        #[derive(Serialize, serde::Deserialize)]
        struct LastLogin {
            last_login_at: String,
        }

        let result: Result<User, FirestoreError> = self
            .get_client()?
            .fluent()
            .update()
            .fields(firestore::paths!(User::{last_login_at}))
            .in_col(collections::USERS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(id.as_str())
            .object(&LastLogin { last_login_at: at.to_string() })
            .execute()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(FirestoreError::DataNotFoundError(_)) => Ok(false),
            Err(e) => Err(AppError::StorageUnavailable(e.to_string())),
        }
    }

    // ─── API Key Operations ──────────────────────────────────────

    async fn insert_api_key(&self, key: NewApiKey) -> Result<ApiKey, AppError> {
        let key = key.into_api_key(uuid::Uuid::new_v4().to_string());
        self.get_client()?
            .fluent()
            .insert()
            .into(collections::API_KEYS)
            .document_id(&key.id)
            .object(&key)
            .execute()
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))
    }

    async fn get_api_key(&self, id: &str) -> Result<Option<ApiKey>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::API_KEYS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))
    }

    async fn find_api_key_by_secret(&self, secret: &str) -> Result<Option<ApiKey>, AppError> {
        let secret = secret.to_string();
        let matches: Vec<ApiKey> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::API_KEYS)
            .filter(move |q| q.field("secret_value").eq(secret.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;

        Ok(matches.into_iter().next())
    }

    async fn list_api_keys(&self) -> Result<Vec<ApiKey>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::API_KEYS)
            .order_by([("created_at", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))
    }

    /// Masked update guarded by an existence precondition, so a key deleted
    /// concurrently is reported absent instead of being recreated.
    async fn update_api_key(
        &self,
        id: &str,
        patch: &ApiKeyPatch,
    ) -> Result<Option<ApiKey>, AppError> {
        let fields = ApiKeyFields::from_patch(patch);
        let mask = fields.mask();
        if mask.is_empty() {
            return self.get_api_key(id).await;
        }

        let result: Result<ApiKey, FirestoreError> = self
            .get_client()?
            .fluent()
            .update()
            .fields(mask)
            .in_col(collections::API_KEYS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(id)
            .object(&fields)
            .execute()
            .await;

        match result {
            Ok(key) => Ok(Some(key)),
            Err(FirestoreError::DataNotFoundError(_)) => Ok(None),
            Err(e) => Err(AppError::StorageUnavailable(e.to_string())),
        }
    }

    /// Server-side `increment` transform committed in a transaction.
    ///
    /// Concurrent increments are applied by Firestore in sequence, so none
    /// are lost. The existence precondition keeps a deleted key deleted.
    async fn increment_usage(&self, id: &str) -> Result<Option<u64>, AppError> {
        let client = self.get_client()?;

        let mut transaction = client.begin_transaction().await.map_err(|e| {
            AppError::StorageUnavailable(format!("Failed to begin transaction: {}", e))
        })?;

        client
            .fluent()
            .update()
            .in_col(collections::API_KEYS)
            .precondition(FirestoreWritePrecondition::Exists(true))
            .document_id(id)
            .transforms(|t| {
                t.fields([t
                    .field(firestore::path!(ApiKey::usage_count))
                    .increment(1u64)])
            })
            .only_transform()
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::StorageUnavailable(format!(
                    "Failed to add usage increment to transaction: {}",
                    e
                ))
            })?;

        match transaction.commit().await {
            Ok(_) => {}
            Err(FirestoreError::DataNotFoundError(_)) => return Ok(None),
            Err(e) => {
                return Err(AppError::StorageUnavailable(format!(
                    "Transaction commit failed: {}",
                    e
                )))
            }
        }

        // A delete landing after the commit also reads back as absent.
        Ok(self.get_api_key(id).await?.map(|key| key.usage_count))
    }

    async fn delete_api_key(&self, id: &str) -> Result<bool, AppError> {
        if self.get_api_key(id).await?.is_none() {
            return Ok(false);
        }

        self.get_client()?
            .fluent()
            .delete()
            .from(collections::API_KEYS)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;
        Ok(true)
    }

    async fn api_key_stats(&self) -> Result<ApiKeyStats, AppError> {
        let keys: Vec<ApiKey> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::API_KEYS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;

        Ok(ApiKeyStats::from_keys(&keys))
    }

    async fn ping(&self) -> Result<(), AppError> {
        let _: Option<User> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(PING_DOCUMENT_ID)
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;
        Ok(())
    }
}
