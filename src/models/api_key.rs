// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API key records and the value types around them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Number of hex characters of the SHA-256 digest kept in log fingerprints.
const FINGERPRINT_LEN: usize = 12;

/// API key stored in Firestore.
///
/// Stored at: `api_keys/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    /// Store-assigned identifier (also the document ID)
    pub id: String,
    /// Human-readable label
    pub name: String,
    /// The secret presented by clients. Caller-supplied, not unique.
    pub secret_value: String,
    /// Number of successful validations
    #[serde(default)]
    pub usage_count: u64,
    /// Creation timestamp (RFC3339)
    pub created_at: String,
}

/// Fields supplied when creating a key; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewApiKey {
    pub name: String,
    pub secret_value: String,
    pub created_at: String,
}

impl NewApiKey {
    /// Materialize the stored row under a store-assigned id.
    pub fn into_api_key(self, id: String) -> ApiKey {
        ApiKey {
            id,
            name: self.name,
            secret_value: self.secret_value,
            usage_count: 0,
            created_at: self.created_at,
        }
    }
}

/// Partial update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiKeyPatch {
    pub name: Option<String>,
    pub secret_value: Option<String>,
}

impl ApiKeyPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.secret_value.is_none()
    }

    /// Overwrite the fields present in the patch.
    pub fn apply_to(&self, key: &mut ApiKey) {
        if let Some(name) = &self.name {
            key.name = name.clone();
        }
        if let Some(secret_value) = &self.secret_value {
            key.secret_value = secret_value.clone();
        }
    }
}

/// Aggregate over all stored keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApiKeyStats {
    pub count: u64,
    pub total_usage: u64,
}

impl ApiKeyStats {
    /// Fold a list of keys into count and usage sum.
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a ApiKey>) -> Self {
        keys.into_iter().fold(Self::default(), |acc, key| Self {
            count: acc.count + 1,
            total_usage: acc.total_usage.saturating_add(key.usage_count),
        })
    }
}

/// Result of validating a presented secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValidation {
    pub valid: bool,
    pub reason: &'static str,
}

impl KeyValidation {
    pub const VALID_REASON: &'static str = "API key is valid";
    pub const INVALID_REASON: &'static str = "Invalid API key";

    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: Self::VALID_REASON,
        }
    }

    pub fn not_found() -> Self {
        Self {
            valid: false,
            reason: Self::INVALID_REASON,
        }
    }
}

/// Short, non-reversible fingerprint of a secret for log correlation.
pub fn secret_fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(FINGERPRINT_LEN);
    encoded
}
