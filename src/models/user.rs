//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User profile stored in Firestore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Canonical internal id derived from the provider subject (also the document ID)
    pub internal_id: String,
    /// Email address reported by the identity provider
    pub email: String,
    /// Display name
    pub display_name: Option<String>,
    /// Profile picture URL
    pub avatar_url: Option<String>,
    /// When the user first signed in
    pub created_at: String,
    /// Most recent sign-in
    pub last_login_at: String,
}

/// Profile claims handed over by the identity provider at sign-in.
///
/// Treated as untrusted but well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    /// Opaque subject identifier (e.g. a numeric Google `sub`)
    pub external_subject_id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl User {
    /// Build the row inserted on first sign-in.
    pub fn from_claims(internal_id: String, claims: &IdentityClaims, now: &str) -> Self {
        Self {
            internal_id,
            email: claims.email.clone(),
            display_name: claims.display_name.clone(),
            avatar_url: claims.avatar_url.clone(),
            created_at: now.to_string(),
            last_login_at: now.to_string(),
        }
    }
}
