//! Application configuration loaded from environment variables.
//!
//! Secrets (JWT signing key) are injected as environment variables by the
//! deployment and read once at startup.

use crate::services::identity::IdentityScheme;
use std::env;
use std::str::FromStr;

/// Default ceiling on the number of API keys.
pub const DEFAULT_API_KEY_QUOTA: u32 = 50;

/// Which storage backend the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Firestore,
    /// Process-local store; data is lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid {
                name: "STORAGE_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID; the expected audience of sign-in ID tokens
    pub google_client_id: String,
    /// Frontend URL (CORS origin)
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Maximum number of API keys; `None` means unlimited
    pub api_key_quota: Option<u32>,
    /// How external subject identifiers map to internal ids
    pub identity_scheme: IdentityScheme,
    pub storage_backend: StorageBackend,

    // --- Secrets ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            api_key_quota: parse_quota(env::var("API_KEY_QUOTA").ok().as_deref())?,
            identity_scheme: env::var("IDENTITY_SCHEME")
                .ok()
                .map(|v| {
                    v.parse::<IdentityScheme>()
                        .map_err(|_| ConfigError::Invalid {
                            name: "IDENTITY_SCHEME",
                            value: v.clone(),
                        })
                })
                .transpose()?
                .unwrap_or_default(),
            storage_backend: env::var("STORAGE_BACKEND")
                .ok()
                .map(|v| v.parse::<StorageBackend>())
                .transpose()?
                .unwrap_or(StorageBackend::Firestore),

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
        })
    }

    /// Fixed configuration for tests.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            api_key_quota: Some(DEFAULT_API_KEY_QUOTA),
            identity_scheme: IdentityScheme::default(),
            storage_backend: StorageBackend::Memory,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }
}

/// `0` disables the quota; unset falls back to the default.
fn parse_quota(raw: Option<&str>) -> Result<Option<u32>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Some(DEFAULT_API_KEY_QUOTA));
    };

    let quota: u32 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name: "API_KEY_QUOTA",
        value: raw.to_string(),
    })?;

    Ok((quota > 0).then_some(quota))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
