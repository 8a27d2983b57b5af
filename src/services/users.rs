// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity reconciliation: provider subject -> internal user row.
//!
//! Reconciliation is a side effect of sign-in, not a precondition for it.
//! Storage failures are therefore absorbed (fail-open) and reported through
//! [`ReconcileOutcome::ReconciledWithWarning`] instead of an error.

use std::sync::Arc;

use crate::db::Store;
use crate::error::AppError;
use crate::models::{IdentityClaims, User};
use crate::services::identity::{derive_internal_id, IdentityScheme, InternalId};
use crate::time_utils::now_rfc3339;

/// Which step of reconciliation was degraded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileWarning {
    /// Existence check failed; the user was treated as new. The write still
    /// keeps an existing row's `created_at`.
    ExistenceCheckFailed(String),
    /// The insert or `last_login_at` update failed and was skipped.
    WriteFailed(String),
}

impl std::fmt::Display for ReconcileWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExistenceCheckFailed(e) => write!(f, "existence check failed: {e}"),
            Self::WriteFailed(e) => write!(f, "user write failed: {e}"),
        }
    }
}

/// Result of reconciling a sign-in with the user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Reconciled {
        internal_id: InternalId,
        first_login: bool,
    },
    ReconciledWithWarning {
        internal_id: InternalId,
        first_login: bool,
        warning: ReconcileWarning,
    },
}

impl ReconcileOutcome {
    pub fn internal_id(&self) -> &InternalId {
        match self {
            Self::Reconciled { internal_id, .. }
            | Self::ReconciledWithWarning { internal_id, .. } => internal_id,
        }
    }

    /// `true` when the user was (or would have been) inserted.
    pub fn is_first_login(&self) -> bool {
        match self {
            Self::Reconciled { first_login, .. }
            | Self::ReconciledWithWarning { first_login, .. } => *first_login,
        }
    }

    pub fn warning(&self) -> Option<&ReconcileWarning> {
        match self {
            Self::Reconciled { .. } => None,
            Self::ReconciledWithWarning { warning, .. } => Some(warning),
        }
    }
}

/// Reconciles provider identities with stored users.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    scheme: IdentityScheme,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, scheme: IdentityScheme) -> Self {
        Self { store, scheme }
    }

    /// Internal id for a provider subject under the configured scheme.
    pub fn internal_id_for(&self, external_id: &str) -> InternalId {
        derive_internal_id(external_id, self.scheme)
    }

    /// Point lookup. A missing row is `Ok(false)`; storage errors propagate.
    pub async fn user_exists(&self, id: &InternalId) -> Result<bool, AppError> {
        Ok(self.store.get_user(id).await?.is_some())
    }

    pub async fn get_user(&self, id: &InternalId) -> Result<Option<User>, AppError> {
        self.store.get_user(id).await
    }

    /// Insert the user on first sign-in, otherwise bump `last_login_at`.
    ///
    /// Exactly one write is attempted per call. Never fails.
    pub async fn reconcile_user(&self, claims: &IdentityClaims) -> ReconcileOutcome {
        let internal_id = self.internal_id_for(&claims.external_subject_id);
        let now = now_rfc3339();

        let (exists, mut warning) = match self.user_exists(&internal_id).await {
            Ok(exists) => (exists, None),
            Err(e) => {
                tracing::warn!(
                    internal_id = %internal_id,
                    error = %e,
                    "User existence check failed, treating as first login"
                );
                (false, Some(ReconcileWarning::ExistenceCheckFailed(e.to_string())))
            }
        };

        let write = if exists {
            self.store
                .touch_last_login(&internal_id, &now)
                .await
                .map(|_| ())
        } else {
            let user = User::from_claims(internal_id.to_string(), claims, &now);
            self.store.upsert_user(&user).await
        };

        match write {
            Ok(()) => {
                tracing::info!(
                    internal_id = %internal_id,
                    first_login = !exists,
                    "User reconciled"
                );
            }
            Err(e) => {
                tracing::error!(
                    internal_id = %internal_id,
                    first_login = !exists,
                    error = %e,
                    "User write failed, continuing sign-in without persisted profile"
                );
                warning = Some(ReconcileWarning::WriteFailed(e.to_string()));
            }
        }

        match warning {
            None => ReconcileOutcome::Reconciled {
                internal_id,
                first_login: !exists,
            },
            Some(warning) => ReconcileOutcome::ReconciledWithWarning {
                internal_id,
                first_login: !exists,
                warning,
            },
        }
    }
}
