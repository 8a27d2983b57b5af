// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod api_keys;
pub mod google_oidc;
pub mod identity;
pub mod users;

pub use api_keys::ApiKeyService;
pub use google_oidc::{GoogleIdTokenVerifier, IdentityProvider, OidcError};
pub use identity::{derive_internal_id, IdentityScheme, InternalId};
pub use users::{ReconcileOutcome, ReconcileWarning, UserService};
