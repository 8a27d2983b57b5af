// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod api_key;
pub mod user;

pub use api_key::{ApiKey, ApiKeyPatch, ApiKeyStats, KeyValidation, NewApiKey};
pub use user::{IdentityClaims, User};
