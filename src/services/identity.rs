// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Deterministic mapping from identity-provider subjects to internal ids.
//!
//! Internal ids use the canonical 8-4-4-4-12 lowercase hex layout. Ids that
//! already have that shape pass through unchanged; anything else is derived
//! from `"google-" + subject` with no storage lookup, so the same subject
//! always lands on the same user row.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Salt prefixed to provider subjects before derivation.
const SUBJECT_PREFIX: &str = "google-";

/// Hex widths of the five dash-separated groups.
const GROUP_WIDTHS: [usize; 5] = [8, 4, 4, 4, 12];

/// Suffixes appended to the salted subject for groups 2 through 5.
const GROUP_SUFFIXES: [&str; 4] = ["a", "b", "c", "d"];

/// Namespace for name-based (v5) internal ids.
const IDENTITY_NAMESPACE: Uuid = Uuid::from_u128(0x6b2f1c9a_3d4e_5f60_8a7b_9c0d1e2f3a4b);

/// Lowercase only. An uppercase UUID is not canonical and gets hashed like
/// any other subject, so every stored id has exactly the shape we emit.
static CANONICAL_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("canonical id pattern is valid")
});

/// Derivation used for subjects that are not already canonical.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentityScheme {
    /// 32-bit rolling string hash. Weak collision resistance, but it is what
    /// existing user rows are keyed by.
    #[default]
    RollingHash,
    /// RFC 4122 name-based UUID (SHA-1) in a fixed namespace.
    UuidV5,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown identity scheme: {0}")]
pub struct UnknownIdentityScheme(pub String);

impl FromStr for IdentityScheme {
    type Err = UnknownIdentityScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rolling-hash" | "legacy" => Ok(Self::RollingHash),
            "uuid-v5" | "v5" => Ok(Self::UuidV5),
            other => Err(UnknownIdentityScheme(other.to_string())),
        }
    }
}

/// Canonical internal identifier (36 chars, 8-4-4-4-12 lowercase hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InternalId(String);

impl InternalId {
    /// Accept a string only if it already has the canonical shape.
    pub fn parse(raw: &str) -> Option<Self> {
        is_canonical(raw).then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for InternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for InternalId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if is_canonical(&value) {
            Ok(Self(value))
        } else {
            Err(format!("not a canonical internal id: {value}"))
        }
    }
}

impl From<InternalId> for String {
    fn from(id: InternalId) -> Self {
        id.0
    }
}

/// Whether `raw` already has the canonical internal-id shape.
pub fn is_canonical(raw: &str) -> bool {
    CANONICAL_ID.is_match(raw)
}

/// Map an external subject identifier to its internal id.
///
/// Pure and total: no I/O, no randomness.
pub fn derive_internal_id(external_id: &str, scheme: IdentityScheme) -> InternalId {
    if is_canonical(external_id) {
        return InternalId(external_id.to_string());
    }

    let salted = format!("{SUBJECT_PREFIX}{external_id}");
    let derived = match scheme {
        IdentityScheme::RollingHash => rolling_hash_id(&salted),
        IdentityScheme::UuidV5 => Uuid::new_v5(&IDENTITY_NAMESPACE, salted.as_bytes())
            .hyphenated()
            .to_string(),
    };

    debug_assert!(is_canonical(&derived));
    InternalId(derived)
}

fn rolling_hash_id(salted: &str) -> String {
    let first = std::iter::once(hash_group(salted, GROUP_WIDTHS[0]));
    let rest = GROUP_SUFFIXES
        .iter()
        .zip(&GROUP_WIDTHS[1..])
        .map(|(suffix, &width)| hash_group(&format!("{salted}{suffix}"), width));

    first.chain(rest).collect::<Vec<_>>().join("-")
}

/// Hash, render as lowercase hex, zero-pad to `width`, then cut to `width`.
fn hash_group(input: &str, width: usize) -> String {
    let mut hex = format!("{:0width$x}", rolling_hash(input), width = width);
    hex.truncate(width);
    hex
}

/// `hash = hash * 31 + unit` over UTF-16 code units in signed 32-bit
/// arithmetic, then the absolute value.
fn rolling_hash(input: &str) -> u32 {
    input
        .encode_utf16()
        .fold(0i32, |hash, unit| {
            hash.wrapping_mul(31).wrapping_add(i32::from(unit))
        })
        .unsigned_abs()
}
