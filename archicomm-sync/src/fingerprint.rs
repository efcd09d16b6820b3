//! Content fingerprints.
//!
//! A fingerprint is the SHA-256 of a value's JSON form, hex encoded. Struct
//! fields serialize in declaration order and maps are `BTreeMap`s, so equal
//! content always yields the same string regardless of object identity.
//!
//! If a value cannot be serialized the fingerprint falls back to a random
//! token that never equals anything, so a comparison degrades to "changed"
//! and forces a propagation instead of hiding an edit.

use archicomm_model::DiagramSnapshot;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::warn;
use uuid::Uuid;

use crate::error::SyncResult;

const FALLBACK_PREFIX: &str = "fallback:";

/// A deterministic content digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Digest of `value`'s JSON form, or a fallback if it cannot be serialized.
    #[must_use]
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Self {
        match Self::try_of(value) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                warn!("fingerprint failed, using fallback: {e}");
                Self::fallback()
            }
        }
    }

    /// Digest of `value`'s JSON form.
    pub fn try_of<T: Serialize + ?Sized>(value: &T) -> SyncResult<Self> {
        let bytes = serde_json::to_vec(value)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(Self(hex::encode(hasher.finalize())))
    }

    /// A one-off token that never equals another fingerprint.
    #[must_use]
    pub fn fallback() -> Self {
        Self(format!("{FALLBACK_PREFIX}{}", Uuid::new_v4()))
    }

    /// Digest of the synchronized fields of a diagram.
    #[must_use]
    pub fn of_snapshot(snapshot: &DiagramSnapshot) -> Self {
        Self::of(snapshot)
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.0.starts_with(FALLBACK_PREFIX)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form for logs.
        let end = self.0.len().min(12);
        f.write_str(&self.0[..end])
    }
}
