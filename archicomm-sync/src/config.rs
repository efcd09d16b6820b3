//! Sync layer configuration.

use archicomm_guard::GuardConfig;
use archicomm_store::StoreConfig;
use serde::{Deserialize, Serialize};

use crate::error::SyncResult;

/// Configuration for the canvas service and its coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Normalization settings for the canvas container.
    pub store: StoreConfig,
    /// Stability guard tuning.
    pub guard: GuardConfig,
    /// Delay before a deferred user write is committed (ms).
    pub debounce_ms: u64,
    /// Undo steps kept per container.
    pub history_limit: usize,
    /// Guard subject name for propagation samples.
    pub subject: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            guard: GuardConfig::default(),
            debounce_ms: 16,
            history_limit: 50,
            subject: "sync-coordinator".to_string(),
        }
    }
}

impl SyncConfig {
    /// Parses a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
