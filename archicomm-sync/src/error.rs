//! Error types for the sync layer.

use archicomm_model::ModelError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A snapshot document could not be read.
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] ModelError),
}
