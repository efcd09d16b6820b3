//! Core type definitions for the ArchiComm canvas core.
//!
//! This crate defines the small, domain-agnostic types shared by the
//! store, guard and sync crates:
//! - Entity identifiers (caller-assigned strings, or generated UUID v7)
//! - Millisecond timestamps and the [`Clock`] abstraction that supplies them
//!
//! Diagram entities themselves live in `archicomm-model`.

mod clock;
mod ids;
mod timestamp;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ids::EntityId;
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid entity id: {0:?}")]
    InvalidId(String),
}
