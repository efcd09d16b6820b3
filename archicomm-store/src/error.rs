//! Diagnostics for store operations.
//!
//! [`StoreIssue`] describes every structural problem the store resolves by
//! policy instead of failing: skipped records, overwritten duplicates,
//! rejected references and cascades. Issues travel back to the caller on the
//! operation result and are also logged.

use archicomm_model::EntityKind;
use archicomm_types::EntityId;
use std::fmt;
use thiserror::Error;

/// Which end of a connection a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    From,
    To,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Endpoint::From => "from",
            Endpoint::To => "to",
        })
    }
}

/// A structural problem found while applying an operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreIssue {
    /// A record had no id and id generation was not enabled; it was skipped.
    #[error("{kind} without id skipped")]
    MissingId { kind: EntityKind },

    /// A record reused an id of the same kind; the newer value replaced the older.
    #[error("duplicate {kind} id {id}: newest value kept")]
    DuplicateId { kind: EntityKind, id: EntityId },

    /// A record reused an id already held by a different kind; it was rejected.
    #[error("id {id} already used by a {existing}")]
    IdInUse { id: EntityId, existing: EntityKind },

    /// An update or remove named an id the store does not hold.
    #[error("unknown id {id}")]
    UnknownId { id: EntityId },

    /// A patch of one kind was aimed at an entity of another.
    #[error("patch for a {patch} sent to {kind} {id}")]
    KindMismatch {
        id: EntityId,
        kind: EntityKind,
        patch: EntityKind,
    },

    /// A connection endpoint does not resolve to a component.
    #[error("connection {connection} {endpoint} references missing component {component}")]
    DanglingReference {
        connection: EntityId,
        endpoint: Endpoint,
        component: EntityId,
    },

    /// A connection was removed because one of its components was.
    #[error("connection {connection} removed with component {component}")]
    CascadeRemoved {
        connection: EntityId,
        component: EntityId,
    },
}

impl StoreIssue {
    /// Returns true for issues that describe expected side effects rather
    /// than problems with the input.
    #[must_use]
    pub fn is_informational(&self) -> bool {
        matches!(self, StoreIssue::CascadeRemoved { .. })
    }
}
