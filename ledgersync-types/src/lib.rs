//! Core type definitions for LedgerSync.
//!
//! This crate defines the domain-agnostic types shared by every layer of the
//! replication core:
//! - Entity and device identifiers
//! - Wall-clock millisecond timestamps used for last-writer-wins tie-breaks
//! - The error taxonomy of the conflict-resolution core
//!
//! Ledger accounts, transactions, contacts and other business records live in
//! the application, not here. The core only sees them as opaque payloads.

mod ids;
mod timestamp;

pub use ids::{DeviceId, EntityId};
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the conflict-resolution core.
///
/// These are per-entity failures. Callers processing a batch record them
/// against the offending entry and carry on with the rest.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A version vector carried a negative, fractional or non-numeric
    /// counter, or an empty device key.
    #[error("malformed version vector: {0}")]
    MalformedVersionVector(String),

    /// Two snapshots with different ids were handed to a compare or merge.
    #[error("identifier mismatch: local {local} vs remote {remote}")]
    IdentifierMismatch { local: EntityId, remote: EntityId },

    /// Restore was requested for an entity that is not a tombstone.
    #[error("entity {0} is not deleted; nothing to restore")]
    RestoreOfActiveEntity(EntityId),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid identifier: {0}")]
    InvalidId(String),
}
