//! Error types for the sync layer.

use ledgersync_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Classification or resolution failed for one entity.
    #[error(transparent)]
    Core(#[from] ledgersync_types::Error),

    /// Storage collaborator failure, passed through unchanged.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The device identity slot could not be read or written.
    #[error("device identity error: {0}")]
    Identity(String),

    /// A remote batch could not be decoded at all.
    #[error("invalid remote batch: {0}")]
    InvalidBatch(String),

    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
