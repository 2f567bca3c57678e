//! Error types for the sync layer.

use thiserror::Error;

/// Errors reported by a [`crate::store::DocumentStore`].
///
/// These never reach cache consumers: the remote channel logs them and turns
/// them into a failed [`crate::channel::WriteOutcome`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Stored document is corrupt: {0}")]
    Corrupt(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Misuse of the document cache.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    #[error("Document cache already started")]
    AlreadyStarted,

    #[error("Document cache used outside a tokio runtime")]
    NoRuntime,

    #[error("Document cache has been shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, SyncError>;
