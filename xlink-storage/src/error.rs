use thiserror::Error;

use xlink_types::error::LinkError;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write error: {reason}")]
    WriteError { reason: String },

    #[error("Read error: {reason}")]
    ReadError { reason: String },

    #[error("SQLite error: {reason}")]
    SqliteError { reason: String },

    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    #[error("Deserialization error: {reason}")]
    DeserializationError { reason: String },

    #[error("Batch error: {reason}")]
    BatchError { reason: String },

    #[error("Invalid chain link: {0}")]
    InvalidChainLink(#[from] LinkError),

    #[error("Chain link already exists: {key}")]
    DuplicatedChainLink { key: String },

    #[error("Chain link not found: {key}")]
    ChainLinkNotFound { key: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::SqliteError {
            reason: err.to_string(),
        }
    }
}
