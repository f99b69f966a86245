use thiserror::Error;

use xlink_storage::error::StorageError;
use xlink_types::error::LinkError;

/// Errors that abort a migration step.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A record that cannot be decoded or carries an unknown variant.
    #[error("unreadable record at {key}: {source}")]
    Link { key: String, source: LinkError },

    #[error("key collision at {key}")]
    KeyCollision { key: String },

    #[error("no migration step from schema v{expected} (next step starts at v{found})")]
    VersionGap { expected: u32, found: u32 },

    #[error("schema v{version} is newer than the latest known v{latest}")]
    UnknownVersion { version: u32, latest: u32 },

    #[error("config error: {reason}")]
    Config { reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
