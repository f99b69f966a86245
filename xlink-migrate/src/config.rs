use serde::{Deserialize, Serialize};
use std::path::Path;

use xlink_storage::memory::MemoryStore;
use xlink_storage::sqlite::SqliteStore;
use xlink_storage::traits::BatchWriter;

use crate::error::MigrationError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Schema version to migrate to. Defaults to the newest known version.
    #[serde(default)]
    pub target_version: Option<u32>,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend: "memory" or "sqlite"
    pub db_type: String,
    /// Database file for the sqlite backend.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "xlink.db".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            target_version: None,
            storage: StorageConfig {
                db_type: "memory".to_string(),
                path: default_db_path(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl MigrationConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, MigrationError> {
        let contents = std::fs::read_to_string(path).map_err(|e| MigrationError::Config {
            reason: format!("failed to read config file '{}': {}", path, e),
        })?;
        Self::from_toml_str(&contents).map_err(|e| MigrationError::Config {
            reason: format!("failed to parse config file '{}': {}", path, e),
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, MigrationError> {
        toml::from_str(contents).map_err(|e| MigrationError::Config {
            reason: e.to_string(),
        })
    }

    /// Open the configured storage backend.
    pub fn open_store(&self) -> Result<Box<dyn BatchWriter>, MigrationError> {
        match self.storage.db_type.as_str() {
            "memory" => Ok(Box::new(MemoryStore::new())),
            "sqlite" => {
                if let Some(parent) = Path::new(&self.storage.path).parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                Ok(Box::new(SqliteStore::new(&self.storage.path)?))
            }
            other => Err(MigrationError::Config {
                reason: format!(
                    "unknown storage backend '{}', expected 'memory' or 'sqlite'",
                    other
                ),
            }),
        }
    }
}
