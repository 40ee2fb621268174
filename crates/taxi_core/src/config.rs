//! Storage configuration.
//!
//! # Responsibility
//! - Describe which SQLite store the repositories run against.
//! - Build the matching [`ConnectionProvider`].

use crate::db::{
    ConnectionProvider, DbResult, FileConnectionProvider, SharedConnectionProvider,
    DEFAULT_BUSY_TIMEOUT,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Boxed provider shared by every repository of one process.
pub type DynConnectionProvider = Box<dyn ConnectionProvider + Send + Sync>;

/// SQLite storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum StorageBackend {
    /// Database file opened per repository call.
    File { path: PathBuf },
    /// Private in-memory database; contents vanish with the provider.
    #[default]
    Memory,
}

/// Storage settings for the repository layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite busy timeout applied to every connection.
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT.as_millis() as u64,
        }
    }
}

impl StorageConfig {
    /// File-backed configuration with the default busy timeout.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: StorageBackend::File { path: path.into() },
            ..Self::default()
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Opens the configured store and returns a provider for it.
    pub fn into_provider(self) -> DbResult<DynConnectionProvider> {
        let busy_timeout = self.busy_timeout();
        match self.backend {
            StorageBackend::File { path } => {
                Ok(Box::new(FileConnectionProvider::open(path, busy_timeout)?))
            }
            StorageBackend::Memory => Ok(Box::new(SharedConnectionProvider::in_memory()?)),
        }
    }
}
