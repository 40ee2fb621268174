//! SQLite storage bootstrap and connection provisioning.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the repository layer.
//! - Apply the bootstrap schema in deterministic order.
//! - Hand out scoped connections through [`ConnectionProvider`].
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - Repositories never see a connection whose schema is not fully applied.
//! - Every handed-out connection is released when its guard is dropped.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;
mod provider;

pub use open::{open_db, open_db_in_memory, open_db_with_timeout, DEFAULT_BUSY_TIMEOUT};
pub use provider::{
    ConnectionGuard, ConnectionProvider, FileConnectionProvider, SharedConnectionProvider,
};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Connection schema is older than this binary expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// A shared connection was poisoned by a panic in another holder.
    ConnectionPoisoned,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection requires schema version {expected_version}, got {actual_version}"
            ),
            Self::ConnectionPoisoned => write!(f, "shared connection is poisoned"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::UninitializedConnection { .. } => None,
            Self::ConnectionPoisoned => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
