//! Connection providers consumed by repositories.
//!
//! # Responsibility
//! - Hand out one ready connection per repository call.
//! - Release the connection when the returned guard goes out of scope.
//!
//! # Invariants
//! - Providers only hand out connections at the latest schema version.
//! - A guard never outlives the provider it was obtained from.

use super::migrations::{current_user_version, latest_version};
use super::open::{connect, open_db_in_memory, open_db_with_timeout};
use super::{DbError, DbResult};
use log::error;
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Scoped connection handed out by a [`ConnectionProvider`].
///
/// Dropping the guard closes an owned connection or unlocks a shared one.
pub enum ConnectionGuard<'a> {
    Owned(Connection),
    Shared(MutexGuard<'a, Connection>),
}

impl Deref for ConnectionGuard<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        match self {
            Self::Owned(conn) => conn,
            Self::Shared(guard) => &**guard,
        }
    }
}

impl DerefMut for ConnectionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        match self {
            Self::Owned(conn) => conn,
            Self::Shared(guard) => &mut **guard,
        }
    }
}

/// Source of ready, migrated connections.
pub trait ConnectionProvider {
    fn get_connection(&self) -> DbResult<ConnectionGuard<'_>>;
}

impl<P: ConnectionProvider + ?Sized> ConnectionProvider for &P {
    fn get_connection(&self) -> DbResult<ConnectionGuard<'_>> {
        (**self).get_connection()
    }
}

impl<P: ConnectionProvider + ?Sized> ConnectionProvider for Arc<P> {
    fn get_connection(&self) -> DbResult<ConnectionGuard<'_>> {
        (**self).get_connection()
    }
}

impl<P: ConnectionProvider + ?Sized> ConnectionProvider for Box<P> {
    fn get_connection(&self) -> DbResult<ConnectionGuard<'_>> {
        (**self).get_connection()
    }
}

/// Opens a fresh connection to a database file on every call.
#[derive(Debug, Clone)]
pub struct FileConnectionProvider {
    path: PathBuf,
    busy_timeout: Duration,
}

impl FileConnectionProvider {
    /// Bootstraps the schema at `path` once, then serves per-call connections.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        drop(open_db_with_timeout(&path, busy_timeout)?);
        Ok(Self { path, busy_timeout })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConnectionProvider for FileConnectionProvider {
    fn get_connection(&self) -> DbResult<ConnectionGuard<'_>> {
        let conn = connect(&self.path, self.busy_timeout).map_err(|err| {
            error!(
                "event=db_acquire module=db status=error mode=file error_code=db_connect_failed error={}",
                err
            );
            err
        })?;
        ensure_schema_current(&conn)?;
        Ok(ConnectionGuard::Owned(conn))
    }
}

/// Serializes all callers onto one long-lived connection.
///
/// Used for in-memory databases, where every connection is a distinct store.
#[derive(Debug)]
pub struct SharedConnectionProvider {
    conn: Mutex<Connection>,
}

impl SharedConnectionProvider {
    /// Wraps an already-migrated connection.
    pub fn new(conn: Connection) -> DbResult<Self> {
        ensure_schema_current(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens and migrates a private in-memory database.
    pub fn in_memory() -> DbResult<Self> {
        Self::new(open_db_in_memory()?)
    }
}

impl ConnectionProvider for SharedConnectionProvider {
    fn get_connection(&self) -> DbResult<ConnectionGuard<'_>> {
        let guard = self.conn.lock().map_err(|_| {
            error!(
                "event=db_acquire module=db status=error mode=shared error_code=connection_poisoned"
            );
            DbError::ConnectionPoisoned
        })?;
        Ok(ConnectionGuard::Shared(guard))
    }
}

fn ensure_schema_current(conn: &Connection) -> DbResult<()> {
    let actual_version = current_user_version(conn)?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(DbError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
