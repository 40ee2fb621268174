//! SQLite schema bootstrap.
//!
//! # Invariants
//! - The schema version is mirrored to `PRAGMA user_version`.
//! - A database stamped with a newer version is never touched.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;
use std::cmp::Ordering;

const SCHEMA_VERSION: u32 = 1;
const SCHEMA_SQL: &str = include_str!("0001_init.sql");

/// Returns the schema version this binary creates and expects.
pub fn latest_version() -> u32 {
    SCHEMA_VERSION
}

/// Creates the schema on an empty database; accepts an up-to-date one.
pub fn apply_schema(conn: &mut Connection) -> DbResult<()> {
    let current_version = current_user_version(conn)?;
    match current_version.cmp(&SCHEMA_VERSION) {
        Ordering::Greater => Err(DbError::UnsupportedSchemaVersion {
            db_version: current_version,
            latest_supported: SCHEMA_VERSION,
        }),
        Ordering::Equal => Ok(()),
        Ordering::Less => {
            let tx = conn.transaction()?;
            tx.execute_batch(SCHEMA_SQL)?;
            tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            tx.commit()?;

            info!(
                "event=db_schema module=db status=ok from_version={} to_version={}",
                current_version, SCHEMA_VERSION
            );
            Ok(())
        }
    }
}

/// Reads the schema version stored in `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
