//! Driver repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Read paths never return soft-deleted drivers.
//! - `license_number` is unique across all driver rows, deleted or not.
//! - Soft-deleting a driver keeps its car links.

use crate::db::ConnectionProvider;
use crate::model::driver::Driver;
use crate::model::{EntityId, ValidationError};
use crate::repo::error::{Operation, PersistenceError, RepoResult, StorageContext};
use log::info;
use rusqlite::{params, OptionalExtension, Row};

const DRIVER_SELECT_SQL: &str = "SELECT
    id AS driver_id,
    name AS driver_name,
    license_number AS driver_license_number
FROM drivers";

/// Repository interface for driver CRUD operations.
pub trait DriverRepository {
    fn create(&self, driver: Driver) -> RepoResult<Driver>;
    fn get_by_id(&self, id: EntityId) -> RepoResult<Option<Driver>>;
    fn get_all(&self) -> RepoResult<Vec<Driver>>;
    fn update(&self, driver: Driver) -> RepoResult<Driver>;
    fn delete(&self, id: EntityId) -> RepoResult<bool>;
}

/// SQLite-backed driver repository.
pub struct SqliteDriverRepository<P> {
    provider: P,
}

impl<P: ConnectionProvider> SqliteDriverRepository<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: ConnectionProvider> DriverRepository for SqliteDriverRepository<P> {
    fn create(&self, mut driver: Driver) -> RepoResult<Driver> {
        const OP: Operation = Operation::CreateDriver;
        if let Some(id) = driver.id {
            return Err(PersistenceError::validation(
                OP,
                ValidationError::AlreadyPersisted {
                    entity: "driver",
                    id,
                },
            ));
        }
        driver
            .validate()
            .map_err(|err| PersistenceError::validation(OP, err))?;
        let context = || "new driver".to_string();

        let conn = self.provider.get_connection().context_with(OP, context)?;
        conn.execute(
            "INSERT INTO drivers (name, license_number) VALUES (?1, ?2);",
            params![driver.name.as_str(), driver.license_number.as_str()],
        )
        .context_with(OP, context)?;
        let id = conn.last_insert_rowid();

        info!("event=driver_create module=repo status=ok driver_id={id}");
        driver.id = Some(id);
        Ok(driver)
    }

    fn get_by_id(&self, id: EntityId) -> RepoResult<Option<Driver>> {
        const OP: Operation = Operation::GetDriver;
        let context = || format!("driver id {id}");

        let conn = self.provider.get_connection().context_with(OP, context)?;
        conn.query_row(
            &format!(
                "{DRIVER_SELECT_SQL}
                 WHERE id = ?1
                   AND is_deleted = 0;"
            ),
            [id],
            parse_driver_row,
        )
        .optional()
        .context_with(OP, context)
    }

    fn get_all(&self) -> RepoResult<Vec<Driver>> {
        const OP: Operation = Operation::ListDrivers;
        let context = || "all active drivers".to_string();

        let conn = self.provider.get_connection().context_with(OP, context)?;
        let mut stmt = conn
            .prepare(&format!(
                "{DRIVER_SELECT_SQL}
                 WHERE is_deleted = 0
                 ORDER BY id ASC;"
            ))
            .context_with(OP, context)?;
        let drivers = stmt
            .query_map([], parse_driver_row)
            .context_with(OP, context)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context_with(OP, context)?;
        Ok(drivers)
    }

    fn update(&self, driver: Driver) -> RepoResult<Driver> {
        const OP: Operation = Operation::UpdateDriver;
        let id = driver.id.ok_or_else(|| {
            PersistenceError::validation(OP, ValidationError::MissingId { entity: "driver" })
        })?;
        driver
            .validate()
            .map_err(|err| PersistenceError::validation(OP, err))?;
        let context = || format!("driver id {id}");

        let conn = self.provider.get_connection().context_with(OP, context)?;
        let changed = conn
            .execute(
                "UPDATE drivers
                 SET
                    name = ?1,
                    license_number = ?2
                 WHERE id = ?3
                   AND is_deleted = 0;",
                params![driver.name.as_str(), driver.license_number.as_str(), id],
            )
            .context_with(OP, context)?;

        info!(
            "event=driver_update module=repo status={} driver_id={id}",
            if changed > 0 { "ok" } else { "noop" }
        );
        Ok(driver)
    }

    fn delete(&self, id: EntityId) -> RepoResult<bool> {
        const OP: Operation = Operation::DeleteDriver;
        let context = || format!("driver id {id}");

        let conn = self.provider.get_connection().context_with(OP, context)?;
        let changed = conn
            .execute(
                "UPDATE drivers
                 SET is_deleted = 1
                 WHERE id = ?1
                   AND is_deleted = 0;",
                [id],
            )
            .context_with(OP, context)?;

        info!(
            "event=driver_delete module=repo status={} driver_id={id}",
            if changed > 0 { "ok" } else { "noop" }
        );
        Ok(changed > 0)
    }
}

/// Maps `driver_*` aliased columns into a [`Driver`].
pub(crate) fn parse_driver_row(row: &Row<'_>) -> rusqlite::Result<Driver> {
    Ok(Driver {
        id: Some(row.get("driver_id")?),
        name: row.get("driver_name")?,
        license_number: row.get("driver_license_number")?,
    })
}
