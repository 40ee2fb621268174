//! Manufacturer repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Read paths never return soft-deleted manufacturers.
//! - Soft-deleting a manufacturer does not touch the cars referencing it.

use crate::db::ConnectionProvider;
use crate::model::manufacturer::Manufacturer;
use crate::model::{EntityId, ValidationError};
use crate::repo::error::{Operation, PersistenceError, RepoResult, StorageContext};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

const MANUFACTURER_SELECT_SQL: &str = "SELECT
    id AS manufacturer_id,
    name AS manufacturer_name,
    country AS manufacturer_country
FROM manufacturers";

/// Repository interface for manufacturer CRUD operations.
pub trait ManufacturerRepository {
    fn create(&self, manufacturer: Manufacturer) -> RepoResult<Manufacturer>;
    fn get_by_id(&self, id: EntityId) -> RepoResult<Option<Manufacturer>>;
    fn get_all(&self) -> RepoResult<Vec<Manufacturer>>;
    fn update(&self, manufacturer: Manufacturer) -> RepoResult<Manufacturer>;
    fn delete(&self, id: EntityId) -> RepoResult<bool>;
}

/// SQLite-backed manufacturer repository.
pub struct SqliteManufacturerRepository<P> {
    provider: P,
}

impl<P: ConnectionProvider> SqliteManufacturerRepository<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: ConnectionProvider> ManufacturerRepository for SqliteManufacturerRepository<P> {
    fn create(&self, mut manufacturer: Manufacturer) -> RepoResult<Manufacturer> {
        const OP: Operation = Operation::CreateManufacturer;
        if let Some(id) = manufacturer.id {
            return Err(PersistenceError::validation(
                OP,
                ValidationError::AlreadyPersisted {
                    entity: "manufacturer",
                    id,
                },
            ));
        }
        manufacturer
            .validate()
            .map_err(|err| PersistenceError::validation(OP, err))?;
        let context = || format!("manufacturer `{}`", manufacturer.name);

        let conn = self.provider.get_connection().context_with(OP, context)?;
        conn.execute(
            "INSERT INTO manufacturers (name, country) VALUES (?1, ?2);",
            params![manufacturer.name.as_str(), manufacturer.country.as_str()],
        )
        .context_with(OP, context)?;
        let id = conn.last_insert_rowid();

        info!("event=manufacturer_create module=repo status=ok manufacturer_id={id}");
        manufacturer.id = Some(id);
        Ok(manufacturer)
    }

    fn get_by_id(&self, id: EntityId) -> RepoResult<Option<Manufacturer>> {
        const OP: Operation = Operation::GetManufacturer;
        let context = || format!("manufacturer id {id}");

        let conn = self.provider.get_connection().context_with(OP, context)?;
        conn.query_row(
            &format!(
                "{MANUFACTURER_SELECT_SQL}
                 WHERE id = ?1
                   AND is_deleted = 0;"
            ),
            [id],
            parse_manufacturer_row,
        )
        .optional()
        .context_with(OP, context)
    }

    fn get_all(&self) -> RepoResult<Vec<Manufacturer>> {
        const OP: Operation = Operation::ListManufacturers;
        let context = || "all active manufacturers".to_string();

        let conn = self.provider.get_connection().context_with(OP, context)?;
        let mut stmt = conn
            .prepare(&format!(
                "{MANUFACTURER_SELECT_SQL}
                 WHERE is_deleted = 0
                 ORDER BY id ASC;"
            ))
            .context_with(OP, context)?;
        let manufacturers = stmt
            .query_map([], parse_manufacturer_row)
            .context_with(OP, context)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context_with(OP, context)?;
        Ok(manufacturers)
    }

    fn update(&self, manufacturer: Manufacturer) -> RepoResult<Manufacturer> {
        const OP: Operation = Operation::UpdateManufacturer;
        let id = manufacturer.id.ok_or_else(|| {
            PersistenceError::validation(
                OP,
                ValidationError::MissingId {
                    entity: "manufacturer",
                },
            )
        })?;
        manufacturer
            .validate()
            .map_err(|err| PersistenceError::validation(OP, err))?;
        let context = || format!("manufacturer id {id}");

        let conn = self.provider.get_connection().context_with(OP, context)?;
        let changed = conn
            .execute(
                "UPDATE manufacturers
                 SET
                    name = ?1,
                    country = ?2
                 WHERE id = ?3
                   AND is_deleted = 0;",
                params![
                    manufacturer.name.as_str(),
                    manufacturer.country.as_str(),
                    id
                ],
            )
            .context_with(OP, context)?;

        info!(
            "event=manufacturer_update module=repo status={} manufacturer_id={id}",
            if changed > 0 { "ok" } else { "noop" }
        );
        Ok(manufacturer)
    }

    fn delete(&self, id: EntityId) -> RepoResult<bool> {
        const OP: Operation = Operation::DeleteManufacturer;
        let context = || format!("manufacturer id {id}");

        let conn = self.provider.get_connection().context_with(OP, context)?;
        let changed = conn
            .execute(
                "UPDATE manufacturers
                 SET is_deleted = 1
                 WHERE id = ?1
                   AND is_deleted = 0;",
                [id],
            )
            .context_with(OP, context)?;

        info!(
            "event=manufacturer_delete module=repo status={} manufacturer_id={id}",
            if changed > 0 { "ok" } else { "noop" }
        );
        Ok(changed > 0)
    }
}

/// Maps `manufacturer_*` aliased columns into a [`Manufacturer`].
pub(crate) fn parse_manufacturer_row(row: &Row<'_>) -> rusqlite::Result<Manufacturer> {
    Ok(Manufacturer {
        id: Some(row.get("manufacturer_id")?),
        name: row.get("manufacturer_name")?,
        country: row.get("manufacturer_country")?,
    })
}

pub(crate) fn manufacturer_is_active(conn: &Connection, id: EntityId) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM manufacturers
            WHERE id = ?1
              AND is_deleted = 0
        );",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
