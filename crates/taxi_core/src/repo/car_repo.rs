//! Car repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the car aggregate: car row, manufacturer reference, driver links.
//! - Hydrate driver collections for every car returned by a read path.
//!
//! # Invariants
//! - Read paths never return soft-deleted cars.
//! - Multi-statement writes (create, update) run in one transaction.
//! - Update always replaces the whole link set; delete leaves link rows untouched.
//! - Update/delete never change the row of a missing or soft-deleted car.

use crate::db::ConnectionProvider;
use crate::model::car::Car;
use crate::model::driver::Driver;
use crate::model::{EntityId, ValidationError};
use crate::repo::driver_repo::parse_driver_row;
use crate::repo::error::{Operation, PersistenceError, RepoResult, StorageContext};
use crate::repo::manufacturer_repo::{manufacturer_is_active, parse_manufacturer_row};
use log::{debug, error, info};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

const CAR_SELECT_SQL: &str = "SELECT
    c.id AS car_id,
    c.model AS car_model,
    m.id AS manufacturer_id,
    m.name AS manufacturer_name,
    m.country AS manufacturer_country
FROM cars c
INNER JOIN manufacturers m ON m.id = c.manufacturer_id";

/// Upper bound of car ids bound into one hydration query.
const HYDRATION_BATCH_SIZE: usize = 500;

/// Repository interface for the car aggregate.
pub trait CarRepository {
    /// Inserts a new car and its driver links; returns it with `id` set.
    fn create(&self, car: Car) -> RepoResult<Car>;
    /// Loads one active car with manufacturer and drivers.
    fn get_by_id(&self, id: EntityId) -> RepoResult<Option<Car>>;
    /// Loads all active cars, ordered by id.
    fn get_all(&self) -> RepoResult<Vec<Car>>;
    /// Overwrites model/manufacturer and replaces all driver links.
    fn update(&self, car: Car) -> RepoResult<Car>;
    /// Soft-deletes one car. Returns whether an active row was affected.
    fn delete(&self, id: EntityId) -> RepoResult<bool>;
    /// Loads all active cars linked to the given driver, ordered by id.
    fn get_all_by_driver(&self, driver_id: EntityId) -> RepoResult<Vec<Car>>;
}

/// SQLite-backed car repository.
pub struct SqliteCarRepository<P> {
    provider: P,
}

impl<P: ConnectionProvider> SqliteCarRepository<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

impl<P: ConnectionProvider> CarRepository for SqliteCarRepository<P> {
    fn create(&self, mut car: Car) -> RepoResult<Car> {
        const OP: Operation = Operation::CreateCar;
        let started_at = Instant::now();

        if let Some(id) = car.id {
            return Err(PersistenceError::validation(
                OP,
                ValidationError::AlreadyPersisted { entity: "car", id },
            ));
        }
        let manufacturer_id = car
            .validate()
            .map_err(|err| PersistenceError::validation(OP, err))?;
        let context = || format!("car `{}` of manufacturer id {manufacturer_id}", car.model);

        let result = (|| -> RepoResult<EntityId> {
            let mut conn = self.provider.get_connection().context_with(OP, context)?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .context_with(OP, context)?;

            if !manufacturer_is_active(&tx, manufacturer_id).context_with(OP, context)? {
                return Err(PersistenceError::not_found(
                    OP,
                    format!("manufacturer id {manufacturer_id}"),
                ));
            }

            tx.execute(
                "INSERT INTO cars (model, manufacturer_id) VALUES (?1, ?2);",
                params![car.model.as_str(), manufacturer_id],
            )
            .context_with(OP, context)?;
            let car_id = tx.last_insert_rowid();

            insert_driver_links(&tx, car_id, &car.driver_ids())?;
            tx.commit().context_with(OP, context)?;
            Ok(car_id)
        })();

        match result {
            Ok(car_id) => {
                car.id = Some(car_id);
                info!(
                    "event=car_create module=repo status=ok car_id={} driver_count={} duration_ms={}",
                    car_id,
                    car.drivers.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(car)
            }
            Err(err) => Err(log_failure("car_create", started_at, err)),
        }
    }

    fn get_by_id(&self, id: EntityId) -> RepoResult<Option<Car>> {
        const OP: Operation = Operation::GetCar;
        let context = || format!("car id {id}");

        let conn = self.provider.get_connection().context_with(OP, context)?;
        let mut stmt = conn
            .prepare(&format!(
                "{CAR_SELECT_SQL}
                 WHERE c.id = ?1
                   AND c.is_deleted = 0;"
            ))
            .context_with(OP, context)?;

        let mut rows = stmt.query([id]).context_with(OP, context)?;
        let car = match rows.next().context_with(OP, context)? {
            Some(row) => parse_car_row(row).context_with(OP, context)?,
            None => {
                debug!("event=car_get module=repo status=absent car_id={id}");
                return Ok(None);
            }
        };

        let mut cars = vec![car];
        hydrate_drivers(&conn, &mut cars)?;
        Ok(cars.pop())
    }

    fn get_all(&self) -> RepoResult<Vec<Car>> {
        const OP: Operation = Operation::ListCars;
        let context = || "all active cars".to_string();

        let conn = self.provider.get_connection().context_with(OP, context)?;
        let mut stmt = conn
            .prepare(&format!(
                "{CAR_SELECT_SQL}
                 WHERE c.is_deleted = 0
                 ORDER BY c.id ASC;"
            ))
            .context_with(OP, context)?;

        let mut cars = collect_cars(stmt.query([]).context_with(OP, context)?)
            .context_with(OP, context)?;
        hydrate_drivers(&conn, &mut cars)?;
        Ok(cars)
    }

    fn update(&self, car: Car) -> RepoResult<Car> {
        const OP: Operation = Operation::UpdateCar;
        let started_at = Instant::now();

        let car_id = car.id.ok_or_else(|| {
            PersistenceError::validation(OP, ValidationError::MissingId { entity: "car" })
        })?;
        let manufacturer_id = car
            .validate()
            .map_err(|err| PersistenceError::validation(OP, err))?;
        let context = || format!("car id {car_id}");

        let result = (|| -> RepoResult<bool> {
            let mut conn = self.provider.get_connection().context_with(OP, context)?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .context_with(OP, context)?;

            let changed = tx
                .execute(
                    "UPDATE cars
                     SET
                        model = ?1,
                        manufacturer_id = ?2
                     WHERE id = ?3
                       AND is_deleted = 0;",
                    params![car.model.as_str(), manufacturer_id, car_id],
                )
                .context_with(OP, context)?;
            let applied = changed > 0;

            if applied
                && !manufacturer_is_active(&tx, manufacturer_id).context_with(OP, context)?
            {
                return Err(PersistenceError::not_found(
                    OP,
                    format!("manufacturer id {manufacturer_id}"),
                ));
            }

            // Link rows are replaced even when the car row is soft-deleted.
            delete_driver_links(&tx, car_id)?;
            insert_driver_links(&tx, car_id, &car.driver_ids())?;
            tx.commit().context_with(OP, context)?;
            Ok(applied)
        })();

        match result {
            Ok(applied) => {
                info!(
                    "event=car_update module=repo status={} car_id={} driver_count={} duration_ms={}",
                    if applied { "ok" } else { "links_only" },
                    car_id,
                    car.drivers.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(car)
            }
            Err(err) => Err(log_failure("car_update", started_at, err)),
        }
    }

    fn delete(&self, id: EntityId) -> RepoResult<bool> {
        const OP: Operation = Operation::DeleteCar;
        let started_at = Instant::now();
        let context = || format!("car id {id}");

        let result = (|| -> RepoResult<usize> {
            let conn = self.provider.get_connection().context_with(OP, context)?;
            conn.execute(
                "UPDATE cars
                 SET is_deleted = 1
                 WHERE id = ?1
                   AND is_deleted = 0;",
                [id],
            )
            .context_with(OP, context)
        })();

        match result {
            Ok(changed) => {
                info!(
                    "event=car_delete module=repo status={} car_id={} duration_ms={}",
                    if changed > 0 { "ok" } else { "noop" },
                    id,
                    started_at.elapsed().as_millis()
                );
                Ok(changed > 0)
            }
            Err(err) => Err(log_failure("car_delete", started_at, err)),
        }
    }

    fn get_all_by_driver(&self, driver_id: EntityId) -> RepoResult<Vec<Car>> {
        const OP: Operation = Operation::ListCarsByDriver;
        let context = || format!("driver id {driver_id}");

        let conn = self.provider.get_connection().context_with(OP, context)?;
        let mut stmt = conn
            .prepare(&format!(
                "{CAR_SELECT_SQL}
                 WHERE c.is_deleted = 0
                   AND EXISTS (
                       SELECT 1
                       FROM cars_drivers cd
                       WHERE cd.car_id = c.id
                         AND cd.driver_id = ?1
                   )
                 ORDER BY c.id ASC;"
            ))
            .context_with(OP, context)?;

        let mut cars = collect_cars(stmt.query([driver_id]).context_with(OP, context)?)
            .context_with(OP, context)?;
        hydrate_drivers(&conn, &mut cars)?;
        Ok(cars)
    }
}

fn parse_car_row(row: &Row<'_>) -> rusqlite::Result<Car> {
    Ok(Car {
        id: Some(row.get("car_id")?),
        model: row.get("car_model")?,
        manufacturer: parse_manufacturer_row(row)?,
        drivers: Vec::new(),
    })
}

fn collect_cars(mut rows: rusqlite::Rows<'_>) -> rusqlite::Result<Vec<Car>> {
    let mut cars = Vec::new();
    while let Some(row) = rows.next()? {
        cars.push(parse_car_row(row)?);
    }
    Ok(cars)
}

/// Fills `drivers` on every car using batched link-table queries.
fn hydrate_drivers(conn: &Connection, cars: &mut [Car]) -> RepoResult<()> {
    const OP: Operation = Operation::LoadCarDrivers;

    let car_ids: Vec<EntityId> = cars.iter().filter_map(|car| car.id).collect();
    let mut by_car: HashMap<EntityId, Vec<Driver>> = HashMap::new();

    for batch in car_ids.chunks(HYDRATION_BATCH_SIZE) {
        let context = || format!("{} car ids starting at {}", batch.len(), batch[0]);
        let placeholders = vec!["?"; batch.len()].join(", ");
        let mut stmt = conn
            .prepare(&format!(
                "SELECT DISTINCT
                    cd.car_id AS link_car_id,
                    d.id AS driver_id,
                    d.name AS driver_name,
                    d.license_number AS driver_license_number
                 FROM cars_drivers cd
                 INNER JOIN drivers d ON d.id = cd.driver_id
                 WHERE cd.car_id IN ({placeholders})
                 ORDER BY cd.car_id ASC, d.id ASC;"
            ))
            .context_with(OP, context)?;

        let bind_values = batch.iter().map(|id| Value::Integer(*id));
        let mut rows = stmt
            .query(params_from_iter(bind_values))
            .context_with(OP, context)?;
        while let Some(row) = rows.next().context_with(OP, context)? {
            let car_id = row.get::<_, EntityId>("link_car_id").context_with(OP, context)?;
            let driver = parse_driver_row(row).context_with(OP, context)?;
            by_car.entry(car_id).or_default().push(driver);
        }
    }

    for car in cars.iter_mut() {
        car.drivers = car
            .id
            .and_then(|id| by_car.remove(&id))
            .unwrap_or_default();
    }
    Ok(())
}

fn insert_driver_links(conn: &Connection, car_id: EntityId, driver_ids: &[EntityId]) -> RepoResult<()> {
    const OP: Operation = Operation::InsertCarDrivers;
    let context = || format!("car id {car_id}");

    let unique: BTreeSet<EntityId> = driver_ids.iter().copied().collect();
    let mut stmt = conn
        .prepare("INSERT INTO cars_drivers (car_id, driver_id) VALUES (?1, ?2);")
        .context_with(OP, context)?;
    for driver_id in unique {
        stmt.execute(params![car_id, driver_id])
            .context_with(OP, || format!("car id {car_id} and driver id {driver_id}"))?;
    }
    Ok(())
}

fn delete_driver_links(conn: &Connection, car_id: EntityId) -> RepoResult<()> {
    conn.execute("DELETE FROM cars_drivers WHERE car_id = ?1;", [car_id])
        .context_with(Operation::DeleteCarDrivers, || format!("car id {car_id}"))?;
    Ok(())
}

fn log_failure(event: &str, started_at: Instant, err: PersistenceError) -> PersistenceError {
    error!(
        "event={} module=repo status=error duration_ms={} error_code={} operation={}",
        event,
        started_at.elapsed().as_millis(),
        err.error_code(),
        err.operation()
    );
    err
}
