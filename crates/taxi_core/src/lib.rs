//! Core persistence layer for the taxi fleet.
//! Cars, their manufacturers and their drivers live here, on top of SQLite.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{DynConnectionProvider, StorageBackend, StorageConfig};
pub use db::{
    ConnectionGuard, ConnectionProvider, DbError, DbResult, FileConnectionProvider,
    SharedConnectionProvider,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::car::Car;
pub use model::driver::Driver;
pub use model::manufacturer::Manufacturer;
pub use model::{EntityId, ValidationError};
pub use repo::car_repo::{CarRepository, SqliteCarRepository};
pub use repo::driver_repo::{DriverRepository, SqliteDriverRepository};
pub use repo::error::{ErrorReason, Operation, PersistenceError, RepoResult};
pub use repo::manufacturer_repo::{ManufacturerRepository, SqliteManufacturerRepository};
pub use service::car_service::CarService;

/// Minimal health-check API for CLI smoke runs.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
