//! Car use-case service.
//!
//! # Responsibility
//! - Provide stable car entry points for core callers.
//! - Implement driver assignment on top of full-replace updates.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Service layer remains storage-agnostic.

use crate::model::car::Car;
use crate::model::driver::Driver;
use crate::model::{EntityId, ValidationError};
use crate::repo::car_repo::CarRepository;
use crate::repo::error::{Operation, PersistenceError, RepoResult};

/// Use-case service wrapper for car operations.
pub struct CarService<R: CarRepository> {
    repo: R,
}

impl<R: CarRepository> CarService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_car(&self, car: Car) -> RepoResult<Car> {
        self.repo.create(car)
    }

    pub fn get_car(&self, id: EntityId) -> RepoResult<Option<Car>> {
        self.repo.get_by_id(id)
    }

    /// Gets one active car, reporting absence as a `NotFound` error.
    pub fn get_car_or_not_found(&self, id: EntityId) -> RepoResult<Car> {
        self.repo
            .get_by_id(id)?
            .ok_or_else(|| PersistenceError::not_found(Operation::GetCar, format!("car id {id}")))
    }

    pub fn list_cars(&self) -> RepoResult<Vec<Car>> {
        self.repo.get_all()
    }

    pub fn update_car(&self, car: Car) -> RepoResult<Car> {
        self.repo.update(car)
    }

    pub fn delete_car(&self, id: EntityId) -> RepoResult<bool> {
        self.repo.delete(id)
    }

    /// Links `driver` to `car` and persists the resulting driver set.
    ///
    /// Linking an already-linked driver is a no-op write of the same set.
    pub fn add_driver_to_car(&self, driver: Driver, mut car: Car) -> RepoResult<Car> {
        require_persisted_driver(&driver)?;
        car.add_driver(driver);
        self.repo.update(car)
    }

    /// Unlinks `driver` from `car` and persists the resulting driver set.
    pub fn remove_driver_from_car(&self, driver: &Driver, mut car: Car) -> RepoResult<Car> {
        let driver_id = require_persisted_driver(driver)?;
        car.remove_driver(driver_id);
        self.repo.update(car)
    }

    pub fn get_all_by_driver(&self, driver_id: EntityId) -> RepoResult<Vec<Car>> {
        self.repo.get_all_by_driver(driver_id)
    }
}

fn require_persisted_driver(driver: &Driver) -> RepoResult<EntityId> {
    driver.id.ok_or_else(|| {
        PersistenceError::validation(
            Operation::UpdateCar,
            ValidationError::MissingId { entity: "driver" },
        )
    })
}
