//! Car aggregate model.
//!
//! # Responsibility
//! - Hold one car row together with its manufacturer and linked drivers.
//! - Keep the in-memory driver collection unique by driver id.
//!
//! # Invariants
//! - `manufacturer` must be persisted before the car is written.
//! - Every linked driver must be persisted before the car is written.
//! - `drivers` holds at most one entry per driver id; order carries no meaning.

use super::driver::Driver;
use super::manufacturer::Manufacturer;
use super::{require_text, EntityId, ValidationError};
use serde::{Deserialize, Serialize};

/// Car with its owning manufacturer and linked drivers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    /// Store-assigned id. `None` means the car is new.
    pub id: Option<EntityId>,
    pub model: String,
    pub manufacturer: Manufacturer,
    /// Linked drivers, replaced as a whole on update.
    pub drivers: Vec<Driver>,
}

impl Car {
    /// Creates a new car with no linked drivers.
    pub fn new(model: impl Into<String>, manufacturer: Manufacturer) -> Self {
        Self {
            id: None,
            model: model.into(),
            manufacturer,
            drivers: Vec::new(),
        }
    }

    /// Builder-style variant of [`Car::add_driver`].
    pub fn with_driver(mut self, driver: Driver) -> Self {
        self.add_driver(driver);
        self
    }

    /// Links a driver. Returns `false` when a driver with the same id is
    /// already linked.
    pub fn add_driver(&mut self, driver: Driver) -> bool {
        if driver.id.is_some() && self.drivers.iter().any(|known| known.id == driver.id) {
            return false;
        }
        self.drivers.push(driver);
        true
    }

    /// Unlinks a driver by id. Returns whether a driver was removed.
    pub fn remove_driver(&mut self, driver_id: EntityId) -> bool {
        let before = self.drivers.len();
        self.drivers.retain(|driver| driver.id != Some(driver_id));
        self.drivers.len() != before
    }

    /// Ids of linked drivers, in collection order.
    pub fn driver_ids(&self) -> Vec<EntityId> {
        self.drivers.iter().filter_map(|driver| driver.id).collect()
    }

    /// Validates fields and references required by write paths.
    ///
    /// Returns the id of the referenced manufacturer.
    pub fn validate(&self) -> Result<EntityId, ValidationError> {
        require_text("car", "model", &self.model)?;
        let manufacturer_id =
            self.manufacturer
                .id
                .ok_or(ValidationError::UnpersistedReference {
                    entity: "car",
                    reference: "manufacturer",
                })?;
        if self.drivers.iter().any(|driver| driver.id.is_none()) {
            return Err(ValidationError::UnpersistedReference {
                entity: "car",
                reference: "drivers",
            });
        }
        Ok(manufacturer_id)
    }
}
