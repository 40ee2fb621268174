//! Driver record.

use super::{require_text, EntityId, ValidationError};
use serde::{Deserialize, Serialize};

/// Driver that can be linked to any number of cars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    /// Store-assigned id. `None` until created.
    pub id: Option<EntityId>,
    pub name: String,
    /// Unique across drivers in storage.
    pub license_number: String,
}

impl Driver {
    /// Creates an unpersisted driver.
    pub fn new(name: impl Into<String>, license_number: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            license_number: license_number.into(),
        }
    }

    /// Creates a driver with a known persisted id.
    pub fn with_id(
        id: EntityId,
        name: impl Into<String>,
        license_number: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            license_number: license_number.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("driver", "name", &self.name)?;
        require_text("driver", "license_number", &self.license_number)
    }
}
