//! Manufacturer record.

use super::{require_text, EntityId, ValidationError};
use serde::{Deserialize, Serialize};

/// Car manufacturer referenced by every car.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manufacturer {
    /// Store-assigned id. `None` until created.
    pub id: Option<EntityId>,
    pub name: String,
    pub country: String,
}

impl Manufacturer {
    /// Creates an unpersisted manufacturer.
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            country: country.into(),
        }
    }

    /// Creates a manufacturer with a known persisted id.
    pub fn with_id(id: EntityId, name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            country: country.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("manufacturer", "name", &self.name)?;
        require_text("manufacturer", "country", &self.country)
    }
}
