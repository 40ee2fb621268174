//! Domain model for the car/manufacturer/driver aggregate.
//!
//! # Responsibility
//! - Define the records persisted by the repository layer.
//! - Provide validation shared by every write path.
//!
//! # Invariants
//! - An entity with `id == None` has never been persisted.
//! - Deletion is represented by soft-delete flags in storage, never in the
//!   in-memory records returned by read paths.

pub mod car;
pub mod driver;
pub mod manufacturer;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned numeric identity shared by all entities.
pub type EntityId = i64;

/// Validation failure for a domain record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is empty or whitespace-only.
    BlankField {
        entity: &'static str,
        field: &'static str,
    },
    /// A referenced entity has not been persisted yet.
    UnpersistedReference {
        entity: &'static str,
        reference: &'static str,
    },
    /// An insert was requested for an entity that already has an id.
    AlreadyPersisted {
        entity: &'static str,
        id: EntityId,
    },
    /// An update was requested for an entity without an id.
    MissingId { entity: &'static str },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField { entity, field } => {
                write!(f, "{entity}.{field} must not be blank")
            }
            Self::UnpersistedReference { entity, reference } => {
                write!(f, "{entity}.{reference} must reference a persisted row")
            }
            Self::AlreadyPersisted { entity, id } => {
                write!(f, "{entity} already persisted with id {id}")
            }
            Self::MissingId { entity } => write!(f, "{entity} has no id"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField { entity, field });
    }
    Ok(())
}
