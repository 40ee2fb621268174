//! Persistence error shared by every repository.
//!
//! # Responsibility
//! - Carry one error shape for all repository failures.
//! - Identify the failing operation and entity in the rendered message.
//!
//! # Invariants
//! - Storage failures always keep the originating [`DbError`] as `source()`.
//! - Absence on read paths is `Ok(None)`, never an error.

use crate::db::DbError;
use crate::model::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, PersistenceError>;

/// Coarse classification of a persistence failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorReason {
    /// The store or the connection layer failed.
    Storage,
    /// The in-memory record failed validation before any SQL ran.
    Validation,
    /// A referenced or requested row is missing or soft-deleted.
    NotFound,
    /// A persisted column value could not be mapped into the domain model.
    InvalidData,
}

/// Repository operation that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateCar,
    GetCar,
    ListCars,
    UpdateCar,
    DeleteCar,
    ListCarsByDriver,
    InsertCarDrivers,
    DeleteCarDrivers,
    LoadCarDrivers,
    CreateManufacturer,
    GetManufacturer,
    ListManufacturers,
    UpdateManufacturer,
    DeleteManufacturer,
    CreateDriver,
    GetDriver,
    ListDrivers,
    UpdateDriver,
    DeleteDriver,
}

impl Operation {
    /// Static description used in rendered messages and log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateCar => "create car",
            Self::GetCar => "get car",
            Self::ListCars => "list cars",
            Self::UpdateCar => "update car",
            Self::DeleteCar => "delete car",
            Self::ListCarsByDriver => "list cars by driver",
            Self::InsertCarDrivers => "insert car drivers",
            Self::DeleteCarDrivers => "delete car drivers",
            Self::LoadCarDrivers => "load car drivers",
            Self::CreateManufacturer => "create manufacturer",
            Self::GetManufacturer => "get manufacturer",
            Self::ListManufacturers => "list manufacturers",
            Self::UpdateManufacturer => "update manufacturer",
            Self::DeleteManufacturer => "delete manufacturer",
            Self::CreateDriver => "create driver",
            Self::GetDriver => "get driver",
            Self::ListDrivers => "list drivers",
            Self::UpdateDriver => "update driver",
            Self::DeleteDriver => "delete driver",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
enum Cause {
    Db(DbError),
    Validation(ValidationError),
}

/// Single error kind returned by all repository operations.
#[derive(Debug)]
pub struct PersistenceError {
    reason: ErrorReason,
    operation: Operation,
    context: String,
    cause: Option<Cause>,
}

impl PersistenceError {
    /// Wraps a storage failure. Column values that cannot be mapped into
    /// the model are reported as [`ErrorReason::InvalidData`].
    pub fn storage(operation: Operation, context: impl Into<String>, err: impl Into<DbError>) -> Self {
        let err = err.into();
        Self {
            reason: classify(&err),
            operation,
            context: context.into(),
            cause: Some(Cause::Db(err)),
        }
    }

    /// Wraps a validation failure detected before SQL execution.
    pub fn validation(operation: Operation, err: ValidationError) -> Self {
        Self {
            reason: ErrorReason::Validation,
            operation,
            context: err.to_string(),
            cause: Some(Cause::Validation(err)),
        }
    }

    /// Reports a missing or soft-deleted row.
    pub fn not_found(operation: Operation, context: impl Into<String>) -> Self {
        Self {
            reason: ErrorReason::NotFound,
            operation,
            context: context.into(),
            cause: None,
        }
    }

    pub fn reason(&self) -> ErrorReason {
        self.reason
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Entity-level description, e.g. `car id 42`.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Underlying storage error, when the failure came from the store.
    pub fn db_error(&self) -> Option<&DbError> {
        match &self.cause {
            Some(Cause::Db(err)) => Some(err),
            _ => None,
        }
    }

    pub(crate) fn error_code(&self) -> &'static str {
        match self.reason {
            ErrorReason::Storage => "storage_failed",
            ErrorReason::Validation => "validation_failed",
            ErrorReason::NotFound => "not_found",
            ErrorReason::InvalidData => "invalid_data",
        }
    }
}

fn classify(err: &DbError) -> ErrorReason {
    match err {
        DbError::Sqlite(
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..),
        ) => ErrorReason::InvalidData,
        _ => ErrorReason::Storage,
    }
}

impl Display for PersistenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "couldn't {}: {}", self.operation, self.context)?;
        if let Some(Cause::Db(err)) = &self.cause {
            write!(f, ": {err}")?;
        }
        Ok(())
    }
}

impl Error for PersistenceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(Cause::Db(err)) => Some(err),
            Some(Cause::Validation(err)) => Some(err),
            None => None,
        }
    }
}

/// Attaches operation context to fallible storage calls.
pub(crate) trait StorageContext<T> {
    fn context_with<F>(self, operation: Operation, context: F) -> RepoResult<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> StorageContext<T> for Result<T, E>
where
    E: Into<DbError>,
{
    fn context_with<F>(self, operation: Operation, context: F) -> RepoResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| PersistenceError::storage(operation, context(), err))
    }
}
