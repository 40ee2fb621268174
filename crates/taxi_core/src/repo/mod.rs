//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define entity-oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes must call `validate()` before persistence.
//! - Every repository acquires its connection per call from a
//!   [`ConnectionProvider`](crate::db::ConnectionProvider) and releases it
//!   before returning.
//! - All failures surface as [`PersistenceError`](error::PersistenceError).

pub mod car_repo;
pub mod driver_repo;
pub mod error;
pub mod manufacturer_repo;
