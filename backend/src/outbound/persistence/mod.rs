//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Provides the [`DieselAssignmentStore`] implementation of the domain
//! assignment store and the [`DieselTripRecordRepository`] for daily trip
//! records, both backed by `diesel-async` connections from a `bb8` pool.
//!
//! - Diesel row structs (`models.rs`) and the schema (`schema.rs`) stay
//!   private to this module. The domain only sees its own types.
//! - Every database failure surfaces as the owning port's error type.
//! - Schema migrations are embedded in the binary and applied with
//!   [`run_migrations`].
//!
//! # Example
//!
//! ```ignore
//! use shuttle_backend::outbound::persistence::{DbPool, DieselAssignmentStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/shuttle")).await?;
//! let store = DieselAssignmentStore::new(pool);
//! ```

pub(crate) mod diesel_helpers;
mod diesel_assignment_store;
mod diesel_trip_record_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_assignment_store::{DieselAssignmentStore, DieselUnitOfWork};
pub use diesel_trip_record_repository::DieselTripRecordRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_migrations};
pub use pool::{DbPool, OwnedConnection, PoolConfig, PoolError};
