//! Test doubles shared by unit tests (in `src/`) and integration tests (in
//! `tests/`).
//!
//! Compiled for unit tests and behind the `test-support` feature.

mod clock;
mod memory_store;
mod memory_trips;

pub use clock::SchoolDayClock;
pub use memory_store::{InMemoryAssignmentStore, InMemoryUnitOfWork};
pub use memory_trips::InMemoryTripRecordRepository;

use crate::domain::ids::{DriverId, StudentId};
use crate::domain::routes::{DriverProfile, StudentProfile};

/// Driver profile with predictable names derived from `username`.
#[must_use]
pub fn driver_profile(id: DriverId, username: &str) -> DriverProfile {
    DriverProfile {
        id,
        username: username.to_owned(),
        first_name: format!("{username}-first"),
        last_name: format!("{username}-last"),
        vehicle_name: Some("Shuttle Van".to_owned()),
        vehicle_number: Some(format!("{username}-plate")),
    }
}

/// Student profile with predictable names derived from `label`.
#[must_use]
pub fn student_profile(id: StudentId, label: &str) -> StudentProfile {
    StudentProfile {
        id,
        first_name: label.to_owned(),
        last_name: "Pupil".to_owned(),
        pickup_point: Some(format!("{label} gate")),
    }
}
