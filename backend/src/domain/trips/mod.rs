//! Daily trip records kept by drivers and read by guardians.
//!
//! A trip record is one status line per student per service day. Drivers
//! open it for a student riding their active route and move it through the
//! day; guardians follow their children's records for today or look back
//! over earlier days.

mod error;
mod model;
mod service;

pub use error::TripStatusError;
pub use model::{RouteBinding, TripEntry, TripRecord, TripStatus, TripValidationError};
pub use service::TripStatusService;
