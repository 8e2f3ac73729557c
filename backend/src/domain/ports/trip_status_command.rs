//! Driving port for trip record writes.

use async_trait::async_trait;

use crate::domain::Error;
use crate::domain::identity::Username;
use crate::domain::ids::{DriverId, SchoolId, StudentId, TripRecordId};
use crate::domain::trips::TripStatus;

/// Open today's record for a student on the driver's route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTripRequest {
    pub driver_id: DriverId,
    pub school_id: SchoolId,
    pub student_id: StudentId,
    /// Starting status; defaults to waiting for the morning run.
    pub status: Option<TripStatus>,
    pub actor: Username,
}

/// Move one of the driver's records to a new status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTripStatusRequest {
    pub trip_id: TripRecordId,
    pub driver_id: DriverId,
    pub status: TripStatus,
    pub actor: Username,
}

/// Trip record write use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TripStatusCommand: Send + Sync {
    /// Open a record and return its identifier.
    async fn record_trip(&self, request: RecordTripRequest) -> Result<TripRecordId, Error>;

    /// Change a record's status.
    async fn update_trip_status(&self, request: UpdateTripStatusRequest) -> Result<(), Error>;
}
