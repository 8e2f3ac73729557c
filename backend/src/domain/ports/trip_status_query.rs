//! Driving port for trip record reads.

use async_trait::async_trait;

use crate::domain::Error;
use crate::domain::ids::{DriverId, TripRecordId, UserId};
use crate::domain::trips::TripEntry;

/// Who is looking at a trip record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripViewer {
    /// The driver who opened it.
    Driver(DriverId),
    /// A guardian linked to the student.
    Parent(UserId),
}

/// Trip record read use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TripStatusQuery: Send + Sync {
    /// One record, if `viewer` may see it.
    async fn get_trip(&self, trip_id: TripRecordId, viewer: TripViewer)
    -> Result<TripEntry, Error>;

    /// Records a driver opened, newest first.
    async fn driver_trips(&self, driver_id: DriverId) -> Result<Vec<TripEntry>, Error>;

    /// Today's records for a guardian's children.
    async fn parent_trips_today(&self, parent_id: UserId) -> Result<Vec<TripEntry>, Error>;

    /// Every record for a guardian's children, oldest first.
    async fn parent_trip_history(&self, parent_id: UserId) -> Result<Vec<TripEntry>, Error>;
}
