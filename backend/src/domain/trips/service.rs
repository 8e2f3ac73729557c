//! Trip status service: opens, advances, and reads daily trip records.
//!
//! A record may only be opened by a driver for a student riding that
//! driver's active route in the driver's school. The service day is the UTC
//! date at the moment the record is opened.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::Error;
use crate::domain::ids::{DriverId, TripRecordId, UserId};
use crate::domain::ports::{
    RecordTripRequest, TripRecordRepository, TripRecordRepositoryError, TripStatusCommand,
    TripStatusQuery, TripViewer, UpdateTripStatusRequest,
};
use crate::domain::routes::AuditStamp;

use super::error::TripStatusError;
use super::model::{TripEntry, TripRecord};

/// Domain service implementing the trip status ports.
#[derive(Clone)]
pub struct TripStatusService<R> {
    repository: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> TripStatusService<R> {
    /// Create a service over `repository`, dating records from `clock`.
    pub fn new(repository: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }
}

impl<R> TripStatusService<R>
where
    R: TripRecordRepository,
{
    /// Open today's record for a student on the driver's route.
    ///
    /// # Errors
    /// [`TripStatusError::StudentNotOnRoute`] when the driver holds no active
    /// binding for the student in their school, and
    /// [`TripStatusError::AlreadyRecorded`] when today's record exists.
    pub async fn record(
        &self,
        request: &RecordTripRequest,
    ) -> Result<TripRecordId, TripStatusError> {
        let binding = self
            .repository
            .active_binding(&request.driver_id, &request.student_id)
            .await
            .map_err(repository_failure)?
            .filter(|binding| binding.school_id == request.school_id)
            .ok_or(TripStatusError::StudentNotOnRoute {
                student_id: request.student_id,
            })?;

        let now = self.clock.utc();
        let record = TripRecord {
            id: TripRecordId::random(),
            school_id: binding.school_id,
            route_id: binding.route_id,
            driver_id: request.driver_id,
            student_id: request.student_id,
            service_date: now.date_naive(),
            status: request.status.unwrap_or_default(),
            created: AuditStamp::new(now, request.actor.clone()),
            updated: None,
        };
        self.repository
            .insert(&record)
            .await
            .map_err(|error| match error {
                TripRecordRepositoryError::DuplicateRecord { student_id } => {
                    TripStatusError::AlreadyRecorded {
                        student_id,
                        service_date: record.service_date,
                    }
                }
                other => repository_failure(other),
            })?;

        info!(
            trip_id = %record.id,
            route_id = %record.route_id,
            student_id = %record.student_id,
            status = %record.status,
            actor = %request.actor,
            "trip recorded"
        );
        Ok(record.id)
    }

    /// Move one of the driver's records to a new status.
    ///
    /// Any status may follow any other so a driver can correct a mistap.
    ///
    /// # Errors
    /// [`TripStatusError::TripNotFound`] when the record does not exist or
    /// belongs to another driver.
    pub async fn update_status(
        &self,
        request: &UpdateTripStatusRequest,
    ) -> Result<(), TripStatusError> {
        let stamp = AuditStamp::new(self.clock.utc(), request.actor.clone());
        let updated = self
            .repository
            .update_status(&request.trip_id, &request.driver_id, request.status, &stamp)
            .await
            .map_err(repository_failure)?;
        if !updated {
            return Err(TripStatusError::TripNotFound {
                trip_id: request.trip_id,
            });
        }

        info!(
            trip_id = %request.trip_id,
            status = %request.status,
            actor = %request.actor,
            "trip status updated"
        );
        Ok(())
    }

    /// One record, hidden unless `viewer` opened it or guards its student.
    ///
    /// # Errors
    /// [`TripStatusError::TripNotFound`] when absent or not visible.
    pub async fn trip(
        &self,
        trip_id: TripRecordId,
        viewer: TripViewer,
    ) -> Result<TripEntry, TripStatusError> {
        let entry = self
            .repository
            .find(&trip_id)
            .await
            .map_err(repository_failure)?
            .filter(|entry| visible_to(entry, viewer))
            .ok_or(TripStatusError::TripNotFound { trip_id })?;
        Ok(entry)
    }

    /// Records a driver opened, newest first.
    ///
    /// # Errors
    /// Repository failures only.
    pub async fn trips_for_driver(
        &self,
        driver_id: &DriverId,
    ) -> Result<Vec<TripEntry>, TripStatusError> {
        let entries = self
            .repository
            .for_driver(driver_id)
            .await
            .map_err(repository_failure)?;
        debug!(%driver_id, trips = entries.len(), "driver trips read");
        Ok(entries)
    }

    /// Today's records for a guardian's children.
    ///
    /// # Errors
    /// Repository failures only.
    pub async fn parent_today(&self, parent_id: &UserId) -> Result<Vec<TripEntry>, TripStatusError> {
        let today = self.clock.utc().date_naive();
        self.repository
            .for_parent(parent_id, Some(today))
            .await
            .map_err(repository_failure)
    }

    /// Every record for a guardian's children, oldest first.
    ///
    /// # Errors
    /// Repository failures only.
    pub async fn parent_history(
        &self,
        parent_id: &UserId,
    ) -> Result<Vec<TripEntry>, TripStatusError> {
        self.repository
            .for_parent(parent_id, None)
            .await
            .map_err(repository_failure)
    }
}

fn visible_to(entry: &TripEntry, viewer: TripViewer) -> bool {
    match viewer {
        TripViewer::Driver(driver_id) => entry.record.driver_id == driver_id,
        TripViewer::Parent(parent_id) => entry.parent_id == Some(parent_id),
    }
}

fn repository_failure(error: TripRecordRepositoryError) -> TripStatusError {
    warn!(%error, "trip record repository failed");
    match error {
        TripRecordRepositoryError::Connection { message } => {
            TripStatusError::StoreUnavailable { message }
        }
        TripRecordRepositoryError::Query { message } => TripStatusError::StoreFailure { message },
        TripRecordRepositoryError::DuplicateRecord { student_id } => {
            TripStatusError::StoreFailure {
                message: format!("unexpected duplicate record for student {student_id}"),
            }
        }
    }
}

#[async_trait]
impl<R> TripStatusCommand for TripStatusService<R>
where
    R: TripRecordRepository,
{
    async fn record_trip(&self, request: RecordTripRequest) -> Result<TripRecordId, Error> {
        self.record(&request).await.map_err(Error::from)
    }

    async fn update_trip_status(&self, request: UpdateTripStatusRequest) -> Result<(), Error> {
        self.update_status(&request).await.map_err(Error::from)
    }
}

#[async_trait]
impl<R> TripStatusQuery for TripStatusService<R>
where
    R: TripRecordRepository,
{
    async fn get_trip(
        &self,
        trip_id: TripRecordId,
        viewer: TripViewer,
    ) -> Result<TripEntry, Error> {
        self.trip(trip_id, viewer).await.map_err(Error::from)
    }

    async fn driver_trips(&self, driver_id: DriverId) -> Result<Vec<TripEntry>, Error> {
        self.trips_for_driver(&driver_id).await.map_err(Error::from)
    }

    async fn parent_trips_today(&self, parent_id: UserId) -> Result<Vec<TripEntry>, Error> {
        self.parent_today(&parent_id).await.map_err(Error::from)
    }

    async fn parent_trip_history(&self, parent_id: UserId) -> Result<Vec<TripEntry>, Error> {
        self.parent_history(&parent_id).await.map_err(Error::from)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
