//! Driven port for trip record persistence.
//!
//! Each write is a single statement, so no unit of work is needed. The
//! repository enforces one record per student per service day and reports a
//! second insert as [`TripRecordRepositoryError::DuplicateRecord`].

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::ids::{DriverId, StudentId, TripRecordId, UserId};
use crate::domain::routes::AuditStamp;
use crate::domain::trips::{RouteBinding, TripEntry, TripRecord, TripStatus};

use super::define_port_error;

define_port_error! {
    /// Errors raised by trip record adapters.
    pub enum TripRecordRepositoryError {
        /// Connection could not be obtained or was lost.
        Connection { message: String } => "trip record connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } => "trip record query failed: {message}",
        /// The student already has a record for that service day.
        DuplicateRecord { student_id: StudentId } =>
            "student {student_id} already has a trip record for that day",
    }
}

/// Persistence boundary for trip records.
#[async_trait]
pub trait TripRecordRepository: Send + Sync {
    /// Active route binding between `driver_id` and `student_id`, if any.
    async fn active_binding(
        &self,
        driver_id: &DriverId,
        student_id: &StudentId,
    ) -> Result<Option<RouteBinding>, TripRecordRepositoryError>;

    /// Store a new record.
    async fn insert(&self, record: &TripRecord) -> Result<(), TripRecordRepositoryError>;

    /// Fetch a record with its student.
    async fn find(
        &self,
        trip_id: &TripRecordId,
    ) -> Result<Option<TripEntry>, TripRecordRepositoryError>;

    /// Set the status of a record owned by `driver_id`.
    ///
    /// Returns `false` when no such record exists.
    async fn update_status(
        &self,
        trip_id: &TripRecordId,
        driver_id: &DriverId,
        status: TripStatus,
        updated: &AuditStamp,
    ) -> Result<bool, TripRecordRepositoryError>;

    /// Records opened by a driver, newest first.
    async fn for_driver(
        &self,
        driver_id: &DriverId,
    ) -> Result<Vec<TripEntry>, TripRecordRepositoryError>;

    /// Records of a guardian's children, oldest first.
    ///
    /// `on` narrows the result to one service day.
    async fn for_parent(
        &self,
        parent_id: &UserId,
        on: Option<NaiveDate>,
    ) -> Result<Vec<TripEntry>, TripRecordRepositoryError>;
}
