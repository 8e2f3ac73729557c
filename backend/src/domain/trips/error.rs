//! Failure kinds surfaced by the trip status service.

use chrono::NaiveDate;
use serde_json::json;

use crate::domain::Error;
use crate::domain::ids::{StudentId, TripRecordId};

/// Tagged failure of a trip record write or read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TripStatusError {
    /// The student does not ride an active route bound to the driver.
    #[error("student {student_id} is not on the driver's route")]
    StudentNotOnRoute { student_id: StudentId },
    /// The student already has a record for the service day.
    #[error("student {student_id} already has a trip record for {service_date}")]
    AlreadyRecorded {
        student_id: StudentId,
        service_date: NaiveDate,
    },
    /// No record with this id is visible to the caller.
    #[error("trip {trip_id} not found")]
    TripNotFound { trip_id: TripRecordId },
    /// The repository stopped answering.
    #[error("trip records unavailable: {message}")]
    StoreUnavailable { message: String },
    /// The repository rejected a query for another reason.
    #[error("trip record failure: {message}")]
    StoreFailure { message: String },
}

impl TripStatusError {
    /// Stable machine-readable code carried in error details.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::StudentNotOnRoute { .. } => "student_not_on_route",
            Self::AlreadyRecorded { .. } => "trip_already_recorded",
            Self::TripNotFound { .. } => "trip_not_found",
            Self::StoreUnavailable { .. } => "store_unavailable",
            Self::StoreFailure { .. } => "store_failure",
        }
    }
}

impl From<TripStatusError> for Error {
    fn from(error: TripStatusError) -> Self {
        let code = error.code();
        let message = error.to_string();
        match error {
            TripStatusError::StudentNotOnRoute { student_id } => Self::invalid_request(message)
                .with_details(json!({ "studentId": student_id, "code": code })),
            TripStatusError::AlreadyRecorded {
                student_id,
                service_date,
            } => Self::conflict(message).with_details(json!({
                "studentId": student_id,
                "serviceDate": service_date.to_string(),
                "code": code,
            })),
            TripStatusError::TripNotFound { trip_id } => {
                Self::not_found(message).with_details(json!({ "tripId": trip_id, "code": code }))
            }
            TripStatusError::StoreUnavailable { .. } => {
                Self::service_unavailable(message).with_details(json!({ "code": code }))
            }
            TripStatusError::StoreFailure { .. } => {
                Self::internal(message).with_details(json!({ "code": code }))
            }
        }
    }
}
