//! Shared error mapping for the Diesel adapters.
//!
//! Unique violations are told apart by index name so a raced insert can be
//! reported as the exclusivity conflict it represents.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::{debug, warn};

use crate::domain::ports::AssignmentStoreError;

use super::pool::PoolError;

/// Partial unique index keeping one active assignment per student.
pub(crate) const ACTIVE_STUDENT_INDEX: &str = "route_assignments_active_student_idx";

/// Partial unique index keeping one active route claim per driver.
pub(crate) const ACTIVE_DRIVER_CLAIM_INDEX: &str = "driver_route_claims_active_driver_idx";

/// Unique index keeping one trip record per student per service day.
pub(crate) const TRIP_DAY_INDEX: &str = "trip_records_student_day_idx";

/// Exclusivity index reported by a unique violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExclusivityIndex {
    Student,
    DriverClaim,
    StudentTripDay,
}

/// Identify which exclusivity index, if any, `error` violated.
pub(crate) fn violated_exclusivity_index(error: &DieselError) -> Option<ExclusivityIndex> {
    let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) = error else {
        return None;
    };
    let constraint = info.constraint_name().unwrap_or_default();
    let message = info.message();
    if constraint == ACTIVE_STUDENT_INDEX || message.contains(ACTIVE_STUDENT_INDEX) {
        Some(ExclusivityIndex::Student)
    } else if constraint == ACTIVE_DRIVER_CLAIM_INDEX || message.contains(ACTIVE_DRIVER_CLAIM_INDEX)
    {
        Some(ExclusivityIndex::DriverClaim)
    } else if constraint == TRIP_DAY_INDEX || message.contains(TRIP_DAY_INDEX) {
        Some(ExclusivityIndex::StudentTripDay)
    } else {
        None
    }
}

/// Map pool errors to store connection errors.
pub(crate) fn map_pool_error(error: PoolError) -> AssignmentStoreError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            AssignmentStoreError::connection(message)
        }
    }
}

/// Map Diesel errors to store errors.
pub(crate) fn map_diesel_error(error: DieselError) -> AssignmentStoreError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => AssignmentStoreError::not_found("record not found"),
        DieselError::QueryBuilderError(_) => AssignmentStoreError::query("database query error"),
        DieselError::DatabaseError(kind, info) => match kind {
            DatabaseErrorKind::ClosedConnection => {
                AssignmentStoreError::connection("database connection error")
            }
            DatabaseErrorKind::UniqueViolation
            | DatabaseErrorKind::CheckViolation
            | DatabaseErrorKind::NotNullViolation => {
                AssignmentStoreError::constraint_violation(info.message().to_owned())
            }
            DatabaseErrorKind::ForeignKeyViolation => {
                warn!(
                    constraint_name = ?info.constraint_name(),
                    "foreign key violation after reference check"
                );
                AssignmentStoreError::constraint_violation(info.message().to_owned())
            }
            DatabaseErrorKind::SerializationFailure => {
                AssignmentStoreError::query("concurrent update detected")
            }
            _ => AssignmentStoreError::query("database error"),
        },
        DieselError::BrokenTransactionManager | DieselError::AlreadyInTransaction => {
            AssignmentStoreError::query("transaction state error")
        }
        _ => AssignmentStoreError::query("database error"),
    }
}
