//! Failure kinds surfaced by the route assignment service.
//!
//! Callers switch on the variant, never on the message text. Every variant
//! means the whole unit of work was rolled back (or never opened), so a retry
//! must re-run the operation from the start.

use serde_json::json;

use crate::domain::Error;
use crate::domain::ids::{DriverId, RouteId, StudentId};
use crate::domain::ports::DirectoryKind;

/// Tagged failure of an add, update, delete, or read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteAssignmentError {
    /// The route name failed validation.
    #[error("invalid route name: {message}")]
    InvalidRouteName { message: String },
    /// The acting username failed validation.
    #[error("invalid actor: {message}")]
    InvalidActor { message: String },
    /// An order token was empty or zero.
    #[error("student {student_id} has invalid order {value:?}")]
    InvalidStudentOrder { student_id: StudentId, value: String },
    /// A driver block carried no students.
    #[error("driver {driver_id} has no students to assign")]
    EmptyStudentList { driver_id: DriverId },
    /// The same driver was listed in more than one block.
    #[error("driver {driver_id} appears in more than one assignment block")]
    DuplicateDriverBlock { driver_id: DriverId },
    /// A referenced driver or student does not exist in the school.
    #[error("{kind} {id} not found")]
    ReferenceNotFound { kind: DirectoryKind, id: uuid::Uuid },
    /// The driver is already bound to another active route.
    #[error("driver {driver_id} is already assigned to a route")]
    DriverAlreadyAssigned { driver_id: DriverId },
    /// The student is already bound to an active route.
    #[error("student {student_id} is already assigned to a route")]
    StudentAlreadyAssigned { student_id: StudentId },
    /// The route does not exist in the caller's school.
    #[error("route {route_id} not found")]
    RouteNotFound { route_id: RouteId },
    /// An assignment row vanished between read and update.
    #[error("assignment for driver {driver_id} and student {student_id} not found")]
    AssignmentNotFound {
        driver_id: DriverId,
        student_id: StudentId,
    },
    /// No unit of work could be opened.
    #[error("failed to start unit of work: {message}")]
    TransactionStartFailed { message: String },
    /// The route row could not be inserted.
    #[error("failed to create route: {message}")]
    RouteCreateFailed { message: String },
    /// The unit of work failed to commit; nothing was applied.
    #[error("failed to commit unit of work: {message}")]
    CommitFailed { message: String },
    /// The store stopped answering mid-operation.
    #[error("assignment store unavailable: {message}")]
    StoreUnavailable { message: String },
    /// The store rejected a query for another reason.
    #[error("assignment store failure: {message}")]
    StoreFailure { message: String },
}

impl RouteAssignmentError {
    /// Stable machine-readable code carried in error details.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRouteName { .. } => "invalid_route_name",
            Self::InvalidActor { .. } => "invalid_actor",
            Self::InvalidStudentOrder { .. } => "invalid_student_order",
            Self::EmptyStudentList { .. } => "empty_student_list",
            Self::DuplicateDriverBlock { .. } => "duplicate_driver_block",
            Self::ReferenceNotFound {
                kind: DirectoryKind::Driver,
                ..
            } => "driver_not_found",
            Self::ReferenceNotFound {
                kind: DirectoryKind::Student,
                ..
            } => "student_not_found",
            Self::DriverAlreadyAssigned { .. } => "driver_already_assigned",
            Self::StudentAlreadyAssigned { .. } => "student_already_assigned",
            Self::RouteNotFound { .. } => "route_not_found",
            Self::AssignmentNotFound { .. } => "assignment_not_found",
            Self::TransactionStartFailed { .. } => "transaction_start_failed",
            Self::RouteCreateFailed { .. } => "route_create_failed",
            Self::CommitFailed { .. } => "commit_failed",
            Self::StoreUnavailable { .. } => "store_unavailable",
            Self::StoreFailure { .. } => "store_failure",
        }
    }

    /// True for business-invariant violations the caller can act on.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DriverAlreadyAssigned { .. } | Self::StudentAlreadyAssigned { .. }
        )
    }
}

impl From<RouteAssignmentError> for Error {
    fn from(error: RouteAssignmentError) -> Self {
        let code = error.code();
        let message = error.to_string();
        match error {
            RouteAssignmentError::InvalidRouteName { .. }
            | RouteAssignmentError::InvalidActor { .. } => {
                Self::invalid_request(message).with_details(json!({ "code": code }))
            }
            RouteAssignmentError::InvalidStudentOrder { student_id, value } => {
                Self::invalid_request(message).with_details(json!({
                    "studentId": student_id,
                    "value": value,
                    "code": code,
                }))
            }
            RouteAssignmentError::EmptyStudentList { driver_id }
            | RouteAssignmentError::DuplicateDriverBlock { driver_id } => {
                Self::invalid_request(message)
                    .with_details(json!({ "driverId": driver_id, "code": code }))
            }
            RouteAssignmentError::ReferenceNotFound { id, .. } => {
                Self::invalid_request(message).with_details(json!({ "id": id, "code": code }))
            }
            RouteAssignmentError::DriverAlreadyAssigned { driver_id } => {
                Self::conflict(message).with_details(json!({ "driverId": driver_id, "code": code }))
            }
            RouteAssignmentError::StudentAlreadyAssigned { student_id } => Self::conflict(message)
                .with_details(json!({ "studentId": student_id, "code": code })),
            RouteAssignmentError::RouteNotFound { route_id } => {
                Self::not_found(message).with_details(json!({ "routeId": route_id, "code": code }))
            }
            RouteAssignmentError::AssignmentNotFound {
                driver_id,
                student_id,
            } => Self::not_found(message).with_details(json!({
                "driverId": driver_id,
                "studentId": student_id,
                "code": code,
            })),
            RouteAssignmentError::TransactionStartFailed { .. }
            | RouteAssignmentError::StoreUnavailable { .. } => {
                Self::service_unavailable(message).with_details(json!({ "code": code }))
            }
            RouteAssignmentError::RouteCreateFailed { .. }
            | RouteAssignmentError::CommitFailed { .. }
            | RouteAssignmentError::StoreFailure { .. } => {
                Self::internal(message).with_details(json!({ "code": code }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(
        RouteAssignmentError::DriverAlreadyAssigned { driver_id: DriverId::random() },
        ErrorCode::Conflict
    )]
    #[case(
        RouteAssignmentError::StudentAlreadyAssigned { student_id: StudentId::random() },
        ErrorCode::Conflict
    )]
    #[case(
        RouteAssignmentError::RouteNotFound { route_id: RouteId::random() },
        ErrorCode::NotFound
    )]
    #[case(
        RouteAssignmentError::InvalidStudentOrder {
            student_id: StudentId::random(),
            value: "0".to_owned(),
        },
        ErrorCode::InvalidRequest
    )]
    #[case(
        RouteAssignmentError::DuplicateDriverBlock { driver_id: DriverId::random() },
        ErrorCode::InvalidRequest
    )]
    #[case(
        RouteAssignmentError::ReferenceNotFound {
            kind: DirectoryKind::Student,
            id: uuid::Uuid::nil(),
        },
        ErrorCode::InvalidRequest
    )]
    #[case(
        RouteAssignmentError::TransactionStartFailed { message: "pool".to_owned() },
        ErrorCode::ServiceUnavailable
    )]
    #[case(
        RouteAssignmentError::CommitFailed { message: "io".to_owned() },
        ErrorCode::InternalError
    )]
    fn maps_to_envelope_codes(#[case] error: RouteAssignmentError, #[case] expected: ErrorCode) {
        let code = error.code();
        let envelope = Error::from(error);
        assert_eq!(envelope.code(), expected);
        let details = envelope.details().expect("details present");
        assert_eq!(details["code"], code);
    }

    #[rstest]
    fn reference_codes_name_the_directory() {
        let driver = RouteAssignmentError::ReferenceNotFound {
            kind: DirectoryKind::Driver,
            id: uuid::Uuid::nil(),
        };
        let student = RouteAssignmentError::ReferenceNotFound {
            kind: DirectoryKind::Student,
            id: uuid::Uuid::nil(),
        };
        assert_eq!(driver.code(), "driver_not_found");
        assert_eq!(student.code(), "student_not_found");
    }

    #[rstest]
    fn only_exclusivity_failures_are_conflicts() {
        assert!(
            RouteAssignmentError::DriverAlreadyAssigned {
                driver_id: DriverId::random()
            }
            .is_conflict()
        );
        assert!(
            !RouteAssignmentError::RouteNotFound {
                route_id: RouteId::random()
            }
            .is_conflict()
        );
    }
}
