//! Driven port for route and route-assignment persistence.
//!
//! The store owns the on-disk shape of routes and assignments. Writes happen
//! only through an [`AssignmentUnitOfWork`], which groups them into one atomic
//! transaction: it is committed or rolled back explicitly, and dropping it
//! before either rolls back. Point checks made through a unit of work observe
//! that unit's own earlier writes. Reads used for assembled views bypass units
//! of work.
//!
//! Adapters carry no business rules. The only exception is the exclusivity
//! backstop: the store must refuse to commit a second active binding for a
//! driver or student, reporting [`AssignmentStoreError::DriverConflict`] or
//! [`AssignmentStoreError::StudentConflict`].

use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::ids::{AssignmentId, DriverId, RouteId, SchoolId, StudentId};
use crate::domain::routes::{
    AssignmentViewRow, AuditStamp, Route, RouteAssignment, RouteChanges, RouteSummary,
};

use super::define_port_error;

/// Directory an assignment references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryKind {
    Driver,
    Student,
}

impl fmt::Display for DirectoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Driver => "driver",
            Self::Student => "student",
        })
    }
}

define_port_error! {
    /// Errors raised by assignment store adapters.
    pub enum AssignmentStoreError {
        /// Connection could not be obtained or was lost.
        Connection { message: String } => "assignment store connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } => "assignment store query failed: {message}",
        /// A required column was missing or a check constraint failed.
        ConstraintViolation { message: String } =>
            "assignment store constraint violated: {message}",
        /// Target row does not exist or is soft-deleted.
        NotFound { message: String } => "record not found: {message}",
        /// Referenced directory entry does not exist in the school.
        ReferenceNotFound { kind: DirectoryKind, id: Uuid } => "{kind} {id} not found",
        /// Driver already holds an active binding to another route.
        DriverConflict { driver_id: DriverId } =>
            "driver {driver_id} is already bound to an active route",
        /// Student already holds an active binding.
        StudentConflict { student_id: StudentId } =>
            "student {student_id} is already bound to an active route",
    }
}

/// Atomic group of store operations.
#[async_trait]
pub trait AssignmentUnitOfWork: Send {
    /// Insert a route and return its identifier.
    async fn insert_route(&mut self, route: &Route) -> Result<RouteId, AssignmentStoreError>;

    /// Insert an assignment after confirming its driver and student exist in
    /// the route's school.
    async fn insert_assignment(
        &mut self,
        assignment: &RouteAssignment,
    ) -> Result<(), AssignmentStoreError>;

    /// Route the driver is actively bound to, if any.
    async fn active_route_for_driver(
        &mut self,
        driver_id: &DriverId,
    ) -> Result<Option<RouteId>, AssignmentStoreError>;

    /// Route the student is actively bound to, if any.
    async fn active_route_for_student(
        &mut self,
        student_id: &StudentId,
    ) -> Result<Option<RouteId>, AssignmentStoreError>;

    /// Whether the driver has any active binding.
    async fn is_driver_assigned(
        &mut self,
        driver_id: &DriverId,
    ) -> Result<bool, AssignmentStoreError> {
        Ok(self.active_route_for_driver(driver_id).await?.is_some())
    }

    /// Whether the student has any active binding.
    async fn is_student_assigned(
        &mut self,
        student_id: &StudentId,
    ) -> Result<bool, AssignmentStoreError> {
        Ok(self.active_route_for_student(student_id).await?.is_some())
    }

    /// Whether an active route exists in the school.
    async fn route_exists(
        &mut self,
        route_id: &RouteId,
        school_id: &SchoolId,
    ) -> Result<bool, AssignmentStoreError>;

    /// Active assignments of one route.
    async fn route_assignments(
        &mut self,
        route_id: &RouteId,
    ) -> Result<Vec<RouteAssignment>, AssignmentStoreError>;

    /// Overwrite a route's name and description.
    async fn update_route(&mut self, changes: &RouteChanges) -> Result<(), AssignmentStoreError>;

    /// Overwrite an assignment's order and updater by identifier.
    async fn update_assignment(
        &mut self,
        assignment: &RouteAssignment,
    ) -> Result<(), AssignmentStoreError>;

    /// Soft-delete a single assignment superseded by an update.
    async fn retire_assignment(
        &mut self,
        assignment_id: &AssignmentId,
        deletion: &AuditStamp,
    ) -> Result<(), AssignmentStoreError>;

    /// Soft-delete a route's assignments, then the route.
    async fn delete_route_cascade(
        &mut self,
        route_id: &RouteId,
        school_id: &SchoolId,
        deletion: &AuditStamp,
    ) -> Result<(), AssignmentStoreError>;

    /// Make every write visible atomically.
    async fn commit(self) -> Result<(), AssignmentStoreError>;

    /// Discard every write.
    async fn rollback(self) -> Result<(), AssignmentStoreError>;
}

/// Persistence boundary for routes and assignments.
#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Unit-of-work type handed out by [`AssignmentStore::begin`].
    type UnitOfWork: AssignmentUnitOfWork;

    /// Open a unit of work.
    async fn begin(&self) -> Result<Self::UnitOfWork, AssignmentStoreError>;

    /// Fetch an active route within a school.
    async fn find_route(
        &self,
        route_id: &RouteId,
        school_id: &SchoolId,
    ) -> Result<Option<Route>, AssignmentStoreError>;

    /// Joined rows for a route, ordered by `student_order` descending.
    ///
    /// `driver` narrows the rows to one driver's run.
    async fn route_rows(
        &self,
        route_id: &RouteId,
        driver: Option<&DriverId>,
    ) -> Result<Vec<AssignmentViewRow>, AssignmentStoreError>;

    /// Active routes of a school, newest first.
    async fn list_routes(
        &self,
        school_id: &SchoolId,
    ) -> Result<Vec<RouteSummary>, AssignmentStoreError>;

    /// Active routes a driver is bound to.
    async fn routes_for_driver(
        &self,
        driver_id: &DriverId,
    ) -> Result<Vec<RouteSummary>, AssignmentStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn reference_errors_name_the_directory() {
        let err = AssignmentStoreError::reference_not_found(DirectoryKind::Student, Uuid::nil());
        assert_eq!(
            err.to_string(),
            "student 00000000-0000-0000-0000-000000000000 not found"
        );
    }

    #[rstest]
    fn conflict_constructors_keep_identifiers() {
        let driver_id = DriverId::random();
        assert_eq!(
            AssignmentStoreError::driver_conflict(driver_id),
            AssignmentStoreError::DriverConflict { driver_id }
        );
    }
}
