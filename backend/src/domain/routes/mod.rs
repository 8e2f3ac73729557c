//! Routes, route assignments, and the service keeping them consistent.
//!
//! A route is a named, school-scoped shuttle run. Each assignment binds one
//! driver and one student (with a pickup order) to a route. Two invariants
//! hold across all routes: a driver is bound to at most one active route and
//! a student to at most one active assignment.

mod error;
mod model;
mod service;
mod view;

pub use error::RouteAssignmentError;
pub use model::{
    AssignmentBlock, AssignmentViewRow, AuditStamp, DriverProfile, ROUTE_NAME_MAX, Route,
    RouteAssignment, RouteChanges, RouteName, RouteSummary, RouteValidationError, StudentOrder,
    StudentPlacement, StudentProfile,
};
pub use service::RouteAssignmentService;
pub use view::{AssembledRouteView, DriverRun, RouteHeader, StudentStop, UNASSIGNED_MESSAGE};
