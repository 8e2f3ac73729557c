//! Domain primitives, ports, and services.
//!
//! Purpose: define strongly typed school-shuttle entities and the consistency
//! rules that bind drivers and students to routes. Nothing here knows about
//! HTTP, WebSockets, or Diesel; adapters reach the domain through [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode: transport-neutral failure envelope.
//! - TraceId / TRACE_ID_HEADER: per-request correlation identifier.
//! - RouteAssignmentService: the route assignment consistency engine.
//! - LocationRelay: fan-out of live driver positions per trip.
//! - TripStatusService: daily per-student trip records.

pub mod error;
pub mod identity;
pub mod ids;
pub mod location_relay;
pub mod ports;
pub mod routes;
pub mod trace_id;
pub mod trips;

pub use self::error::{Error, ErrorCode};
pub use self::identity::{CallerIdentity, IdentityValidationError, Role, USERNAME_MAX, Username};
pub use self::ids::{
    AssignmentId, DriverId, IdentifierError, RouteId, SchoolId, StudentId, TripRecordId, UserId,
};
pub use self::location_relay::{
    LocationRelay, LocationReport, LocationUpdate, LocationValidationError, TripSubscription,
};
pub use self::routes::{
    AssembledRouteView, AssignmentBlock, AuditStamp, DriverRun, ROUTE_NAME_MAX, Route,
    RouteAssignmentError, RouteAssignmentService, RouteHeader, RouteName, RouteSummary,
    RouteValidationError, StudentOrder, StudentPlacement, StudentStop, UNASSIGNED_MESSAGE,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::trips::{
    TripEntry, TripRecord, TripStatus, TripStatusError, TripStatusService, TripValidationError,
};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use shuttle_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
