//! Domain ports: the edges of the hexagon.
//!
//! Driving ports (`RouteAssignmentCommand`, `RouteAssignmentQuery`,
//! `TripStatusCommand`, `TripStatusQuery`) are what inbound adapters call.
//! Driven ports (`AssignmentStore`, `AssignmentUnitOfWork`,
//! `TripRecordRepository`) are what persistence adapters implement.

mod macros;
pub(crate) use macros::define_port_error;

mod assignment_store;
mod route_assignment_command;
mod route_assignment_query;
mod trip_record_repository;
mod trip_status_command;
mod trip_status_query;

pub use assignment_store::{
    AssignmentStore, AssignmentStoreError, AssignmentUnitOfWork, DirectoryKind,
};
#[cfg(test)]
pub use route_assignment_command::MockRouteAssignmentCommand;
pub use route_assignment_command::{
    AddRouteRequest, DeleteRouteRequest, RouteAssignmentCommand, UpdateRouteRequest,
};
#[cfg(test)]
pub use route_assignment_query::MockRouteAssignmentQuery;
pub use route_assignment_query::{GetRouteRequest, RouteAssignmentQuery};
pub use trip_record_repository::{TripRecordRepository, TripRecordRepositoryError};
#[cfg(test)]
pub use trip_status_command::MockTripStatusCommand;
pub use trip_status_command::{RecordTripRequest, TripStatusCommand, UpdateTripStatusRequest};
#[cfg(test)]
pub use trip_status_query::MockTripStatusQuery;
pub use trip_status_query::{TripStatusQuery, TripViewer};
