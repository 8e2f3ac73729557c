//! Driving port for route reads.

use async_trait::async_trait;

use crate::domain::Error;
use crate::domain::ids::{DriverId, RouteId, SchoolId};
use crate::domain::routes::{AssembledRouteView, RouteSummary};

/// Fetch one route's assembled view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetRouteRequest {
    pub route_id: RouteId,
    pub school_id: SchoolId,
    /// When set, only this driver's run is returned.
    pub caller_driver_id: Option<DriverId>,
}

/// Route read use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteAssignmentQuery: Send + Sync {
    /// Assemble a route with its drivers and ordered students.
    async fn get_route(&self, request: GetRouteRequest) -> Result<AssembledRouteView, Error>;

    /// List a school's active routes.
    async fn list_routes(&self, school_id: SchoolId) -> Result<Vec<RouteSummary>, Error>;

    /// List the active routes a driver is bound to.
    async fn list_routes_for_driver(&self, driver_id: DriverId)
    -> Result<Vec<RouteSummary>, Error>;
}
