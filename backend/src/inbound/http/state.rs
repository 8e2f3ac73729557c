//! Shared HTTP adapter state.
//!
//! Handlers receive this via `web::Data` and depend only on the driving
//! ports, so they can be exercised against mocks without any I/O.

use std::sync::Arc;

use crate::domain::ports::{
    RouteAssignmentCommand, RouteAssignmentQuery, TripStatusCommand, TripStatusQuery,
};

/// Parameter object bundling the port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub routes: Arc<dyn RouteAssignmentCommand>,
    pub routes_query: Arc<dyn RouteAssignmentQuery>,
    pub trips: Arc<dyn TripStatusCommand>,
    pub trips_query: Arc<dyn TripStatusQuery>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub routes: Arc<dyn RouteAssignmentCommand>,
    pub routes_query: Arc<dyn RouteAssignmentQuery>,
    pub trips: Arc<dyn TripStatusCommand>,
    pub trips_query: Arc<dyn TripStatusQuery>,
}

impl HttpState {
    /// Construct state from the bundled ports.
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            routes,
            routes_query,
            trips,
            trips_query,
        } = ports;
        Self {
            routes,
            routes_query,
            trips,
            trips_query,
        }
    }
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}
