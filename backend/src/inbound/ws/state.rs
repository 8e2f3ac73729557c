//! Shared WebSocket adapter state.

use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;

use crate::domain::LocationRelay;
use crate::domain::ports::RouteAssignmentQuery;

/// Heartbeat timings for trip connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    /// Time between server pings.
    pub interval: Duration,
    /// Idle time after which the connection is closed.
    pub client_timeout: Duration,
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            client_timeout: Duration::from_secs(10),
        }
    }
}

/// Dependency bundle for the trip WebSocket.
#[derive(Clone)]
pub struct WsState {
    pub relay: Arc<LocationRelay>,
    pub routes_query: Arc<dyn RouteAssignmentQuery>,
    pub clock: Arc<dyn Clock>,
    pub heartbeat: Heartbeat,
}

impl WsState {
    /// Construct state with the default heartbeat.
    pub fn new(
        relay: Arc<LocationRelay>,
        routes_query: Arc<dyn RouteAssignmentQuery>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            relay,
            routes_query,
            clock,
            heartbeat: Heartbeat::default(),
        }
    }

    /// Override heartbeat timings.
    #[must_use]
    pub fn with_heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = heartbeat;
        self
    }
}
