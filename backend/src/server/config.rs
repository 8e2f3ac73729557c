//! HTTP server configuration object.

use std::net::SocketAddr;

use shuttle_backend::inbound::ws::state::Heartbeat;
use shuttle_backend::outbound::persistence::DbPool;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: DbPool,
    pub(crate) heartbeat: Heartbeat,
    pub(crate) swagger: bool,
}

impl ServerConfig {
    /// Serve the assignment store backed by `db_pool` on `bind_addr`.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, db_pool: DbPool) -> Self {
        Self {
            bind_addr,
            db_pool,
            heartbeat: Heartbeat::default(),
            swagger: false,
        }
    }

    /// Override WebSocket heartbeat timings.
    #[must_use]
    pub fn with_heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Mount Swagger UI at `/docs`.
    #[must_use]
    pub fn with_swagger(mut self, enabled: bool) -> Self {
        self.swagger = enabled;
        self
    }
}
