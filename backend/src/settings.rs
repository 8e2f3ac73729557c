//! Server configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `SHUTTLE_*` environment variables, and
//! configuration files. The database URL additionally falls back to the
//! conventional `DATABASE_URL` variable so Diesel tooling and the server share
//! one setting.

use std::net::SocketAddr;
use std::time::Duration;

use mockable::Env;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::inbound::ws::state::Heartbeat;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Configuration problems detected after loading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// Neither `SHUTTLE_DATABASE_URL` nor `DATABASE_URL` was provided.
    #[error("database URL missing: set SHUTTLE_DATABASE_URL or DATABASE_URL")]
    MissingDatabaseUrl,
    /// A database URL was provided but is blank.
    #[error("{name} must not be empty")]
    BlankDatabaseUrl { name: &'static str },
    /// The bind address is not a socket address.
    #[error("invalid bind address {value:?}: {message}")]
    InvalidBindAddr { value: String, message: String },
    /// Heartbeat timings cannot keep a connection alive.
    #[error("WebSocket client timeout must exceed the heartbeat interval")]
    InvalidHeartbeat,
    /// A zero ping interval would make the heartbeat timer spin.
    #[error("WebSocket heartbeat interval must be at least one second")]
    ZeroHeartbeatInterval,
}

/// Settings for the shuttle backend server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SHUTTLE")]
pub struct ServerSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    pub pool_max_size: Option<u32>,
    /// Idle connections the pool keeps warm.
    pub pool_min_idle: Option<u32>,
    /// Apply pending migrations before serving.
    #[ortho_config(default = true)]
    pub run_migrations: bool,
    /// Serve Swagger UI. Defaults to on in debug builds only.
    pub swagger: Option<bool>,
    /// Seconds between WebSocket pings.
    pub ws_heartbeat_secs: Option<u64>,
    /// Seconds of client silence before a WebSocket is closed.
    pub ws_client_timeout_secs: Option<u64>,
}

impl ServerSettings {
    /// Parse the configured bind address, falling back to `0.0.0.0:8080`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidBindAddr`] when the value is not a
    /// socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value
            .parse()
            .map_err(|err: std::net::AddrParseError| SettingsError::InvalidBindAddr {
                value: value.to_owned(),
                message: err.to_string(),
            })
    }

    /// Resolve the database URL from settings, then from `DATABASE_URL`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use mockable::MockEnv;
    /// use shuttle_backend::settings::ServerSettings;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let settings = ServerSettings {
    ///     bind_addr: None,
    ///     database_url: None,
    ///     pool_max_size: None,
    ///     pool_min_idle: None,
    ///     run_migrations: true,
    ///     swagger: None,
    ///     ws_heartbeat_secs: None,
    ///     ws_client_timeout_secs: None,
    /// };
    /// let mut env = MockEnv::new();
    /// env.expect_string()
    ///     .returning(|name| (name == "DATABASE_URL").then(|| "postgres://db/shuttle".to_owned()));
    ///
    /// assert_eq!(settings.database_url(&env)?, "postgres://db/shuttle");
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::MissingDatabaseUrl`] when no source provides a
    /// value and [`SettingsError::BlankDatabaseUrl`] when the chosen value is
    /// blank.
    pub fn database_url<E: Env>(&self, env: &E) -> Result<String, SettingsError> {
        if let Some(value) = self.database_url.as_deref() {
            return non_blank(value, "SHUTTLE_DATABASE_URL");
        }
        match env.string(DATABASE_URL_ENV) {
            Some(value) => non_blank(&value, DATABASE_URL_ENV),
            None => Err(SettingsError::MissingDatabaseUrl),
        }
    }

    /// Maximum pool size, defaulting to ten connections.
    #[must_use]
    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE)
    }

    /// Whether Swagger UI should be mounted.
    #[must_use]
    pub fn swagger_enabled(&self) -> bool {
        self.swagger.unwrap_or(cfg!(debug_assertions))
    }

    /// WebSocket heartbeat timings with defaults for unset values.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::ZeroHeartbeatInterval`] for a zero ping
    /// interval and [`SettingsError::InvalidHeartbeat`] when the client
    /// timeout is not longer than the ping interval.
    pub fn heartbeat(&self) -> Result<Heartbeat, SettingsError> {
        let defaults = Heartbeat::default();
        let heartbeat = Heartbeat {
            interval: self
                .ws_heartbeat_secs
                .map_or(defaults.interval, Duration::from_secs),
            client_timeout: self
                .ws_client_timeout_secs
                .map_or(defaults.client_timeout, Duration::from_secs),
        };
        if heartbeat.interval.is_zero() {
            return Err(SettingsError::ZeroHeartbeatInterval);
        }
        if heartbeat.client_timeout <= heartbeat.interval {
            return Err(SettingsError::InvalidHeartbeat);
        }
        Ok(heartbeat)
    }
}

fn non_blank(value: &str, name: &'static str) -> Result<String, SettingsError> {
    if value.trim().is_empty() {
        return Err(SettingsError::BlankDatabaseUrl { name });
    }
    Ok(value.to_owned())
}
