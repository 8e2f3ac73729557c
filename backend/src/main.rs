//! Backend entry-point: loads settings, prepares the database, and serves the
//! route assignment API, trip WebSockets, and health probes.

mod server;

use std::io;

use actix_web::web;
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use server::{ServerConfig, create_server};
use shuttle_backend::inbound::http::health::HealthState;
use shuttle_backend::outbound::persistence::{DbPool, PoolConfig, run_migrations};
use shuttle_backend::settings::ServerSettings;

/// Application bootstrap.
#[actix_web::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load().map_err(|err| io::Error::other(err.to_string()))?;
    let database_url = settings.database_url(&DefaultEnv::new())?;
    let bind_addr = settings.bind_addr()?;
    let heartbeat = settings.heartbeat()?;

    if settings.run_migrations {
        run_migrations(&database_url).await?;
    } else {
        info!("skipping database migrations");
    }

    let pool_config = PoolConfig::new(database_url)
        .with_max_size(settings.pool_max_size())
        .with_min_idle(settings.pool_min_idle);
    let pool = DbPool::new(pool_config).await?;

    let health_state = web::Data::new(HealthState::new());
    let config = ServerConfig::new(bind_addr, pool)
        .with_heartbeat(heartbeat)
        .with_swagger(settings.swagger_enabled());
    let server = create_server(health_state.clone(), config)?;
    info!(%bind_addr, "shuttle backend listening");

    let outcome = server.await;
    health_state.mark_unhealthy();
    outcome?;
    Ok(())
}
