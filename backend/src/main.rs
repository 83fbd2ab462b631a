//! Backend entry-point: serves the admin refresh endpoint and health check.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

mod server;

use std::ffi::OsString;
use std::io;
use std::sync::Arc;

use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use pricing_backend::bootstrap::build_refresh_service;
use pricing_backend::outbound::persistence::DbPool;
use pricing_backend::settings::{RefreshSettings, ServerSettings};
use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let server_settings = ServerSettings::load_from_iter([OsString::from("pricing-backend")])
        .map_err(|e| io::Error::other(format!("load server settings: {e}")))?;
    let refresh_settings = RefreshSettings::load_from_iter([OsString::from("pricing-backend")])
        .map_err(|e| io::Error::other(format!("load refresh settings: {e}")))?;

    let bind_addr = server_settings
        .bind_addr()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let pool_config = server_settings
        .pool_config()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let pool = DbPool::new(pool_config)
        .await
        .map_err(|e| io::Error::other(format!("create database pool: {e}")))?;

    let service = build_refresh_service(&refresh_settings, pool)
        .map_err(|e| io::Error::other(format!("build refresh service: {e}")))?;

    let admin_key = server_settings.admin_key();
    if admin_key.is_none() {
        warn!("PRICING_SERVER_ADMIN_API_KEY is not set; admin endpoints will reject every request");
    }

    info!(%bind_addr, "starting pricing backend");
    let server = create_server(ServerConfig::new(bind_addr, Arc::new(service), admin_key))?;
    server.await
}
