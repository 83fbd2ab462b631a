//! Server construction.

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{App, HttpServer, web};

use pricing_backend::domain::ports::PricingRefreshCommand;
use pricing_backend::inbound::http::configure;
use pricing_backend::inbound::http::state::{AdminApiKey, HttpState};

/// Everything the HTTP server needs besides the actix runtime.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) refresh: Arc<dyn PricingRefreshCommand>,
    pub(crate) admin_key: Option<AdminApiKey>,
}

impl ServerConfig {
    #[must_use]
    pub fn new(
        bind_addr: SocketAddr,
        refresh: Arc<dyn PricingRefreshCommand>,
        admin_key: Option<AdminApiKey>,
    ) -> Self {
        Self {
            bind_addr,
            refresh,
            admin_key,
        }
    }
}

/// Bind the listener and return the running server.
///
/// The refresh gate lives in the shared [`HttpState`], so every worker
/// observes the same in-flight run.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(config: ServerConfig) -> std::io::Result<Server> {
    let ServerConfig {
        bind_addr,
        refresh,
        admin_key,
    } = config;
    let http_state = web::Data::new(HttpState::new(refresh, admin_key));

    let server = HttpServer::new(move || {
        App::new()
            .app_data(http_state.clone())
            .configure(configure)
    })
    .bind(bind_addr)?
    .run();

    Ok(server)
}
