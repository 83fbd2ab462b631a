//! HTTP inbound adapter exposing the admin refresh and health endpoints.

pub mod admin_refresh;
pub mod error;
pub mod health;
pub mod state;

pub use error::ApiResult;

use actix_web::web;

/// Mount every endpoint. The refresh trigger answers both under `/api/v1`
/// and at the unversioned `/admin/refresh`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    use admin_refresh::{REFRESH_PATH, run_refresh};

    cfg.service(health::health)
        .service(web::scope("/api/v1").route(REFRESH_PATH, web::post().to(run_refresh)))
        .route(REFRESH_PATH, web::post().to(run_refresh));
}
