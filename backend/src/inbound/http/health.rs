//! Liveness check.

use actix_web::{HttpResponse, get};
use serde_json::json;

/// Report that the process is serving requests.
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "ok": true }))
}
