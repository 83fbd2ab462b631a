//! Admin endpoint triggering a pricing refresh.

use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::Error;
use crate::domain::ports::RefreshRun;
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Header carrying the shared admin secret.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Path of the refresh trigger, mounted both at the root and under `/api/v1`.
pub const REFRESH_PATH: &str = "/admin/refresh";

/// Response payload for a committed refresh.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponseBody {
    pub ok: bool,
    pub message: String,
    pub stats: RefreshRun,
}

fn authorize(state: &HttpState, request: &HttpRequest) -> Result<(), Error> {
    let Some(expected) = state.admin_key.as_ref() else {
        warn!("admin refresh rejected: no admin key configured");
        return Err(Error::unauthorized("Unauthorized"));
    };
    let presented = request
        .headers()
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    match presented {
        Some(presented) if expected.matches(presented) => Ok(()),
        _ => Err(Error::unauthorized("Unauthorized")),
    }
}

/// Run one refresh and report its summary.
///
/// Overlapping requests are answered with `409 Conflict` instead of
/// queueing behind the running refresh.
pub async fn run_refresh(
    state: web::Data<HttpState>,
    request: HttpRequest,
) -> ApiResult<HttpResponse> {
    authorize(&state, &request)?;
    let Ok(_running) = state.refresh_gate.try_lock() else {
        return Err(Error::conflict("a pricing refresh is already running"));
    };

    let run = state.refresh.run_refresh().await?;
    info!(run_id = %run.run_id, total_estimates = run.total_estimates, "admin refresh completed");

    Ok(HttpResponse::Ok().json(RefreshResponseBody {
        ok: true,
        message: "Pricing data refreshed successfully".to_owned(),
        stats: run,
    }))
}
