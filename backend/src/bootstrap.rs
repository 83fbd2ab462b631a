//! Assembles the production refresh service from settings and a pool.

use std::sync::Arc;

use mockable::DefaultClock;

use crate::domain::PricingRefreshService;
use crate::outbound::bea::BeaRppHttpSource;
use crate::outbound::bls::BlsCpiHttpSource;
use crate::outbound::persistence::{DbPool, DieselPricingStore};
use crate::settings::{RefreshSettings, SettingsError};

/// Refresh service backed by the BLS and BEA APIs and PostgreSQL.
pub type DefaultRefreshService =
    PricingRefreshService<BlsCpiHttpSource, BeaRppHttpSource, DieselPricingStore>;

/// Failures while wiring the refresh service.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Build the refresh service.
///
/// # Errors
///
/// Returns [`BootstrapError`] when a URL or the BEA key is invalid, or when an
/// HTTP client cannot be constructed.
pub fn build_refresh_service(
    settings: &RefreshSettings,
    pool: DbPool,
) -> Result<DefaultRefreshService, BootstrapError> {
    let timeout = settings.http_timeout();
    let cpi_source = BlsCpiHttpSource::new(settings.bls_base_url()?, timeout)?;
    let rpp_source =
        BeaRppHttpSource::new(settings.bea_base_url()?, settings.bea_api_key()?, timeout)?;

    Ok(PricingRefreshService::new(
        Arc::new(cpi_source),
        Arc::new(rpp_source),
        Arc::new(DieselPricingStore::new(pool)),
        Arc::new(DefaultClock),
        settings.refresh_config(),
    ))
}
