//! Runtime settings loaded via OrthoConfig.
//!
//! Both structs hold optional raw values; accessors apply defaults and parse
//! into domain or adapter types so that a missing setting never panics.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

use crate::domain::ports::{FactorPeriod, LineCode, YearWindow};
use crate::domain::{
    DEFAULT_BASELINE_PERIOD, DEFAULT_BASELINE_YEAR, DEFAULT_CPI_SERIES_ID,
    DEFAULT_MIN_UPDATED_STATES, LineCodeSource, RefreshConfig,
};
use crate::inbound::http::state::AdminApiKey;
use crate::outbound::bea::{BeaApiKey, DEFAULT_BEA_BASE_URL};
use crate::outbound::bls::DEFAULT_BLS_BASE_URL;
use crate::outbound::persistence::PoolConfig;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Errors raised while turning raw settings into typed values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// A URL setting did not parse.
    #[error("invalid {field} {value:?}: {message}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        message: String,
    },
    /// The bind address did not parse as `host:port`.
    #[error("invalid bind address {value:?}: {message}")]
    InvalidBindAddr { value: String, message: String },
    /// A required setting is absent or blank.
    #[error("{0} is not configured")]
    Missing(&'static str),
}

/// Settings for one refresh run and its index sources.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PRICING_REFRESH")]
pub struct RefreshSettings {
    /// CPI series identifier.
    pub cpi_series_id: Option<String>,
    /// Year of the preferred baseline period.
    pub baseline_year: Option<i32>,
    /// Period label of the preferred baseline period.
    pub baseline_period: Option<String>,
    /// Previously discovered SARPP line code; skips discovery when set.
    pub rpp_line_code: Option<String>,
    /// BEA year selector.
    pub rpp_year_window: Option<String>,
    /// Minimum matched states for a run to commit.
    pub min_updated_states: Option<usize>,
    /// BEA `UserID`.
    pub bea_api_key: Option<String>,
    /// BLS API root override.
    pub bls_base_url: Option<String>,
    /// BEA API endpoint override.
    pub bea_base_url: Option<String>,
    /// Per-request timeout for both sources.
    pub http_timeout_secs: Option<u64>,
}

impl fmt::Debug for RefreshSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshSettings")
            .field("cpi_series_id", &self.cpi_series_id)
            .field("baseline_year", &self.baseline_year)
            .field("baseline_period", &self.baseline_period)
            .field("rpp_line_code", &self.rpp_line_code)
            .field("rpp_year_window", &self.rpp_year_window)
            .field("min_updated_states", &self.min_updated_states)
            .field("bea_api_key", &self.bea_api_key.as_ref().map(|_| "<redacted>"))
            .field("bls_base_url", &self.bls_base_url)
            .field("bea_base_url", &self.bea_base_url)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .finish()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_url(
    field: &'static str,
    value: Option<&str>,
    default: &str,
) -> Result<Url, SettingsError> {
    let raw = non_blank(value).unwrap_or(default);
    Url::parse(raw).map_err(|error| SettingsError::InvalidUrl {
        field,
        value: raw.to_owned(),
        message: error.to_string(),
    })
}

impl RefreshSettings {
    /// Return the configured CPI series, falling back to the default.
    pub fn cpi_series_id(&self) -> &str {
        non_blank(self.cpi_series_id.as_deref()).unwrap_or(DEFAULT_CPI_SERIES_ID)
    }

    /// Baseline period used when a series has none yet.
    pub fn baseline_target(&self) -> FactorPeriod {
        FactorPeriod::new(
            self.baseline_year.unwrap_or(DEFAULT_BASELINE_YEAR),
            non_blank(self.baseline_period.as_deref()).unwrap_or(DEFAULT_BASELINE_PERIOD),
        )
    }

    /// Configured line code, or discovery when unset or blank.
    pub fn line_code_source(&self) -> LineCodeSource {
        self.rpp_line_code
            .as_deref()
            .and_then(|value| LineCode::new(value).ok())
            .map_or(LineCodeSource::Discover, LineCodeSource::Configured)
    }

    pub fn rpp_year_window(&self) -> YearWindow {
        self.rpp_year_window
            .as_deref()
            .map(YearWindow::new)
            .unwrap_or_default()
    }

    pub fn min_updated_states(&self) -> usize {
        self.min_updated_states.unwrap_or(DEFAULT_MIN_UPDATED_STATES)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the override does not parse.
    pub fn bls_base_url(&self) -> Result<Url, SettingsError> {
        parse_url("BLS base URL", self.bls_base_url.as_deref(), DEFAULT_BLS_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] when the override does not parse.
    pub fn bea_base_url(&self) -> Result<Url, SettingsError> {
        parse_url("BEA base URL", self.bea_base_url.as_deref(), DEFAULT_BEA_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when no key is configured.
    pub fn bea_api_key(&self) -> Result<BeaApiKey, SettingsError> {
        non_blank(self.bea_api_key.as_deref())
            .map(BeaApiKey::new)
            .ok_or(SettingsError::Missing("PRICING_REFRESH_BEA_API_KEY"))
    }

    /// Run inputs for the refresh service.
    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            cpi_series_id: self.cpi_series_id().to_owned(),
            baseline_target: self.baseline_target(),
            line_code: self.line_code_source(),
            rpp_years: self.rpp_year_window(),
            min_updated_states: self.min_updated_states(),
        }
    }
}

/// Settings for the HTTP server process.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "PRICING_SERVER")]
pub struct ServerSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Shared secret for admin endpoints; admin endpoints reject all
    /// requests when unset.
    pub admin_api_key: Option<String>,
    /// Upper bound of pooled database connections.
    pub db_max_connections: Option<u32>,
    /// Connections kept open while idle.
    pub db_min_idle: Option<u32>,
    /// Seconds to wait for a free connection.
    pub db_checkout_timeout_secs: Option<u64>,
}

impl fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSettings")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("admin_api_key", &self.admin_api_key.as_ref().map(|_| "<redacted>"))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_idle", &self.db_min_idle)
            .field("db_checkout_timeout_secs", &self.db_checkout_timeout_secs)
            .finish()
    }
}

impl ServerSettings {
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidBindAddr`] for malformed addresses.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = non_blank(self.bind_addr.as_deref()).unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|error: std::net::AddrParseError| {
            SettingsError::InvalidBindAddr {
                value: raw.to_owned(),
                message: error.to_string(),
            }
        })
    }

    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when no URL is configured.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        non_blank(self.database_url.as_deref())
            .ok_or(SettingsError::Missing("PRICING_SERVER_DATABASE_URL"))
    }

    /// Pool configuration with any sizing overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Missing`] when no database URL is configured.
    pub fn pool_config(&self) -> Result<PoolConfig, SettingsError> {
        let mut config = PoolConfig::new(self.database_url()?).with_min_idle(self.db_min_idle);
        if let Some(max_size) = self.db_max_connections {
            config = config.with_max_size(max_size);
        }
        if let Some(secs) = self.db_checkout_timeout_secs {
            config = config.with_checkout_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    pub fn admin_key(&self) -> Option<AdminApiKey> {
        self.admin_api_key.clone().and_then(AdminApiKey::new)
    }
}
