//! Reqwest-backed BLS CPI source adapter.
//!
//! This adapter owns transport details only: URL construction, timeout and
//! HTTP error mapping, and JSON decoding into a domain reading.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::dto::BlsResponseDto;
use crate::domain::ports::{CpiReading, CpiSource, CpiSourceError};
use crate::outbound::http_support::{USER_AGENT, status_message, transport_message};

/// Public v2 endpoint root; series paths are appended to it.
pub const DEFAULT_BLS_BASE_URL: &str = "https://api.bls.gov/publicAPI/v2/";

/// CPI source adapter issuing `GET {base}/timeseries/data/{seriesId}`.
pub struct BlsCpiHttpSource {
    client: Client,
    base_url: Url,
}

impl BlsCpiHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    /// ```rust,ignore
    /// let source = BlsCpiHttpSource::new(Url::parse(DEFAULT_BLS_BASE_URL)?, timeout)?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, base_url })
    }

    fn series_url(&self, series_id: &str) -> Result<Url, CpiSourceError> {
        series_url(&self.base_url, series_id)
    }
}

#[async_trait]
impl CpiSource for BlsCpiHttpSource {
    async fn fetch_latest_cpi(&self, series_id: &str) -> Result<CpiReading, CpiSourceError> {
        let url = self.series_url(series_id)?;
        debug!(%url, "requesting BLS series");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| CpiSourceError::unavailable(transport_message(&error)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| CpiSourceError::unavailable(transport_message(&error)))?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        parse_latest_reading(body.as_ref(), series_id)
    }
}

fn series_url(base_url: &Url, series_id: &str) -> Result<Url, CpiSourceError> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|()| {
            CpiSourceError::unavailable(format!("BLS base URL {base_url} cannot take a path"))
        })?
        .pop_if_empty()
        .extend(["timeseries", "data", series_id.trim()]);
    Ok(url)
}

fn parse_latest_reading(body: &[u8], series_id: &str) -> Result<CpiReading, CpiSourceError> {
    let decoded: BlsResponseDto = serde_json::from_slice(body).map_err(|error| {
        CpiSourceError::invalid_data(format!("invalid BLS JSON payload: {error}"))
    })?;
    decoded
        .into_latest_reading(series_id)
        .map_err(CpiSourceError::invalid_data)
}

fn map_status_error(status: StatusCode, body: &[u8]) -> CpiSourceError {
    CpiSourceError::unavailable(format!("BLS {}", status_message(status, body)))
}
