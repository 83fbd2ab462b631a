//! Driven port for the national consumer price index source.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::define_port_error;

/// Most recent published CPI observation for one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpiReading {
    /// Series identifier the reading belongs to, e.g. `CUUR0000SA0`.
    pub series_id: String,
    /// Calendar year of the observation.
    pub year: i32,
    /// Period label as published, e.g. `M11`.
    pub period: String,
    /// Index level.
    pub value: f64,
}

define_port_error! {
    /// Errors raised while fetching CPI observations.
    pub enum CpiSourceError {
        /// Transport failure or a non-success HTTP status.
        Unavailable { message: String } =>
            "cpi source unavailable: {message}",
        /// The payload decoded but carried no usable observation.
        InvalidData { message: String } =>
            "cpi source returned invalid data: {message}",
    }
}

/// Port for reading the newest CPI observation of a series.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CpiSource: Send + Sync {
    /// Fetch the newest observation, trusting the provider's own ordering.
    ///
    /// # Errors
    ///
    /// Returns [`CpiSourceError::Unavailable`] when the provider cannot be
    /// reached and [`CpiSourceError::InvalidData`] when it reports no data.
    async fn fetch_latest_cpi(&self, series_id: &str) -> Result<CpiReading, CpiSourceError>;
}
