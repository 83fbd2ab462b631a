//! DTOs for decoding BLS time-series responses.
//!
//! The adapter decodes into these transport DTOs first, then maps the
//! newest observation into a domain [`CpiReading`].

use serde::Deserialize;

use crate::domain::ports::CpiReading;

const REQUEST_SUCCEEDED: &str = "REQUEST_SUCCEEDED";

#[derive(Debug, Deserialize)]
pub(super) struct BlsResponseDto {
    pub(super) status: Option<String>,
    #[serde(default)]
    pub(super) message: Vec<String>,
    #[serde(rename = "Results")]
    pub(super) results: Option<BlsResultsDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BlsResultsDto {
    #[serde(default)]
    pub(super) series: Vec<BlsSeriesDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BlsSeriesDto {
    #[serde(default)]
    pub(super) data: Vec<BlsObservationDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BlsObservationDto {
    pub(super) year: String,
    pub(super) period: String,
    pub(super) value: String,
}

impl BlsResponseDto {
    /// Map the first observation of the first series.
    ///
    /// BLS lists observations newest first; no reordering is applied.
    pub(super) fn into_latest_reading(self, series_id: &str) -> Result<CpiReading, String> {
        match self.status.as_deref() {
            Some(REQUEST_SUCCEEDED) | None => {}
            Some(status) => {
                return Err(format!(
                    "request status {status}: {}",
                    self.message.join("; ")
                ));
            }
        }

        let newest = self
            .results
            .and_then(|results| results.series.into_iter().next())
            .and_then(|series| series.data.into_iter().next())
            .ok_or_else(|| "series data is empty".to_owned())?;
        newest.into_reading(series_id)
    }
}

impl BlsObservationDto {
    fn into_reading(self, series_id: &str) -> Result<CpiReading, String> {
        let year = self
            .year
            .trim()
            .parse::<i32>()
            .map_err(|_| format!("non-numeric year {:?}", self.year))?;
        let value = self
            .value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| format!("non-numeric value {:?}", self.value))?;
        let period = self.period.trim();
        if period.is_empty() {
            return Err("observation period is blank".to_owned());
        }

        Ok(CpiReading {
            series_id: series_id.to_owned(),
            year,
            period: period.to_owned(),
            value,
        })
    }
}
