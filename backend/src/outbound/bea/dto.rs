//! DTOs for decoding BEA API responses.
//!
//! BEA wraps every payload in `{"BEAAPI": {"Results": ...}}` and reports
//! request errors inside that envelope with a success status, so the error
//! object is decoded alongside the expected results.

use std::fmt;

use serde::Deserialize;

use crate::domain::parse_index_value;
use crate::domain::ports::{LineCode, StateIndexRow, StateIndexSnapshot};

#[derive(Debug, Deserialize)]
pub(super) struct BeaEnvelopeDto<T> {
    #[serde(rename = "BEAAPI")]
    pub(super) beaapi: BeaApiDto<T>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BeaApiDto<T> {
    #[serde(rename = "Results")]
    pub(super) results: Option<T>,
    #[serde(rename = "Error")]
    pub(super) error: Option<BeaErrorDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BeaErrorDto {
    #[serde(rename = "APIErrorCode")]
    pub(super) code: Option<BeaScalarDto>,
    #[serde(rename = "APIErrorDescription")]
    pub(super) description: Option<String>,
}

/// BEA emits some scalars as strings in one response and numbers in another.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(super) enum BeaScalarDto {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for BeaScalarDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct BeaParameterResultsDto {
    #[serde(rename = "ParamValue")]
    pub(super) param_value: Option<Vec<BeaParamValueDto>>,
    #[serde(rename = "Error")]
    pub(super) error: Option<BeaErrorDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BeaParamValueDto {
    #[serde(rename = "Key")]
    pub(super) key: BeaScalarDto,
    #[serde(rename = "Desc", default)]
    pub(super) desc: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct BeaDataResultsDto {
    #[serde(rename = "Data")]
    pub(super) data: Option<Vec<BeaDataRowDto>>,
    #[serde(rename = "Error")]
    pub(super) error: Option<BeaErrorDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BeaDataRowDto {
    #[serde(rename = "GeoName")]
    pub(super) geo_name: String,
    #[serde(rename = "TimePeriod")]
    pub(super) time_period: String,
    #[serde(rename = "DataValue")]
    pub(super) data_value: BeaScalarDto,
}

impl BeaErrorDto {
    fn describe(&self) -> String {
        let description = self.description.as_deref().unwrap_or("unspecified error");
        match &self.code {
            Some(code) => format!("BEA API error {code}: {description}"),
            None => format!("BEA API error: {description}"),
        }
    }
}

impl<T> BeaEnvelopeDto<T> {
    /// Unwrap the results, surfacing envelope-level errors.
    pub(super) fn into_results(self) -> Result<T, String> {
        if let Some(error) = self.beaapi.error {
            return Err(error.describe());
        }
        self.beaapi
            .results
            .ok_or_else(|| "BEA response is missing Results".to_owned())
    }
}

impl BeaParameterResultsDto {
    /// Pick the SARPP all-items line code.
    ///
    /// Prefers the first description mentioning both "all items" and "rpp",
    /// then the first mentioning "all items".
    pub(super) fn into_all_items_line_code(self) -> Result<LineCode, String> {
        if let Some(error) = self.error {
            return Err(error.describe());
        }
        let values = self
            .param_value
            .ok_or_else(|| "BEA Results missing ParamValue list".to_owned())?;

        let describes_all_items = |value: &&BeaParamValueDto| {
            value.desc.to_lowercase().contains("all items")
        };
        let pick = values
            .iter()
            .filter(describes_all_items)
            .find(|value| value.desc.to_lowercase().contains("rpp"))
            .or_else(|| values.iter().find(describes_all_items))
            .ok_or_else(|| "no SARPP line code describes all items".to_owned())?;

        LineCode::new(pick.key.to_string())
            .map_err(|error| format!("all-items line code is unusable: {error}"))
    }
}

impl BeaDataResultsDto {
    /// Keep only the rows of the most recent parseable year.
    pub(super) fn into_latest_snapshot(self) -> Result<StateIndexSnapshot, String> {
        if let Some(error) = self.error {
            return Err(error.describe());
        }
        let rows = self.data.unwrap_or_default();
        if rows.is_empty() {
            return Err("BEA returned no data rows".to_owned());
        }

        let latest_year = rows
            .iter()
            .filter_map(BeaDataRowDto::year)
            .max()
            .ok_or_else(|| "no data row carries a numeric TimePeriod".to_owned())?;

        let rows = rows
            .into_iter()
            .filter(|row| row.year() == Some(latest_year))
            .map(|row| StateIndexRow {
                geo_name: row.geo_name.trim().to_owned(),
                value: parse_index_value(&row.data_value.to_string()),
            })
            .collect();

        Ok(StateIndexSnapshot { latest_year, rows })
    }
}

impl BeaDataRowDto {
    fn year(&self) -> Option<i32> {
        self.time_period.trim().parse().ok()
    }
}
