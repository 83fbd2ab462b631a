//! Reqwest-backed BEA regional price parity source adapter.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::dto::{BeaDataResultsDto, BeaEnvelopeDto, BeaParameterResultsDto};
use crate::domain::ports::{LineCode, RppSource, RppSourceError, StateIndexSnapshot, YearWindow};
use crate::outbound::http_support::{USER_AGENT, status_message, transport_message};

/// BEA data API endpoint.
pub const DEFAULT_BEA_BASE_URL: &str = "https://apps.bea.gov/api/data/";

const DATASET: &str = "Regional";
const TABLE: &str = "SARPP";

/// BEA `UserID`. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct BeaApiKey(String);

impl BeaApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for BeaApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BeaApiKey(<redacted>)")
    }
}

/// RPP source adapter for the BEA Regional dataset.
pub struct BeaRppHttpSource {
    client: Client,
    endpoint: Url,
    api_key: BeaApiKey,
}

impl BeaRppHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    /// ```rust,ignore
    /// let source = BeaRppHttpSource::new(
    ///     Url::parse(DEFAULT_BEA_BASE_URL)?,
    ///     BeaApiKey::new(key),
    ///     Duration::from_secs(30),
    /// )?;
    /// ```
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Url,
        api_key: BeaApiKey,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T, RppSourceError> {
        debug!(method, "requesting BEA {DATASET} data");
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("UserID", self.api_key.expose()),
                ("method", method),
                ("datasetname", DATASET),
            ])
            .query(params)
            .query(&[("ResultFormat", "JSON")])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|error| RppSourceError::unavailable(transport_message(&error)))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| RppSourceError::unavailable(transport_message(&error)))?;
        if !status.is_success() {
            return Err(map_status_error(method, status, body.as_ref()));
        }

        decode(body.as_ref())
    }
}

#[async_trait]
impl RppSource for BeaRppHttpSource {
    async fn discover_line_code(&self) -> Result<LineCode, RppSourceError> {
        let results: BeaParameterResultsDto = self
            .get(
                "GetParameterValuesFiltered",
                &[("TargetParameter", "LineCode"), ("TableName", TABLE)],
            )
            .await?;
        results
            .into_all_items_line_code()
            .map_err(RppSourceError::invalid_data)
    }

    async fn fetch_state_indices(
        &self,
        line_code: &LineCode,
        years: &YearWindow,
    ) -> Result<StateIndexSnapshot, RppSourceError> {
        let results: BeaDataResultsDto = self
            .get(
                "GetData",
                &[
                    ("TableName", TABLE),
                    ("LineCode", line_code.as_str()),
                    ("GeoFips", "STATE"),
                    ("Year", years.as_str()),
                ],
            )
            .await?;
        results
            .into_latest_snapshot()
            .map_err(RppSourceError::invalid_data)
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, RppSourceError> {
    let envelope: BeaEnvelopeDto<T> = serde_json::from_slice(body).map_err(|error| {
        RppSourceError::invalid_data(format!("invalid BEA JSON payload: {error}"))
    })?;
    envelope.into_results().map_err(RppSourceError::invalid_data)
}

fn map_status_error(method: &str, status: StatusCode, body: &[u8]) -> RppSourceError {
    RppSourceError::unavailable(format!("BEA {method} {}", status_message(status, body)))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network BEA mapping helpers.

    use super::*;
    use crate::domain::ports::StateIndexRow;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn envelope(results: Value) -> Vec<u8> {
        json!({ "BEAAPI": { "Request": {}, "Results": results } })
            .to_string()
            .into_bytes()
    }

    fn discover(body: &[u8]) -> Result<LineCode, RppSourceError> {
        decode::<BeaParameterResultsDto>(body)?
            .into_all_items_line_code()
            .map_err(RppSourceError::invalid_data)
    }

    fn snapshot(body: &[u8]) -> Result<StateIndexSnapshot, RppSourceError> {
        decode::<BeaDataResultsDto>(body)?
            .into_latest_snapshot()
            .map_err(RppSourceError::invalid_data)
    }

    fn data_row(name: &str, year: &str, value: &str) -> Value {
        json!({
            "Code": "SARPP-1",
            "GeoFips": "00000",
            "GeoName": name,
            "TimePeriod": year,
            "CL_UNIT": "Percent",
            "UNIT_MULT": "0",
            "DataValue": value
        })
    }

    #[test]
    fn discovery_prefers_rpp_all_items_description() {
        let body = envelope(json!({ "ParamValue": [
            { "Key": "2", "Desc": "[SARPP] RPPs: Goods" },
            { "Key": "5", "Desc": "[SARPP] Implicit regional price deflator: All items" },
            { "Key": "1", "Desc": "[SARPP] RPPs: All items" }
        ]}));

        assert_eq!(discover(&body).expect("line code").as_str(), "1");
    }

    #[test]
    fn discovery_falls_back_to_any_all_items_description() {
        let body = envelope(json!({ "ParamValue": [
            { "Key": 3, "Desc": "Goods" },
            { "Key": 7, "Desc": "Price deflator: ALL ITEMS" }
        ]}));

        assert_eq!(discover(&body).expect("line code").as_str(), "7");
    }

    #[rstest]
    #[case::no_match(envelope(json!({ "ParamValue": [{ "Key": "2", "Desc": "Goods" }] })))]
    #[case::missing_list(envelope(json!({})))]
    #[case::api_error(envelope(json!({ "Error": {
        "APIErrorCode": "3",
        "APIErrorDescription": "Invalid API UserId"
    }})))]
    #[case::envelope_error(json!({ "BEAAPI": { "Error": {
        "APIErrorCode": 40,
        "APIErrorDescription": "The dataset requested does not exist"
    }}}).to_string().into_bytes())]
    fn discovery_failures_are_invalid_data(#[case] body: Vec<u8>) {
        let error = discover(&body).expect_err("no line code");
        assert!(
            matches!(error, RppSourceError::InvalidData { .. }),
            "unexpected error: {error}"
        );
    }

    #[test]
    fn snapshot_keeps_only_latest_year_and_types_values() {
        let body = envelope(json!({ "Data": [
            data_row("California", "2022", "110.1"),
            data_row(" California ", "2023", "112.6"),
            data_row("New York", "2023", "1,108.4"),
            data_row("Guam", "2023", "(NA)"),
            data_row("Annual", "Total", "99.0")
        ]}));

        let snapshot = snapshot(&body).expect("snapshot");

        assert_eq!(snapshot.latest_year, 2023);
        assert_eq!(
            snapshot.rows,
            vec![
                StateIndexRow {
                    geo_name: "California".to_owned(),
                    value: Some(112.6),
                },
                StateIndexRow {
                    geo_name: "New York".to_owned(),
                    value: Some(1108.4),
                },
                StateIndexRow {
                    geo_name: "Guam".to_owned(),
                    value: None,
                },
            ]
        );
    }

    #[test]
    fn numeric_data_values_are_accepted() {
        let body = envelope(json!({ "Data": [
            { "GeoName": "Texas", "TimePeriod": "2023", "DataValue": 97.1 }
        ]}));

        let snapshot = snapshot(&body).expect("snapshot");

        assert_eq!(snapshot.rows[0].value, Some(97.1));
    }

    #[rstest]
    #[case::empty(envelope(json!({ "Data": [] })))]
    #[case::missing(envelope(json!({})))]
    #[case::no_year(envelope(json!({ "Data": [data_row("Texas", "n/a", "97.1")] })))]
    #[case::missing_field(envelope(json!({ "Data": [{ "GeoName": "Texas" }] })))]
    fn snapshot_failures_are_invalid_data(#[case] body: Vec<u8>) {
        let error = snapshot(&body).expect_err("invalid snapshot");
        assert!(
            matches!(error, RppSourceError::InvalidData { .. }),
            "unexpected error: {error}"
        );
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = BeaApiKey::new("secret-user-id");
        assert_eq!(format!("{key:?}"), "BeaApiKey(<redacted>)");
    }

    #[test]
    fn non_success_status_is_unavailable() {
        let error = map_status_error("GetData", StatusCode::BAD_GATEWAY, b"");
        assert_eq!(error, RppSourceError::unavailable("BEA GetData status 502"));
    }
}
