//! Tests for HTTP error mapping.

use super::*;
use crate::domain::ports::{IndexProvider, RefreshError};
use actix_web::body::to_bytes;
use rstest::rstest;
use serde_json::{Value, json};

async fn response_json(error: &Error) -> (StatusCode, Value) {
    let response = ResponseError::error_response(error);
    let status = response.status();
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    let body = serde_json::from_slice(&bytes).expect("error JSON deserialisation succeeds");
    (status, body)
}

#[rstest]
#[case::unauthorized(Error::unauthorized("no key"), StatusCode::UNAUTHORIZED)]
#[case::conflict(Error::conflict("busy"), StatusCode::CONFLICT)]
#[case::unavailable(Error::service_unavailable("down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case::upstream(Error::invalid_upstream_data("garbled"), StatusCode::BAD_GATEWAY)]
#[case::internal(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] expected: StatusCode) {
    assert_eq!(ResponseError::status_code(&error), expected);
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted() {
    let error = Error::from(RefreshError::persistence(
        "update state index: relation \"locations\" does not exist",
    ));

    let (status, body) = response_json(&error).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({ "code": "internal_error", "message": "Internal server error" })
    );
}

#[rstest]
#[actix_web::test]
async fn incomplete_source_data_keeps_counts_in_details() {
    let error = Error::from(RefreshError::incomplete_source_data(30_usize, 45_usize));

    let (status, body) = response_json(&error).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "invalid_upstream_data");
    assert_eq!(body["details"], json!({ "updatedStates": 30, "requiredStates": 45 }));
}

#[rstest]
#[actix_web::test]
async fn unavailable_source_names_the_provider() {
    let error = Error::from(RefreshError::source_unavailable(
        IndexProvider::Rpp,
        "status 503",
    ));

    let (status, body) = response_json(&error).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["details"], json!({ "provider": "RPP" }));
}
