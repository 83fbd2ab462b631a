//! Domain-level error types.
//!
//! These errors are transport agnostic. Inbound adapters map them to HTTP
//! responses or process exit codes.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::ports::RefreshError;

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Authentication failed or is missing.
    Unauthorized,
    /// The operation conflicts with one already in progress.
    Conflict,
    /// A dependency could not be reached.
    ServiceUnavailable,
    /// A dependency answered with unusable data.
    InvalidUpstreamData,
    /// An unexpected error occurred inside the domain.
    InternalError,
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` must be non-empty once trimmed of whitespace.
///
/// # Examples
/// ```
/// use pricing_backend::domain::{Error, ErrorCode};
///
/// let err = Error::conflict("refresh already running");
/// assert_eq!(err.code(), ErrorCode::Conflict);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(try_from = "ErrorDto", into = "ErrorDto")]
pub struct Error {
    code: ErrorCode,
    message: String,
    details: Option<Value>,
}

/// Validation errors emitted by the constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorValidationError {
    #[error("error message must not be empty")]
    EmptyMessage,
}

impl Error {
    /// Create a new error, falling back to a generic message when the
    /// supplied one is blank.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::try_new(code, message).unwrap_or_else(|_| Self {
            code,
            message: "unspecified error".to_owned(),
            details: None,
        })
    }

    /// Fallible constructor that validates the message content.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorValidationError::EmptyMessage`] for blank messages.
    pub fn try_new(
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Result<Self, ErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(ErrorValidationError::EmptyMessage);
        }
        Ok(Self {
            code,
            message,
            details: None,
        })
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach structured details to the error.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn invalid_upstream_data(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidUpstreamData, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

impl From<RefreshError> for Error {
    fn from(value: RefreshError) -> Self {
        let message = value.to_string();
        match value {
            RefreshError::SourceUnavailable { provider, .. } => {
                Self::service_unavailable(message).with_details(json!({ "provider": provider }))
            }
            RefreshError::SourceDataInvalid { provider, .. } => {
                Self::invalid_upstream_data(message).with_details(json!({ "provider": provider }))
            }
            RefreshError::IncompleteSourceData { updated, required } => {
                Self::invalid_upstream_data(message).with_details(json!({
                    "updatedStates": updated,
                    "requiredStates": required,
                }))
            }
            RefreshError::Persistence { .. } => Self::internal(message),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl From<Error> for ErrorDto {
    fn from(value: Error) -> Self {
        Self {
            code: value.code,
            message: value.message,
            details: value.details,
        }
    }
}

impl TryFrom<ErrorDto> for Error {
    type Error = ErrorValidationError;

    fn try_from(value: ErrorDto) -> Result<Self, Self::Error> {
        let ErrorDto {
            code,
            message,
            details,
        } = value;

        let mut error = Self::try_new(code, message)?;
        error.details = details;
        Ok(error)
    }
}

#[cfg(test)]
mod tests {
    //! Serialisation and refresh-error mapping coverage.

    use super::*;
    use crate::domain::ports::IndexProvider;
    use rstest::rstest;

    #[rstest]
    fn try_new_rejects_blank_messages() {
        let result = Error::try_new(ErrorCode::Conflict, "   ");
        assert_eq!(result, Err(ErrorValidationError::EmptyMessage));
    }

    #[rstest]
    fn serialises_with_snake_case_code_and_omits_missing_details() {
        let value = serde_json::to_value(Error::conflict("busy")).expect("serialise");
        assert_eq!(value, json!({ "code": "conflict", "message": "busy" }));
    }

    #[rstest]
    fn deserialising_blank_message_fails() {
        let result = serde_json::from_value::<Error>(json!({
            "code": "internal_error",
            "message": " "
        }));
        assert!(result.is_err());
    }

    #[rstest]
    #[case::unavailable(
        RefreshError::source_unavailable(IndexProvider::Cpi, "status 503"),
        ErrorCode::ServiceUnavailable
    )]
    #[case::invalid(
        RefreshError::source_data_invalid(IndexProvider::Rpp, "no rows"),
        ErrorCode::InvalidUpstreamData
    )]
    #[case::incomplete(
        RefreshError::incomplete_source_data(30_usize, 45_usize),
        ErrorCode::InvalidUpstreamData
    )]
    #[case::persistence(RefreshError::persistence("commit failed"), ErrorCode::InternalError)]
    fn refresh_errors_map_to_codes(#[case] error: RefreshError, #[case] expected: ErrorCode) {
        assert_eq!(Error::from(error).code(), expected);
    }

    #[rstest]
    fn incomplete_source_data_carries_counts() {
        let error = Error::from(RefreshError::incomplete_source_data(30_usize, 45_usize));
        assert_eq!(
            error.details(),
            Some(&json!({ "updatedStates": 30, "requiredStates": 45 }))
        );
        assert!(error.message().contains("only 30 state locations"));
    }
}
