//! Driven port for the per-state regional price parity source.
//!
//! Rows are typed at the adapter boundary: the domain never sees raw JSON,
//! only trimmed geographic names and already-parsed index values.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::define_port_error;

/// Identifier of the "all items" line within the regional price table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LineCode(String);

impl LineCode {
    /// Validate and wrap a line code.
    ///
    /// # Examples
    /// ```
    /// use pricing_backend::domain::ports::LineCode;
    ///
    /// let code = LineCode::new(" 1 ").expect("valid line code");
    /// assert_eq!(code.as_str(), "1");
    /// assert!(LineCode::new("   ").is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`LineCodeValidationError::Empty`] for blank input.
    pub fn new(value: impl AsRef<str>) -> Result<Self, LineCodeValidationError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(LineCodeValidationError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the line code as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for LineCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for LineCode {
    type Error = LineCodeValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LineCode> for String {
    fn from(value: LineCode) -> Self {
        value.0
    }
}

/// Validation errors for [`LineCode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineCodeValidationError {
    /// The line code is blank after trimming.
    #[error("line code must not be empty")]
    Empty,
}

/// Year selector forwarded to the provider, e.g. `LAST5` or `2022,2023`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearWindow(String);

impl YearWindow {
    /// Default window requesting the five most recent published years.
    pub const LAST_FIVE: &'static str = "LAST5";

    /// Wrap a provider year selector, falling back to [`Self::LAST_FIVE`]
    /// when the input is blank.
    pub fn new(value: impl AsRef<str>) -> Self {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Self::default();
        }
        Self(trimmed.to_owned())
    }

    /// Borrow the selector.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for YearWindow {
    fn default() -> Self {
        Self(Self::LAST_FIVE.to_owned())
    }
}

/// One state-level regional price parity row for the latest year.
#[derive(Debug, Clone, PartialEq)]
pub struct StateIndexRow {
    /// Geographic name as published, trimmed. May be empty.
    pub geo_name: String,
    /// Parsed index value; `None` when the provider value is not a finite
    /// number (for example `(NA)`).
    pub value: Option<f64>,
}

/// Rows of the single most recent year present in a provider response.
#[derive(Debug, Clone, PartialEq)]
pub struct StateIndexSnapshot {
    /// Maximum year found across the response.
    pub latest_year: i32,
    /// Rows belonging to `latest_year` only.
    pub rows: Vec<StateIndexRow>,
}

define_port_error! {
    /// Errors raised while discovering line codes or fetching RPP values.
    pub enum RppSourceError {
        /// Transport failure or a non-success HTTP status.
        Unavailable { message: String } =>
            "rpp source unavailable: {message}",
        /// The payload was empty, malformed, or lacked a matching line code.
        InvalidData { message: String } =>
            "rpp source returned invalid data: {message}",
    }
}

/// Port for the regional price parity provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RppSource: Send + Sync {
    /// Find the line code whose description denotes the all-items index.
    async fn discover_line_code(&self) -> Result<LineCode, RppSourceError>;

    /// Fetch state-level values for `line_code` and keep the latest year.
    async fn fetch_state_indices(
        &self,
        line_code: &LineCode,
        years: &YearWindow,
    ) -> Result<StateIndexSnapshot, RppSourceError>;
}
