//! Driving port for one pricing refresh run.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CpiReading, LineCode, define_port_error};

/// External provider an index was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexProvider {
    /// Consumer price index time series.
    Cpi,
    /// Regional price parities.
    Rpp,
}

impl fmt::Display for IndexProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cpi => "CPI",
            Self::Rpp => "RPP",
        })
    }
}

define_port_error! {
    /// Terminal failures of a refresh run. None are retried.
    pub enum RefreshError {
        /// An index provider could not be reached or answered non-success.
        SourceUnavailable { provider: IndexProvider, message: String } =>
            "{provider} source unavailable: {message}",
        /// An index provider answered with an empty or malformed payload.
        SourceDataInvalid { provider: IndexProvider, message: String } =>
            "{provider} source returned invalid data: {message}",
        /// Too few state locations matched the regional index rows.
        IncompleteSourceData { updated: usize, required: usize } =>
            "only {updated} state locations matched regional price parities; at least {required} are required",
        /// A store statement, commit, or connection checkout failed.
        Persistence { message: String } =>
            "pricing store failure: {message}",
    }
}

/// Baseline assignment observed during the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineSummary {
    pub year: i32,
    pub period: String,
    /// `true` when this run established the baseline.
    pub established: bool,
}

/// Regional index data applied during the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RppSummary {
    pub year: i32,
    pub line_code: LineCode,
    /// Source rows received for `year`.
    pub state_count: usize,
}

/// Summary of one committed refresh run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRun {
    pub run_id: Uuid,
    pub cpi: CpiReading,
    pub baseline: BaselineSummary,
    pub rpp: RppSummary,
    /// State locations whose index was overwritten.
    pub updated_states: usize,
    /// Source names that matched no state location.
    pub unmatched: Vec<String>,
    /// Source rows ignored for a blank name or non-numeric value.
    pub skipped_rows: usize,
    /// Active states still carrying an index older than `rpp.year`.
    pub stale_states: Vec<String>,
    /// Rows in `location_pricing` after the recompute.
    pub total_estimates: u64,
    pub completed_at: DateTime<Utc>,
    pub execution_time_ms: u64,
}

/// Use case invoked by the admin endpoint and the CLI.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PricingRefreshCommand: Send + Sync {
    /// Re-synchronise indices and recompute estimates in one transaction.
    async fn run_refresh(&self) -> Result<RefreshRun, RefreshError>;
}
