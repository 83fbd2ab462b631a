//! Driven port for the transactional pricing store.
//!
//! A refresh run opens one [`PricingTransaction`] and threads it through
//! every store operation. Nothing becomes visible to readers until
//! [`PricingTransaction::commit`] succeeds; [`PricingTransaction::rollback`]
//! (or dropping the handle) discards every statement issued through it.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::define_port_error;

/// Kind of macroeconomic index stored in `macro_factors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum FactorType {
    /// National consumer price index.
    Cpi,
}

impl FactorType {
    /// Column value persisted for this factor type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cpi => "CPI",
        }
    }
}

impl fmt::Display for FactorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One index series, identified by factor type and provider series id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MacroSeries {
    pub factor_type: FactorType,
    pub series_id: String,
}

impl MacroSeries {
    /// Series for a CPI identifier.
    pub fn cpi(series_id: impl Into<String>) -> Self {
        Self {
            factor_type: FactorType::Cpi,
            series_id: series_id.into(),
        }
    }
}

impl fmt::Display for MacroSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.factor_type, self.series_id)
    }
}

/// Observation period of a series, ordered by year then period label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorPeriod {
    pub year: i32,
    pub period: String,
}

impl FactorPeriod {
    pub fn new(year: i32, period: impl Into<String>) -> Self {
        Self {
            year,
            period: period.into(),
        }
    }
}

impl fmt::Display for FactorPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.period)
    }
}

/// Value to upsert for one (series, period) row.
#[derive(Debug, Clone, PartialEq)]
pub struct MacroFactorReading {
    pub series: MacroSeries,
    pub period: FactorPeriod,
    pub value: f64,
}

define_port_error! {
    /// Errors raised by the pricing store.
    pub enum PricingStoreError {
        /// A connection could not be checked out or the session broke.
        Connection { message: String } =>
            "pricing store connection failed: {message}",
        /// A statement failed or returned an unexpected shape.
        Query { message: String } =>
            "pricing store query failed: {message}",
    }
}

/// Entry point of the store: opens transactions.
#[async_trait]
pub trait PricingStore: Send + Sync {
    /// Begin a transaction scoped to one refresh run.
    async fn begin(&self) -> Result<Box<dyn PricingTransaction>, PricingStoreError>;
}

/// Statement-level operations available inside one transaction.
#[async_trait]
pub trait PricingTransaction: Send {
    /// Insert or update the reading's row. `is_baseline` is left untouched
    /// on conflict and defaults to `false` on insert.
    async fn upsert_macro_factor(
        &mut self,
        reading: &MacroFactorReading,
    ) -> Result<(), PricingStoreError>;

    /// Period currently flagged as baseline for `series`, if any.
    async fn find_baseline(
        &mut self,
        series: &MacroSeries,
    ) -> Result<Option<FactorPeriod>, PricingStoreError>;

    /// Whether a row exists for `series` at `period`.
    async fn contains_period(
        &mut self,
        series: &MacroSeries,
        period: &FactorPeriod,
    ) -> Result<bool, PricingStoreError>;

    /// Earliest stored period for `series`.
    async fn earliest_period(
        &mut self,
        series: &MacroSeries,
    ) -> Result<Option<FactorPeriod>, PricingStoreError>;

    /// Clear every baseline flag of `series`, returning the affected rows.
    async fn clear_baseline(&mut self, series: &MacroSeries) -> Result<u64, PricingStoreError>;

    /// Flag the row at `period` as baseline. Returns `false` when no row
    /// exists for that period.
    async fn mark_baseline(
        &mut self,
        series: &MacroSeries,
        period: &FactorPeriod,
    ) -> Result<bool, PricingStoreError>;

    /// Overwrite index value and year of the `state` location whose
    /// `state_name` equals `state_name` exactly. Returns `false` when no
    /// location matched.
    async fn update_state_index(
        &mut self,
        state_name: &str,
        index: f64,
        year: i32,
    ) -> Result<bool, PricingStoreError>;

    /// Names of active state locations whose index year is unset or older
    /// than `year`, sorted by name.
    async fn list_stale_states(&mut self, year: i32) -> Result<Vec<String>, PricingStoreError>;

    /// Run the external recompute for every location and service.
    async fn recompute_location_pricing(&mut self) -> Result<(), PricingStoreError>;

    /// Number of rows in `location_pricing`.
    async fn count_location_pricing(&mut self) -> Result<u64, PricingStoreError>;

    /// Commit every statement issued through this transaction.
    async fn commit(self: Box<Self>) -> Result<(), PricingStoreError>;

    /// Discard every statement issued through this transaction.
    async fn rollback(self: Box<Self>) -> Result<(), PricingStoreError>;
}
