//! Pricing refresh orchestration service.
//!
//! One run walks `Idle → FetchingCpi → FetchingRpp → Synchronizing →
//! Recomputing` inside a single store transaction and ends `Committed` or
//! `RolledBack`. Any failure after the transaction opens rolls back every
//! statement of the run and is returned to the caller unchanged.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use mockable::Clock;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::domain::location_index::{self, DEFAULT_MIN_UPDATED_STATES, SyncReport};
use crate::domain::macro_factors::{self, BaselineOutcome};
use crate::domain::pricing_recompute;
use crate::domain::ports::{
    BaselineSummary, CpiReading, CpiSource, CpiSourceError, FactorPeriod, IndexProvider,
    LineCode, MacroFactorReading, MacroSeries, PricingRefreshCommand, PricingStore,
    PricingStoreError, PricingTransaction, RefreshError, RefreshRun, RppSource, RppSourceError,
    RppSummary, StateIndexSnapshot, YearWindow,
};

/// Default CPI-U all items, US city average, not seasonally adjusted.
pub const DEFAULT_CPI_SERIES_ID: &str = "CUUR0000SA0";
/// Default baseline year when no baseline exists yet.
pub const DEFAULT_BASELINE_YEAR: i32 = 2024;
/// Default baseline period when no baseline exists yet.
pub const DEFAULT_BASELINE_PERIOD: &str = "M01";

/// Stage of a refresh run, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStage {
    Idle,
    FetchingCpi,
    FetchingRpp,
    Synchronizing,
    Recomputing,
    Committed,
    RolledBack,
}

impl fmt::Display for RefreshStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::FetchingCpi => "fetching_cpi",
            Self::FetchingRpp => "fetching_rpp",
            Self::Synchronizing => "synchronizing",
            Self::Recomputing => "recomputing",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        })
    }
}

/// Where the regional line code comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCodeSource {
    /// Previously discovered code supplied by configuration; not re-validated.
    Configured(LineCode),
    /// Ask the provider on every run.
    Discover,
}

/// Inputs of a run that come from configuration rather than the sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    pub cpi_series_id: String,
    pub baseline_target: FactorPeriod,
    pub line_code: LineCodeSource,
    pub rpp_years: YearWindow,
    pub min_updated_states: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            cpi_series_id: DEFAULT_CPI_SERIES_ID.to_owned(),
            baseline_target: FactorPeriod::new(DEFAULT_BASELINE_YEAR, DEFAULT_BASELINE_PERIOD),
            line_code: LineCodeSource::Discover,
            rpp_years: YearWindow::default(),
            min_updated_states: DEFAULT_MIN_UPDATED_STATES,
        }
    }
}

/// Domain service implementing [`PricingRefreshCommand`].
#[derive(Clone)]
pub struct PricingRefreshService<C, R, S> {
    cpi_source: Arc<C>,
    rpp_source: Arc<R>,
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: RefreshConfig,
}

impl<C, R, S> PricingRefreshService<C, R, S> {
    /// Create a refresh service.
    ///
    /// ```rust,ignore
    /// let service = PricingRefreshService::new(
    ///     Arc::new(cpi_source),
    ///     Arc::new(rpp_source),
    ///     Arc::new(store),
    ///     Arc::new(DefaultClock),
    ///     RefreshConfig::default(),
    /// );
    /// let run = service.run_refresh().await?;
    /// ```
    pub fn new(
        cpi_source: Arc<C>,
        rpp_source: Arc<R>,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            cpi_source,
            rpp_source,
            store,
            clock,
            config,
        }
    }
}

/// Everything a successful run applied, before commit.
struct AppliedRefresh {
    cpi: CpiReading,
    baseline: BaselineOutcome,
    line_code: LineCode,
    snapshot_year: i32,
    snapshot_rows: usize,
    sync: SyncReport,
    stale_states: Vec<String>,
    total_estimates: u64,
}

#[async_trait]
impl<C, R, S> PricingRefreshCommand for PricingRefreshService<C, R, S>
where
    C: CpiSource,
    R: RppSource,
    S: PricingStore,
{
    async fn run_refresh(&self) -> Result<RefreshRun, RefreshError> {
        let run_id = Uuid::new_v4();
        self.execute(run_id)
            .instrument(info_span!("pricing_refresh", %run_id))
            .await
    }
}

impl<C, R, S> PricingRefreshService<C, R, S>
where
    C: CpiSource,
    R: RppSource,
    S: PricingStore,
{
    async fn execute(&self, run_id: Uuid) -> Result<RefreshRun, RefreshError> {
        let started = Instant::now();
        info!("pricing refresh started");

        let mut tx = self.store.begin().await.map_err(map_store_error)?;
        let mut stage = RefreshStage::Idle;
        let applied = match self.apply(tx.as_mut(), &mut stage).await {
            Ok(applied) => applied,
            Err(error) => {
                warn!(failed_stage = %stage, %error, "pricing refresh failed");
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(error = %rollback_error, "rollback failed");
                }
                info!(stage = %RefreshStage::RolledBack, "pricing refresh rolled back");
                return Err(error);
            }
        };

        tx.commit().await.map_err(map_store_error)?;
        let execution_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            stage = %RefreshStage::Committed,
            updated_states = applied.sync.updated_count,
            total_estimates = applied.total_estimates,
            execution_time_ms,
            "pricing refresh committed"
        );

        Ok(RefreshRun {
            run_id,
            cpi: applied.cpi,
            baseline: BaselineSummary {
                year: applied.baseline.period.year,
                period: applied.baseline.period.period,
                established: applied.baseline.established,
            },
            rpp: RppSummary {
                year: applied.snapshot_year,
                line_code: applied.line_code,
                state_count: applied.snapshot_rows,
            },
            updated_states: applied.sync.updated_count,
            unmatched: applied.sync.unmatched,
            skipped_rows: applied.sync.skipped_rows,
            stale_states: applied.stale_states,
            total_estimates: applied.total_estimates,
            completed_at: self.clock.utc(),
            execution_time_ms,
        })
    }

    async fn apply(
        &self,
        tx: &mut dyn PricingTransaction,
        stage: &mut RefreshStage,
    ) -> Result<AppliedRefresh, RefreshError> {
        advance(stage, RefreshStage::FetchingCpi);
        let cpi = self
            .cpi_source
            .fetch_latest_cpi(&self.config.cpi_series_id)
            .await
            .map_err(map_cpi_error)?;
        info!(year = cpi.year, period = %cpi.period, value = cpi.value, "latest CPI fetched");

        let series = MacroSeries::cpi(cpi.series_id.clone());
        let reading = MacroFactorReading {
            series: series.clone(),
            period: FactorPeriod::new(cpi.year, cpi.period.clone()),
            value: cpi.value,
        };
        macro_factors::upsert_reading(tx, &reading)
            .await
            .map_err(map_store_error)?;
        let baseline = macro_factors::ensure_baseline(tx, &series, &self.config.baseline_target)
            .await
            .map_err(map_store_error)?;

        advance(stage, RefreshStage::FetchingRpp);
        let line_code = self.resolve_line_code().await?;
        let StateIndexSnapshot { latest_year, rows } = self
            .rpp_source
            .fetch_state_indices(&line_code, &self.config.rpp_years)
            .await
            .map_err(map_rpp_error)?;
        info!(year = latest_year, rows = rows.len(), %line_code, "regional price parities fetched");

        advance(stage, RefreshStage::Synchronizing);
        let sync = location_index::apply_state_indices(tx, &rows, latest_year)
            .await
            .map_err(map_store_error)?;
        location_index::check_completeness(&sync, self.config.min_updated_states)?;
        if !sync.unmatched.is_empty() {
            info!(unmatched = ?sync.unmatched, "regional rows without a state location");
        }
        let stale_states = tx
            .list_stale_states(latest_year)
            .await
            .map_err(map_store_error)?;
        if !stale_states.is_empty() {
            warn!(stale = ?stale_states, year = latest_year, "state indices left stale");
        }

        advance(stage, RefreshStage::Recomputing);
        let total_estimates = pricing_recompute::recompute_all(tx)
            .await
            .map_err(map_store_error)?;

        Ok(AppliedRefresh {
            cpi,
            baseline,
            line_code,
            snapshot_year: latest_year,
            snapshot_rows: rows.len(),
            sync,
            stale_states,
            total_estimates,
        })
    }

    async fn resolve_line_code(&self) -> Result<LineCode, RefreshError> {
        match &self.config.line_code {
            LineCodeSource::Configured(code) => Ok(code.clone()),
            LineCodeSource::Discover => {
                let code = self
                    .rpp_source
                    .discover_line_code()
                    .await
                    .map_err(map_rpp_error)?;
                info!(line_code = %code, "regional line code discovered");
                Ok(code)
            }
        }
    }
}

fn advance(stage: &mut RefreshStage, next: RefreshStage) {
    debug!(from = %stage, to = %next, "refresh stage");
    *stage = next;
}

fn map_cpi_error(error: CpiSourceError) -> RefreshError {
    match error {
        CpiSourceError::Unavailable { message } => {
            RefreshError::source_unavailable(IndexProvider::Cpi, message)
        }
        CpiSourceError::InvalidData { message } => {
            RefreshError::source_data_invalid(IndexProvider::Cpi, message)
        }
    }
}

fn map_rpp_error(error: RppSourceError) -> RefreshError {
    match error {
        RppSourceError::Unavailable { message } => {
            RefreshError::source_unavailable(IndexProvider::Rpp, message)
        }
        RppSourceError::InvalidData { message } => {
            RefreshError::source_data_invalid(IndexProvider::Rpp, message)
        }
    }
}

fn map_store_error(error: PricingStoreError) -> RefreshError {
    RefreshError::persistence(error.to_string())
}

#[cfg(test)]
#[path = "pricing_refresh_tests.rs"]
mod tests;
