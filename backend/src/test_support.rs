//! Test doubles shared by unit tests (in `src/`) and integration tests (in
//! `tests/`).
//!
//! Compiled for `cfg(test)` and behind the `test-support` feature. The
//! in-memory store gives every transaction a private working copy and
//! publishes it only on commit, which mirrors the isolation the Diesel
//! adapter gets from PostgreSQL for a single writer.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use uuid::Uuid;

use crate::domain::ports::{
    BaselineSummary, CpiReading, CpiSource, CpiSourceError, FactorPeriod, FactorType, LineCode,
    MacroFactorReading, MacroSeries, PricingStore, PricingStoreError, PricingTransaction,
    RefreshRun, RppSource, RppSourceError, RppSummary, StateIndexRow, StateIndexSnapshot,
    YearWindow,
};

/// Postal code and name of the fifty US states.
pub const US_STATES: [(&str, &str); 50] = [
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
];

/// Kind of a seeded location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationKind {
    State,
    City,
}

/// Location row as held by [`InMemoryPricingStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRecord {
    pub slug: String,
    pub kind: LocationKind,
    pub state_code: String,
    pub state_name: String,
    pub city_name: Option<String>,
    pub is_active: bool,
    pub rpp_index: Option<f64>,
    pub rpp_year: Option<i32>,
}

/// Store operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Begin,
    UpdateStateIndex,
    Recompute,
    Commit,
}

type MacroFactorKey = (FactorType, String, FactorPeriod);

#[derive(Debug, Clone, Copy, PartialEq)]
struct MacroFactorRow {
    value: f64,
    is_baseline: bool,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    macro_factors: BTreeMap<MacroFactorKey, MacroFactorRow>,
    locations: Vec<LocationRecord>,
    service_count: u64,
    pricing_rows: u64,
}

#[derive(Default)]
struct Shared {
    state: Mutex<StoreState>,
    fail_point: Mutex<Option<FailPoint>>,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn is_state_named(location: &LocationRecord, state_name: &str) -> bool {
    location.kind == LocationKind::State && location.state_name == state_name
}

fn key(series: &MacroSeries, period: &FactorPeriod) -> MacroFactorKey {
    (series.factor_type, series.series_id.clone(), period.clone())
}

/// Transactional in-memory implementation of [`PricingStore`].
#[derive(Clone, Default)]
pub struct InMemoryPricingStore {
    shared: Arc<Shared>,
}

impl InMemoryPricingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with every US state and `service_count` services.
    pub fn with_us_states(service_count: u64) -> Self {
        let store = Self::new();
        for (code, name) in US_STATES {
            store.seed_state(&code.to_lowercase(), code, name);
        }
        store.set_service_count(service_count);
        store
    }

    pub fn set_service_count(&self, service_count: u64) {
        lock(&self.shared.state).service_count = service_count;
    }

    pub fn seed_state(&self, slug: &str, state_code: &str, state_name: &str) {
        self.push_location(LocationRecord {
            slug: slug.to_owned(),
            kind: LocationKind::State,
            state_code: state_code.to_owned(),
            state_name: state_name.to_owned(),
            city_name: None,
            is_active: true,
            rpp_index: None,
            rpp_year: None,
        });
    }

    pub fn seed_city(&self, slug: &str, state_code: &str, state_name: &str, city_name: &str) {
        self.push_location(LocationRecord {
            slug: slug.to_owned(),
            kind: LocationKind::City,
            state_code: state_code.to_owned(),
            state_name: state_name.to_owned(),
            city_name: Some(city_name.to_owned()),
            is_active: true,
            rpp_index: None,
            rpp_year: None,
        });
    }

    /// Set the index of an already seeded location, bypassing transactions.
    pub fn seed_state_index(&self, state_name: &str, index: f64, year: i32) {
        let mut state = lock(&self.shared.state);
        for location in state
            .locations
            .iter_mut()
            .filter(|location| location.state_name == state_name)
        {
            location.rpp_index = Some(index);
            location.rpp_year = Some(year);
        }
    }

    fn push_location(&self, record: LocationRecord) {
        lock(&self.shared.state).locations.push(record);
    }

    pub fn seed_macro_factor(&self, reading: &MacroFactorReading) {
        lock(&self.shared.state).macro_factors.insert(
            key(&reading.series, &reading.period),
            MacroFactorRow {
                value: reading.value,
                is_baseline: false,
            },
        );
    }

    /// Flag `period` as baseline, inserting a placeholder row when absent.
    pub fn seed_baseline(&self, series: &MacroSeries, period: &FactorPeriod) {
        let mut state = lock(&self.shared.state);
        state
            .macro_factors
            .entry(key(series, period))
            .or_insert(MacroFactorRow {
                value: 0.0,
                is_baseline: false,
            })
            .is_baseline = true;
    }

    pub fn fail_on(&self, point: FailPoint) {
        *lock(&self.shared.fail_point) = Some(point);
    }

    pub fn clear_failure(&self) {
        *lock(&self.shared.fail_point) = None;
    }

    pub fn location(&self, state_name: &str) -> Option<LocationRecord> {
        lock(&self.shared.state)
            .locations
            .iter()
            .find(|location| is_state_named(location, state_name))
            .cloned()
    }

    pub fn locations(&self) -> Vec<LocationRecord> {
        lock(&self.shared.state).locations.clone()
    }

    pub fn baseline_periods(&self, series: &MacroSeries) -> Vec<FactorPeriod> {
        lock(&self.shared.state)
            .macro_factors
            .iter()
            .filter(|((factor_type, series_id, _), row)| {
                row.is_baseline
                    && *factor_type == series.factor_type
                    && *series_id == series.series_id
            })
            .map(|((_, _, period), _)| period.clone())
            .collect()
    }

    pub fn macro_factor_value(&self, series: &MacroSeries, period: &FactorPeriod) -> Option<f64> {
        lock(&self.shared.state)
            .macro_factors
            .get(&key(series, period))
            .map(|row| row.value)
    }

    pub fn macro_factor_count(&self) -> usize {
        lock(&self.shared.state).macro_factors.len()
    }

    pub fn pricing_row_count(&self) -> u64 {
        lock(&self.shared.state).pricing_rows
    }

    pub fn commit_count(&self) -> usize {
        self.shared.commits.load(Ordering::SeqCst)
    }

    pub fn rollback_count(&self) -> usize {
        self.shared.rollbacks.load(Ordering::SeqCst)
    }

    fn check(&self, point: FailPoint) -> Result<(), PricingStoreError> {
        check_fail_point(&self.shared, point)
    }
}

fn check_fail_point(shared: &Shared, point: FailPoint) -> Result<(), PricingStoreError> {
    if *lock(&shared.fail_point) == Some(point) {
        return Err(PricingStoreError::query(format!("injected failure at {point:?}")));
    }
    Ok(())
}

#[async_trait]
impl PricingStore for InMemoryPricingStore {
    async fn begin(&self) -> Result<Box<dyn PricingTransaction>, PricingStoreError> {
        self.check(FailPoint::Begin)?;
        let working = lock(&self.shared.state).clone();
        Ok(Box::new(InMemoryPricingTransaction {
            shared: Arc::clone(&self.shared),
            working,
        }))
    }
}

/// Working copy handed out by [`InMemoryPricingStore::begin`].
pub struct InMemoryPricingTransaction {
    shared: Arc<Shared>,
    working: StoreState,
}

impl InMemoryPricingTransaction {
    fn series_rows<'a>(
        &'a self,
        series: &'a MacroSeries,
    ) -> impl Iterator<Item = (&'a FactorPeriod, &'a MacroFactorRow)> + 'a {
        self.working
            .macro_factors
            .iter()
            .filter(move |((factor_type, series_id, _), _)| {
                *factor_type == series.factor_type && *series_id == series.series_id
            })
            .map(|((_, _, period), row)| (period, row))
    }
}

#[async_trait]
impl PricingTransaction for InMemoryPricingTransaction {
    async fn upsert_macro_factor(
        &mut self,
        reading: &MacroFactorReading,
    ) -> Result<(), PricingStoreError> {
        self.working
            .macro_factors
            .entry(key(&reading.series, &reading.period))
            .and_modify(|row| row.value = reading.value)
            .or_insert(MacroFactorRow {
                value: reading.value,
                is_baseline: false,
            });
        Ok(())
    }

    async fn find_baseline(
        &mut self,
        series: &MacroSeries,
    ) -> Result<Option<FactorPeriod>, PricingStoreError> {
        Ok(self
            .series_rows(series)
            .find(|(_, row)| row.is_baseline)
            .map(|(period, _)| period.clone()))
    }

    async fn contains_period(
        &mut self,
        series: &MacroSeries,
        period: &FactorPeriod,
    ) -> Result<bool, PricingStoreError> {
        Ok(self.working.macro_factors.contains_key(&key(series, period)))
    }

    async fn earliest_period(
        &mut self,
        series: &MacroSeries,
    ) -> Result<Option<FactorPeriod>, PricingStoreError> {
        Ok(self
            .series_rows(series)
            .map(|(period, _)| period.clone())
            .min())
    }

    async fn clear_baseline(&mut self, series: &MacroSeries) -> Result<u64, PricingStoreError> {
        let mut cleared = 0;
        for ((factor_type, series_id, _), row) in &mut self.working.macro_factors {
            let same_series = *factor_type == series.factor_type && *series_id == series.series_id;
            if same_series && row.is_baseline {
                row.is_baseline = false;
                cleared += 1;
            }
        }
        Ok(cleared)
    }

    async fn mark_baseline(
        &mut self,
        series: &MacroSeries,
        period: &FactorPeriod,
    ) -> Result<bool, PricingStoreError> {
        Ok(match self.working.macro_factors.get_mut(&key(series, period)) {
            Some(row) => {
                row.is_baseline = true;
                true
            }
            None => false,
        })
    }

    async fn update_state_index(
        &mut self,
        state_name: &str,
        index: f64,
        year: i32,
    ) -> Result<bool, PricingStoreError> {
        check_fail_point(&self.shared, FailPoint::UpdateStateIndex)?;
        let mut matched = false;
        for location in self
            .working
            .locations
            .iter_mut()
            .filter(|location| is_state_named(location, state_name))
        {
            location.rpp_index = Some(index);
            location.rpp_year = Some(year);
            matched = true;
        }
        Ok(matched)
    }

    async fn list_stale_states(&mut self, year: i32) -> Result<Vec<String>, PricingStoreError> {
        let mut stale: Vec<String> = self
            .working
            .locations
            .iter()
            .filter(|location| location.kind == LocationKind::State && location.is_active)
            .filter(|location| location.rpp_year.is_none_or(|applied| applied < year))
            .map(|location| location.state_name.clone())
            .collect();
        stale.sort();
        Ok(stale)
    }

    async fn recompute_location_pricing(&mut self) -> Result<(), PricingStoreError> {
        check_fail_point(&self.shared, FailPoint::Recompute)?;
        let priced_locations = self
            .working
            .locations
            .iter()
            .filter(|location| location.is_active && location.rpp_index.is_some())
            .count();
        self.working.pricing_rows =
            u64::try_from(priced_locations).unwrap_or(u64::MAX) * self.working.service_count;
        Ok(())
    }

    async fn count_location_pricing(&mut self) -> Result<u64, PricingStoreError> {
        Ok(self.working.pricing_rows)
    }

    async fn commit(self: Box<Self>) -> Result<(), PricingStoreError> {
        check_fail_point(&self.shared, FailPoint::Commit)?;
        let Self { shared, working } = *self;
        *lock(&shared.state) = working;
        shared.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), PricingStoreError> {
        self.shared.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// CPI source answering every call with the same configured result.
pub struct StaticCpiSource {
    result: Mutex<Result<CpiReading, CpiSourceError>>,
    calls: AtomicUsize,
}

impl StaticCpiSource {
    pub fn new(result: Result<CpiReading, CpiSourceError>) -> Self {
        Self {
            result: Mutex::new(result),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn reading(series_id: &str, year: i32, period: &str, value: f64) -> Self {
        Self::new(Ok(CpiReading {
            series_id: series_id.to_owned(),
            year,
            period: period.to_owned(),
            value,
        }))
    }

    pub fn set(&self, result: Result<CpiReading, CpiSourceError>) {
        *lock(&self.result) = result;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CpiSource for StaticCpiSource {
    async fn fetch_latest_cpi(&self, _series_id: &str) -> Result<CpiReading, CpiSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.result).clone()
    }
}

/// RPP source answering with configured line code and snapshot results.
pub struct StaticRppSource {
    line_code: Mutex<Result<LineCode, RppSourceError>>,
    snapshot: Mutex<Result<StateIndexSnapshot, RppSourceError>>,
    discover_calls: AtomicUsize,
}

impl StaticRppSource {
    pub fn new(
        line_code: Result<LineCode, RppSourceError>,
        snapshot: Result<StateIndexSnapshot, RppSourceError>,
    ) -> Self {
        Self {
            line_code: Mutex::new(line_code),
            snapshot: Mutex::new(snapshot),
            discover_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_snapshot(&self, snapshot: Result<StateIndexSnapshot, RppSourceError>) {
        *lock(&self.snapshot) = snapshot;
    }

    pub fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RppSource for StaticRppSource {
    async fn discover_line_code(&self) -> Result<LineCode, RppSourceError> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.line_code).clone()
    }

    async fn fetch_state_indices(
        &self,
        _line_code: &LineCode,
        _years: &YearWindow,
    ) -> Result<StateIndexSnapshot, RppSourceError> {
        lock(&self.snapshot).clone()
    }
}

/// Snapshot with one row per name, values `100.0 + position / 10`.
pub fn state_snapshot<'a>(
    year: i32,
    names: impl IntoIterator<Item = &'a str>,
) -> StateIndexSnapshot {
    let rows = names
        .into_iter()
        .zip(0_u32..)
        .map(|(name, position)| StateIndexRow {
            geo_name: name.to_owned(),
            value: Some(100.0 + f64::from(position) / 10.0),
        })
        .collect();
    StateIndexSnapshot {
        latest_year: year,
        rows,
    }
}

/// Names of the first `count` US states in alphabetical order.
pub fn first_state_names(count: usize) -> Vec<&'static str> {
    US_STATES.iter().take(count).map(|(_, name)| *name).collect()
}

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl FixtureClock {
    pub fn at(utc_now: DateTime<Utc>) -> Self {
        Self { utc_now }
    }
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

/// Committed run summary with fixed identifiers, for adapter tests.
pub fn sample_refresh_run() -> RefreshRun {
    RefreshRun {
        run_id: Uuid::nil(),
        cpi: CpiReading {
            series_id: "CUUR0000SA0".to_owned(),
            year: 2025,
            period: "M11".to_owned(),
            value: 312.3,
        },
        baseline: BaselineSummary {
            year: 2023,
            period: "M01".to_owned(),
            established: false,
        },
        rpp: RppSummary {
            year: 2023,
            line_code: LineCode::new("1").expect("static line code is valid"),
            state_count: 51,
        },
        updated_states: 50,
        unmatched: vec!["District of Columbia".to_owned()],
        skipped_rows: 0,
        stale_states: Vec::new(),
        total_estimates: 600,
        completed_at: Utc
            .with_ymd_and_hms(2025, 12, 10, 8, 0, 0)
            .single()
            .expect("valid fixture timestamp"),
        execution_time_ms: 1_250,
    }
}
