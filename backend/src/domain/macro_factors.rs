//! Macro factor upserts and baseline maintenance.
//!
//! Invariant: at most one row per series carries `is_baseline = true`, and
//! once set it is never moved by an ordinary refresh.

use tracing::{debug, info};

use crate::domain::ports::{
    FactorPeriod, MacroFactorReading, MacroSeries, PricingStoreError, PricingTransaction,
};

/// Baseline selected for a series after [`ensure_baseline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineOutcome {
    pub period: FactorPeriod,
    /// `true` when this call flagged the baseline, `false` when one existed.
    pub established: bool,
}

/// Insert or update the reading without touching the baseline flag.
///
/// # Errors
///
/// Propagates store failures unchanged.
pub async fn upsert_reading(
    tx: &mut dyn PricingTransaction,
    reading: &MacroFactorReading,
) -> Result<(), PricingStoreError> {
    tx.upsert_macro_factor(reading).await?;
    debug!(
        series = %reading.series,
        period = %reading.period,
        value = reading.value,
        "macro factor upserted"
    );
    Ok(())
}

/// Make sure `series` has exactly one baseline row.
///
/// An existing baseline is kept as is. Otherwise `target` is flagged when
/// stored, falling back to the earliest stored period.
///
/// # Errors
///
/// Returns [`PricingStoreError::Query`] when the series has no rows to
/// anchor a baseline on, and propagates store failures.
pub async fn ensure_baseline(
    tx: &mut dyn PricingTransaction,
    series: &MacroSeries,
    target: &FactorPeriod,
) -> Result<BaselineOutcome, PricingStoreError> {
    if let Some(period) = tx.find_baseline(series).await? {
        return Ok(BaselineOutcome {
            period,
            established: false,
        });
    }

    let period = if tx.contains_period(series, target).await? {
        target.clone()
    } else {
        let earliest = tx.earliest_period(series).await?.ok_or_else(|| {
            PricingStoreError::query(format!("no stored periods to anchor a baseline for {series}"))
        })?;
        debug!(%series, %target, fallback = %earliest, "baseline target not stored");
        earliest
    };

    tx.clear_baseline(series).await?;
    if !tx.mark_baseline(series, &period).await? {
        return Err(PricingStoreError::query(format!(
            "baseline period {period} vanished for {series}"
        )));
    }
    info!(%series, %period, "baseline established");

    Ok(BaselineOutcome {
        period,
        established: true,
    })
}

#[cfg(test)]
mod tests {
    //! Baseline selection against the in-memory store.

    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::ports::PricingStore;
    use crate::test_support::InMemoryPricingStore;

    const SERIES: &str = "CUUR0000SA0";

    fn reading(year: i32, period: &str, value: f64) -> MacroFactorReading {
        MacroFactorReading {
            series: MacroSeries::cpi(SERIES),
            period: FactorPeriod::new(year, period),
            value,
        }
    }

    #[fixture]
    fn store() -> InMemoryPricingStore {
        let store = InMemoryPricingStore::new();
        store.seed_macro_factor(&reading(2023, "M02", 300.8));
        store.seed_macro_factor(&reading(2023, "M01", 299.2));
        store
    }

    #[rstest]
    #[tokio::test]
    async fn falls_back_to_earliest_period_when_target_missing(store: InMemoryPricingStore) {
        let mut tx = store.begin().await.expect("begin");
        let outcome = ensure_baseline(
            tx.as_mut(),
            &MacroSeries::cpi(SERIES),
            &FactorPeriod::new(2024, "M01"),
        )
        .await
        .expect("baseline");
        tx.commit().await.expect("commit");

        assert_eq!(outcome.period, FactorPeriod::new(2023, "M01"));
        assert!(outcome.established);
        assert_eq!(
            store.baseline_periods(&MacroSeries::cpi(SERIES)),
            vec![FactorPeriod::new(2023, "M01")]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn prefers_configured_target_when_stored(store: InMemoryPricingStore) {
        let mut tx = store.begin().await.expect("begin");
        let outcome = ensure_baseline(
            tx.as_mut(),
            &MacroSeries::cpi(SERIES),
            &FactorPeriod::new(2023, "M02"),
        )
        .await
        .expect("baseline");

        assert_eq!(outcome.period, FactorPeriod::new(2023, "M02"));
    }

    #[rstest]
    #[tokio::test]
    async fn existing_baseline_is_left_alone(store: InMemoryPricingStore) {
        let series = MacroSeries::cpi(SERIES);
        store.seed_baseline(&series, &FactorPeriod::new(2023, "M02"));

        let mut tx = store.begin().await.expect("begin");
        let outcome = ensure_baseline(tx.as_mut(), &series, &FactorPeriod::new(2023, "M01"))
            .await
            .expect("baseline");
        tx.commit().await.expect("commit");

        assert!(!outcome.established);
        assert_eq!(outcome.period, FactorPeriod::new(2023, "M02"));
        assert_eq!(
            store.baseline_periods(&series),
            vec![FactorPeriod::new(2023, "M02")]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn upsert_keeps_baseline_flag_on_conflict(store: InMemoryPricingStore) {
        let series = MacroSeries::cpi(SERIES);
        store.seed_baseline(&series, &FactorPeriod::new(2023, "M01"));

        let mut tx = store.begin().await.expect("begin");
        upsert_reading(tx.as_mut(), &reading(2023, "M01", 301.0))
            .await
            .expect("upsert");
        tx.commit().await.expect("commit");

        assert_eq!(
            store.macro_factor_value(&series, &FactorPeriod::new(2023, "M01")),
            Some(301.0)
        );
        assert_eq!(
            store.baseline_periods(&series),
            vec![FactorPeriod::new(2023, "M01")]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn empty_series_cannot_anchor_a_baseline() {
        let store = InMemoryPricingStore::new();
        let mut tx = store.begin().await.expect("begin");
        let error = ensure_baseline(
            tx.as_mut(),
            &MacroSeries::cpi(SERIES),
            &FactorPeriod::new(2024, "M01"),
        )
        .await
        .expect_err("empty series");

        assert!(matches!(error, PricingStoreError::Query { .. }));
    }
}
