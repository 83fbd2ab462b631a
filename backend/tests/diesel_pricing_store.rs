//! Integration tests for `DieselPricingStore` against embedded PostgreSQL.
//!
//! Each test provisions a temporary database carrying the fixture schema in
//! `fixtures/pricing_schema.sql`, seeds it with `postgres`, and drives the
//! store through its transaction port.

use pg_embedded_setup_unpriv::TemporaryDatabase;
use postgres::{Client, NoTls};
use pricing_backend::domain::ensure_baseline;
use pricing_backend::domain::ports::{
    FactorPeriod, MacroFactorReading, MacroSeries, PricingStore, PricingTransaction,
};
use pricing_backend::outbound::persistence::{DbPool, DieselPricingStore, PoolConfig};
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

mod support;

use support::{
    format_postgres_error, handle_cluster_setup_failure, provision_pricing_database,
    shared_cluster_handle,
};

const SERIES: &str = "CUUR0000SA0";

struct TestContext {
    runtime: Runtime,
    store: DieselPricingStore,
    database_url: String,
    _database: TemporaryDatabase,
}

impl TestContext {
    fn client(&self) -> Client {
        Client::connect(self.database_url.as_str(), NoTls)
            .unwrap_or_else(|err| panic!("connect: {}", format_postgres_error(&err)))
    }

    fn seed(&self, statements: &[String]) {
        self.client()
            .batch_execute(statements.concat().as_str())
            .unwrap_or_else(|err| panic!("seed: {}", format_postgres_error(&err)));
    }

    fn state_index(&self, state_name: &str) -> (Option<f64>, Option<i32>) {
        let row = self
            .client()
            .query_one(
                "SELECT rpp_index, rpp_year FROM locations \
                 WHERE type = 'state' AND state_name = $1",
                &[&state_name],
            )
            .unwrap_or_else(|err| panic!("state lookup: {}", format_postgres_error(&err)));
        (row.get(0), row.get(1))
    }

    fn count(&self, sql: &str) -> i64 {
        self.client()
            .query_one(sql, &[])
            .unwrap_or_else(|err| panic!("count: {}", format_postgres_error(&err)))
            .get(0)
    }
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = shared_cluster_handle().map_err(|err| format!("{err:?}"))?;
    let temp_db = provision_pricing_database(cluster)?;
    let database_url = temp_db.url().to_string();

    let config = PoolConfig::new(database_url.as_str())
        .with_max_size(2)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(async { DbPool::new(config).await })
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        runtime,
        store: DieselPricingStore::new(pool),
        database_url,
        _database: temp_db,
    })
}

#[fixture]
fn store_context() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn cpi_reading(year: i32, period: &str, value: f64) -> MacroFactorReading {
    MacroFactorReading {
        series: MacroSeries::cpi(SERIES),
        period: FactorPeriod::new(year, period),
        value,
    }
}

fn insert_cpi(year: i32, period: &str, value: f64, is_baseline: bool) -> String {
    format!(
        "INSERT INTO macro_factors (factor_type, series_id, year, period, value, is_baseline) \
         VALUES ('CPI', '{SERIES}', {year}, '{period}', {value}, {is_baseline});"
    )
}

fn insert_state(code: &str, name: &str, active: bool, index: Option<(f64, i32)>) -> String {
    let (rpp_index, rpp_year) = index.map_or_else(
        || ("NULL".to_owned(), "NULL".to_owned()),
        |(value, year)| (value.to_string(), year.to_string()),
    );
    let slug = name.to_lowercase().replace(' ', "-");
    format!(
        "INSERT INTO locations \
         (slug, type, state_code, state_name, is_active, rpp_index, rpp_year) \
         VALUES ('{slug}', 'state', '{code}', '{name}', {active}, {rpp_index}, {rpp_year});"
    )
}

fn insert_city(code: &str, state_name: &str, city: &str) -> String {
    let slug = format!("{}-{}", code.to_lowercase(), city.to_lowercase().replace(' ', "-"));
    format!(
        "INSERT INTO locations (slug, type, state_code, state_name, city_name) \
         VALUES ('{slug}', 'city', '{code}', '{state_name}', '{city}');"
    )
}

#[rstest]
fn upserting_the_baseline_row_keeps_its_flag(store_context: Option<TestContext>) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: upserting_the_baseline_row_keeps_its_flag skipped");
        return;
    };
    context.seed(&[insert_cpi(2024, "M01", 308.4, true)]);

    context.runtime.block_on(async {
        let mut tx = context.store.begin().await.expect("begin");
        tx.upsert_macro_factor(&cpi_reading(2024, "M01", 309.9))
            .await
            .expect("upsert existing row");
        tx.upsert_macro_factor(&cpi_reading(2024, "M02", 310.3))
            .await
            .expect("insert new row");
        tx.commit().await.expect("commit");
    });

    let row = context
        .client()
        .query_one(
            "SELECT value, is_baseline FROM macro_factors WHERE year = 2024 AND period = 'M01'",
            &[],
        )
        .expect("baseline row");
    assert_eq!(row.get::<_, f64>(0), 309.9);
    assert!(row.get::<_, bool>(1), "upsert must not clear the baseline flag");

    let row = context
        .client()
        .query_one(
            "SELECT is_baseline FROM macro_factors WHERE year = 2024 AND period = 'M02'",
            &[],
        )
        .expect("inserted row");
    assert!(!row.get::<_, bool>(0), "new rows are never the baseline");
}

#[rstest]
fn missing_target_falls_back_to_the_earliest_period(store_context: Option<TestContext>) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: missing_target_falls_back_to_the_earliest_period skipped");
        return;
    };
    context.seed(&[
        insert_cpi(2023, "M06", 305.1, false),
        insert_cpi(2023, "M01", 299.2, false),
        insert_cpi(2025, "M01", 317.7, false),
    ]);
    let series = MacroSeries::cpi(SERIES);
    let target = FactorPeriod::new(2024, "M01");

    let (first, second) = context.runtime.block_on(async {
        let mut tx = context.store.begin().await.expect("begin");
        let first = ensure_baseline(tx.as_mut(), &series, &target)
            .await
            .expect("first baseline");
        let second = ensure_baseline(tx.as_mut(), &series, &target)
            .await
            .expect("second baseline");
        tx.commit().await.expect("commit");
        (first, second)
    });

    assert_eq!(first.period, FactorPeriod::new(2023, "M01"));
    assert!(first.established);
    assert_eq!(second.period, first.period);
    assert!(!second.established);
    assert_eq!(
        context.count("SELECT count(*) FROM macro_factors WHERE is_baseline"),
        1
    );
    assert_eq!(
        context.count(
            "SELECT count(*) FROM macro_factors \
             WHERE is_baseline AND year = 2023 AND period = 'M01'"
        ),
        1
    );
}

#[rstest]
fn state_index_updates_never_touch_city_rows(store_context: Option<TestContext>) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: state_index_updates_never_touch_city_rows skipped");
        return;
    };
    context.seed(&[
        insert_state("CA", "California", true, None),
        insert_city("CA", "California", "Los Angeles"),
    ]);

    let (matched, unmatched) = context.runtime.block_on(async {
        let mut tx = context.store.begin().await.expect("begin");
        let matched = tx
            .update_state_index("California", 112.6, 2024)
            .await
            .expect("update state");
        let unmatched = tx
            .update_state_index("Calif.", 112.6, 2024)
            .await
            .expect("update unknown name");
        tx.commit().await.expect("commit");
        (matched, unmatched)
    });

    assert!(matched);
    assert!(!unmatched);
    assert_eq!(context.state_index("California"), (Some(112.6), Some(2024)));
    assert_eq!(
        context.count(
            "SELECT count(*) FROM locations WHERE type = 'city' AND rpp_index IS NOT NULL"
        ),
        0
    );
}

#[rstest]
fn rollback_discards_upserts_and_index_updates(store_context: Option<TestContext>) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: rollback_discards_upserts_and_index_updates skipped");
        return;
    };
    context.seed(&[insert_state("AL", "Alabama", true, Some((87.5, 2022)))]);

    context.runtime.block_on(async {
        let mut tx = context.store.begin().await.expect("begin");
        tx.upsert_macro_factor(&cpi_reading(2024, "M06", 313.0))
            .await
            .expect("upsert");
        assert!(
            tx.update_state_index("Alabama", 88.1, 2024)
                .await
                .expect("update")
        );
        tx.rollback().await.expect("rollback");
    });

    assert_eq!(context.state_index("Alabama"), (Some(87.5), Some(2022)));
    assert_eq!(context.count("SELECT count(*) FROM macro_factors"), 0);
}

#[rstest]
fn stale_states_are_active_states_behind_the_year(store_context: Option<TestContext>) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: stale_states_are_active_states_behind_the_year skipped");
        return;
    };
    context.seed(&[
        insert_state("AZ", "Arizona", true, None),
        insert_state("AK", "Alaska", true, Some((104.2, 2023))),
        insert_state("AL", "Alabama", true, Some((87.5, 2024))),
        insert_state("AR", "Arkansas", false, None),
        insert_city("AZ", "Arizona", "Phoenix"),
    ]);

    let stale = context.runtime.block_on(async {
        let mut tx = context.store.begin().await.expect("begin");
        let stale = tx.list_stale_states(2024).await.expect("list stale states");
        tx.rollback().await.expect("rollback");
        stale
    });

    assert_eq!(stale, vec!["Alaska".to_owned(), "Arizona".to_owned()]);
}

#[rstest]
fn recompute_prices_every_indexed_active_location(store_context: Option<TestContext>) {
    let Some(context) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: recompute_prices_every_indexed_active_location skipped");
        return;
    };
    context.seed(&[
        "INSERT INTO services DEFAULT VALUES;".repeat(3),
        insert_state("AL", "Alabama", true, Some((87.5, 2024))),
        insert_state("AK", "Alaska", true, Some((104.2, 2024))),
        insert_state("AZ", "Arizona", true, None),
        insert_state("AR", "Arkansas", false, Some((86.9, 2024))),
    ]);

    let mut tx = context.runtime.block_on(context.store.begin()).expect("begin");
    let committed = context.runtime.block_on(async {
        tx.recompute_location_pricing().await.expect("recompute");
        tx.count_location_pricing().await.expect("count")
    });
    let visible_before_commit = context.count("SELECT count(*) FROM location_pricing");
    context.runtime.block_on(tx.commit()).expect("commit");

    assert_eq!(committed, 6);
    assert_eq!(visible_before_commit, 0, "rows stay private until commit");
    assert_eq!(context.count("SELECT count(*) FROM location_pricing"), 6);
}
