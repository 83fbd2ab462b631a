//! PostgreSQL-backed pricing store.
//!
//! [`DieselPricingStore::begin`] checks out an owned pooled connection and
//! opens a transaction on it. Every statement of the refresh run goes
//! through the returned [`DieselPricingTransaction`].

use async_trait::async_trait;
use diesel::OptionalExtension;
use diesel::dsl::now;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::upsert::excluded;
use diesel_async::{AnsiTransactionManager, RunQueryDsl, TransactionManager};
use tracing::debug;

use crate::domain::ports::{
    FactorPeriod, MacroFactorReading, MacroSeries, PricingStore, PricingStoreError,
    PricingTransaction,
};

use super::diesel_helpers::{cast_count, map_diesel_error, map_pool_error};
use super::pool::{DbPool, OwnedConnection};
use super::schema::{location_pricing, locations, macro_factors};

const STATE_LOCATION_TYPE: &str = "state";
const RECOMPUTE_ALL_SQL: &str = "SELECT recompute_location_pricing(NULL)";

/// Diesel-backed implementation of the pricing store port.
#[derive(Clone)]
pub struct DieselPricingStore {
    pool: DbPool,
}

impl DieselPricingStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PricingStore for DieselPricingStore {
    async fn begin(&self) -> Result<Box<dyn PricingTransaction>, PricingStoreError> {
        let mut conn = self.pool.get_owned().await.map_err(map_pool_error)?;
        AnsiTransactionManager::begin_transaction(&mut *conn)
            .await
            .map_err(|error| map_diesel_error(error, "begin transaction"))?;
        debug!("pricing transaction opened");
        Ok(Box::new(DieselPricingTransaction { conn }))
    }
}

/// Open transaction on one pooled connection.
pub struct DieselPricingTransaction {
    conn: OwnedConnection,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = macro_factors)]
struct NewMacroFactorRow<'a> {
    factor_type: &'a str,
    series_id: &'a str,
    year: i32,
    period: &'a str,
    value: f64,
    is_baseline: bool,
}

impl<'a> From<&'a MacroFactorReading> for NewMacroFactorRow<'a> {
    fn from(reading: &'a MacroFactorReading) -> Self {
        Self {
            factor_type: reading.series.factor_type.as_str(),
            series_id: reading.series.series_id.as_str(),
            year: reading.period.year,
            period: reading.period.period.as_str(),
            value: reading.value,
            is_baseline: false,
        }
    }
}

#[async_trait]
impl PricingTransaction for DieselPricingTransaction {
    async fn upsert_macro_factor(
        &mut self,
        reading: &MacroFactorReading,
    ) -> Result<(), PricingStoreError> {
        use macro_factors::dsl;

        diesel::insert_into(macro_factors::table)
            .values(NewMacroFactorRow::from(reading))
            .on_conflict((dsl::factor_type, dsl::series_id, dsl::year, dsl::period))
            .do_update()
            .set((dsl::value.eq(excluded(dsl::value)), dsl::updated_at.eq(now)))
            .execute(&mut *self.conn)
            .await
            .map_err(|error| map_diesel_error(error, "upsert macro factor"))?;
        Ok(())
    }

    async fn find_baseline(
        &mut self,
        series: &MacroSeries,
    ) -> Result<Option<FactorPeriod>, PricingStoreError> {
        use macro_factors::dsl;

        let row: Option<(i32, String)> = macro_factors::table
            .filter(dsl::factor_type.eq(series.factor_type.as_str()))
            .filter(dsl::series_id.eq(&series.series_id))
            .filter(dsl::is_baseline.eq(true))
            .select((dsl::year, dsl::period))
            .first(&mut *self.conn)
            .await
            .optional()
            .map_err(|error| map_diesel_error(error, "find baseline"))?;
        Ok(row.map(|(year, period)| FactorPeriod::new(year, period)))
    }

    async fn contains_period(
        &mut self,
        series: &MacroSeries,
        period: &FactorPeriod,
    ) -> Result<bool, PricingStoreError> {
        use macro_factors::dsl;

        let count: i64 = macro_factors::table
            .filter(dsl::factor_type.eq(series.factor_type.as_str()))
            .filter(dsl::series_id.eq(&series.series_id))
            .filter(dsl::year.eq(period.year))
            .filter(dsl::period.eq(&period.period))
            .count()
            .get_result(&mut *self.conn)
            .await
            .map_err(|error| map_diesel_error(error, "look up period"))?;
        Ok(count > 0)
    }

    async fn earliest_period(
        &mut self,
        series: &MacroSeries,
    ) -> Result<Option<FactorPeriod>, PricingStoreError> {
        use macro_factors::dsl;

        let row: Option<(i32, String)> = macro_factors::table
            .filter(dsl::factor_type.eq(series.factor_type.as_str()))
            .filter(dsl::series_id.eq(&series.series_id))
            .order((dsl::year.asc(), dsl::period.asc()))
            .select((dsl::year, dsl::period))
            .first(&mut *self.conn)
            .await
            .optional()
            .map_err(|error| map_diesel_error(error, "find earliest period"))?;
        Ok(row.map(|(year, period)| FactorPeriod::new(year, period)))
    }

    async fn clear_baseline(&mut self, series: &MacroSeries) -> Result<u64, PricingStoreError> {
        use macro_factors::dsl;

        let cleared = diesel::update(
            macro_factors::table
                .filter(dsl::factor_type.eq(series.factor_type.as_str()))
                .filter(dsl::series_id.eq(&series.series_id))
                .filter(dsl::is_baseline.eq(true)),
        )
        .set((dsl::is_baseline.eq(false), dsl::updated_at.eq(now)))
        .execute(&mut *self.conn)
        .await
        .map_err(|error| map_diesel_error(error, "clear baseline"))?;
        Ok(u64::try_from(cleared).unwrap_or(u64::MAX))
    }

    async fn mark_baseline(
        &mut self,
        series: &MacroSeries,
        period: &FactorPeriod,
    ) -> Result<bool, PricingStoreError> {
        use macro_factors::dsl;

        let marked = diesel::update(
            macro_factors::table
                .filter(dsl::factor_type.eq(series.factor_type.as_str()))
                .filter(dsl::series_id.eq(&series.series_id))
                .filter(dsl::year.eq(period.year))
                .filter(dsl::period.eq(&period.period)),
        )
        .set((dsl::is_baseline.eq(true), dsl::updated_at.eq(now)))
        .execute(&mut *self.conn)
        .await
        .map_err(|error| map_diesel_error(error, "mark baseline"))?;
        Ok(marked > 0)
    }

    async fn update_state_index(
        &mut self,
        state_name: &str,
        index: f64,
        year: i32,
    ) -> Result<bool, PricingStoreError> {
        use locations::dsl;

        let updated = diesel::update(
            locations::table
                .filter(dsl::location_type.eq(STATE_LOCATION_TYPE))
                .filter(dsl::state_name.eq(state_name)),
        )
        .set((
            dsl::rpp_index.eq(Some(index)),
            dsl::rpp_year.eq(Some(year)),
            dsl::updated_at.eq(now),
        ))
        .execute(&mut *self.conn)
        .await
        .map_err(|error| map_diesel_error(error, "update state index"))?;
        Ok(updated > 0)
    }

    async fn list_stale_states(&mut self, year: i32) -> Result<Vec<String>, PricingStoreError> {
        use locations::dsl;

        locations::table
            .filter(dsl::location_type.eq(STATE_LOCATION_TYPE))
            .filter(dsl::is_active.eq(true))
            .filter(dsl::rpp_year.is_null().or(dsl::rpp_year.lt(year)))
            .order(dsl::state_name.asc())
            .select(dsl::state_name)
            .load(&mut *self.conn)
            .await
            .map_err(|error| map_diesel_error(error, "list stale states"))
    }

    async fn recompute_location_pricing(&mut self) -> Result<(), PricingStoreError> {
        sql_query(RECOMPUTE_ALL_SQL)
            .execute(&mut *self.conn)
            .await
            .map_err(|error| map_diesel_error(error, "recompute location pricing"))?;
        Ok(())
    }

    async fn count_location_pricing(&mut self) -> Result<u64, PricingStoreError> {
        let count: i64 = location_pricing::table
            .count()
            .get_result(&mut *self.conn)
            .await
            .map_err(|error| map_diesel_error(error, "count location pricing"))?;
        cast_count(count, "count location pricing")
    }

    async fn commit(mut self: Box<Self>) -> Result<(), PricingStoreError> {
        AnsiTransactionManager::commit_transaction(&mut *self.conn)
            .await
            .map_err(|error| map_diesel_error(error, "commit"))?;
        debug!("pricing transaction committed");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), PricingStoreError> {
        AnsiTransactionManager::rollback_transaction(&mut *self.conn)
            .await
            .map_err(|error| map_diesel_error(error, "rollback"))?;
        debug!("pricing transaction rolled back");
        Ok(())
    }
}
