//! Diesel table definitions for the pricing tables.
//!
//! These definitions must match the database migrations, which live outside
//! this crate. `location_pricing` is owned by the
//! `recompute_location_pricing` function; this crate only counts its rows.

diesel::table! {
    /// Macroeconomic index observations, one row per series period.
    macro_factors (factor_type, series_id, year, period) {
        /// Index family, e.g. `CPI`.
        factor_type -> Text,
        /// Provider series identifier.
        series_id -> Text,
        year -> Int4,
        /// Provider period label, e.g. `M01`.
        period -> Text,
        value -> Float8,
        /// At most one `true` per (factor_type, series_id).
        is_baseline -> Bool,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// States and cities that carry price estimates.
    locations (id) {
        id -> Uuid,
        slug -> Text,
        /// `state` or `city`.
        #[sql_name = "type"]
        location_type -> Text,
        state_code -> Text,
        state_name -> Text,
        city_name -> Nullable<Text>,
        is_active -> Bool,
        /// Regional price parity; set together with `rpp_year`.
        rpp_index -> Nullable<Float8>,
        rpp_year -> Nullable<Int4>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Derived estimates, one row per (service, location).
    location_pricing (service_id, location_id) {
        service_id -> Uuid,
        location_id -> Uuid,
    }
}
