//! Domain primitives and services of the pricing refresh pipeline.
//!
//! Public surface:
//! - Error (alias to `error::Error`): transport-agnostic error payload.
//! - PricingRefreshService: orchestrates one transactional refresh run.
//! - `ports`: traits implemented by the inbound and outbound adapters.

pub mod error;
pub mod location_index;
pub mod macro_factors;
pub mod ports;
pub mod pricing_recompute;
pub mod pricing_refresh;

pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::location_index::{
    DEFAULT_MIN_UPDATED_STATES, SyncReport, apply_state_indices, check_completeness,
    parse_index_value,
};
pub use self::macro_factors::{BaselineOutcome, ensure_baseline, upsert_reading};
pub use self::pricing_recompute::recompute_all;
pub use self::pricing_refresh::{
    DEFAULT_BASELINE_PERIOD, DEFAULT_BASELINE_YEAR, DEFAULT_CPI_SERIES_ID, LineCodeSource,
    PricingRefreshService, RefreshConfig, RefreshStage,
};
