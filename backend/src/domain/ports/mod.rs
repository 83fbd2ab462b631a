//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports ([`CpiSource`], [`RppSource`], [`PricingStore`]) describe
//! what the refresh pipeline needs from infrastructure. The driving port
//! [`PricingRefreshCommand`] is what inbound adapters call.

mod macros;
pub(crate) use macros::define_port_error;

mod cpi_source;
mod pricing_refresh_command;
mod pricing_store;
mod rpp_source;

#[cfg(test)]
pub use cpi_source::MockCpiSource;
pub use cpi_source::{CpiReading, CpiSource, CpiSourceError};
#[cfg(test)]
pub use pricing_refresh_command::MockPricingRefreshCommand;
pub use pricing_refresh_command::{
    BaselineSummary, IndexProvider, PricingRefreshCommand, RefreshError, RefreshRun, RppSummary,
};
pub use pricing_store::{
    FactorPeriod, FactorType, MacroFactorReading, MacroSeries, PricingStore, PricingStoreError,
    PricingTransaction,
};
#[cfg(test)]
pub use rpp_source::MockRppSource;
pub use rpp_source::{
    LineCode, LineCodeValidationError, RppSource, RppSourceError, StateIndexRow,
    StateIndexSnapshot, YearWindow,
};
