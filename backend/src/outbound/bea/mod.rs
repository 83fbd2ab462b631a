//! BEA outbound adapters.
//!
//! This module provides a thin HTTP implementation of the `RppSource` port
//! against the BEA Regional dataset (table `SARPP`).

mod dto;
mod http_source;

pub use http_source::{BeaApiKey, BeaRppHttpSource, DEFAULT_BEA_BASE_URL};
