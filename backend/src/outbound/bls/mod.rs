//! BLS outbound adapters.
//!
//! This module provides a thin HTTP implementation of the `CpiSource` port
//! against the BLS public time-series API (v2).

mod dto;
mod http_source;

pub use http_source::{BlsCpiHttpSource, DEFAULT_BLS_BASE_URL};
