//! Pricing index refresh backend.
//!
//! Pulls the national CPI and per-state regional price parities, merges them
//! into PostgreSQL inside one transaction, and triggers recomputation of
//! location pricing. Exposed through an admin HTTP endpoint and a CLI.

pub mod bootstrap;
pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
