//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **bls**: reqwest-backed CPI source (`CpiSource`)
//! - **bea**: reqwest-backed regional price parity source (`RppSource`)
//! - **persistence**: Diesel/PostgreSQL transactional store (`PricingStore`)
//!
//! Adapters are thin translators between wire or row formats and domain
//! types. They contain no business logic.

pub mod bea;
pub mod bls;
mod http_support;
pub mod persistence;
