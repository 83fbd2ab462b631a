//! PostgreSQL persistence adapter using Diesel ORM.
//!
//! Provides the transactional implementation of the `PricingStore` port
//! backed by `diesel-async` and `bb8` connection pooling. Row structs and
//! schema definitions stay internal to this module.
//!
//! # Example
//!
//! ```ignore
//! use pricing_backend::outbound::persistence::{DbPool, DieselPricingStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/pricing")).await?;
//! let store = DieselPricingStore::new(pool);
//! ```

pub(crate) mod diesel_helpers;
mod diesel_pricing_store;
mod pool;
mod schema;

pub use diesel_pricing_store::{DieselPricingStore, DieselPricingTransaction};
pub use pool::{DbPool, OwnedConnection, PoolConfig, PoolError};
