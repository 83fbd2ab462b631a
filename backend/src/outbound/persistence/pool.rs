//! bb8 pool of `diesel-async` PostgreSQL connections.
//!
//! A refresh run holds one connection for its whole transaction, so checkout
//! hands out owned connections. A connection dropped inside an open
//! transaction is discarded by the pool instead of being reused.

use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};

/// Pooled connection that owns its slot until dropped.
pub type OwnedConnection = PooledConnection<'static, AsyncPgConnection>;

const DEFAULT_MAX_SIZE: u32 = 4;
const DEFAULT_CHECKOUT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while building the pool or checking out a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// Sizing rejected before any connection was attempted.
    #[error("invalid pool sizing: {message}")]
    Sizing { message: String },

    /// The pool could not be built, for example an unreachable server.
    #[error("failed to build connection pool: {message}")]
    Build { message: String },

    /// No connection became available within the checkout timeout.
    #[error("failed to get connection from pool: {message}")]
    Checkout { message: String },
}

impl PoolError {
    pub fn sizing(message: impl Into<String>) -> Self {
        Self::Sizing {
            message: message.into(),
        }
    }

    pub fn build(message: impl Into<String>) -> Self {
        Self::Build {
            message: message.into(),
        }
    }

    pub fn checkout(message: impl Into<String>) -> Self {
        Self::Checkout {
            message: message.into(),
        }
    }
}

/// Pool sizing and the URL to connect to.
///
/// ```ignore
/// let config = PoolConfig::new("postgres://localhost/pricing")
///     .with_max_size(2)
///     .with_min_idle(Some(1))
///     .with_checkout_timeout(Duration::from_secs(5));
/// ```
#[derive(Clone)]
pub struct PoolConfig {
    database_url: String,
    max_size: u32,
    min_idle: Option<u32>,
    checkout_timeout: Duration,
}

impl std::fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolConfig")
            .field("database_url", &"<redacted>")
            .field("max_size", &self.max_size)
            .field("min_idle", &self.min_idle)
            .field("checkout_timeout", &self.checkout_timeout)
            .finish()
    }
}

impl PoolConfig {
    /// Four connections, none kept idle, 30 second checkout timeout.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: DEFAULT_MAX_SIZE,
            min_idle: None,
            checkout_timeout: DEFAULT_CHECKOUT_TIMEOUT,
        }
    }

    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_min_idle(mut self, min_idle: Option<u32>) -> Self {
        self.min_idle = min_idle;
        self
    }

    pub fn with_checkout_timeout(mut self, timeout: Duration) -> Self {
        self.checkout_timeout = timeout;
        self
    }

    /// Reject sizing bb8 would otherwise accept and then misbehave on.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Sizing`] for an empty pool, more idle
    /// connections than the maximum, or a zero checkout timeout.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_size == 0 {
            return Err(PoolError::sizing("max size must be at least 1"));
        }
        if let Some(min_idle) = self.min_idle.filter(|idle| *idle > self.max_size) {
            return Err(PoolError::sizing(format!(
                "min idle {min_idle} exceeds max size {}",
                self.max_size
            )));
        }
        if self.checkout_timeout.is_zero() {
            return Err(PoolError::sizing("checkout timeout must be positive"));
        }
        Ok(())
    }
}

/// Shared handle to the connection pool.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Validate `config` and build the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Sizing`] for invalid sizing and
    /// [`PoolError::Build`] when the pool cannot be constructed.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        let PoolConfig {
            database_url,
            max_size,
            min_idle,
            checkout_timeout,
        } = config;
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);

        let inner = Pool::builder()
            .max_size(max_size)
            .min_idle(min_idle)
            .connection_timeout(checkout_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;

        Ok(Self { inner })
    }

    /// Check out a connection that does not borrow the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Checkout`] when no connection frees up within the
    /// checkout timeout.
    pub async fn get_owned(&self) -> Result<OwnedConnection, PoolError> {
        self.inner
            .get_owned()
            .await
            .map_err(|err| PoolError::checkout(err.to_string()))
    }
}
