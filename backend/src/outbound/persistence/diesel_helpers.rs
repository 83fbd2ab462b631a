//! Shared error mapping for the Diesel pricing store.

use tracing::debug;

use crate::domain::ports::PricingStoreError;

use super::pool::PoolError;

/// Map pool errors to store connection errors.
pub fn map_pool_error(error: PoolError) -> PricingStoreError {
    match error {
        PoolError::Checkout { message }
        | PoolError::Build { message }
        | PoolError::Sizing { message } => PricingStoreError::connection(message),
    }
}

/// Map Diesel errors to store errors, tagging the failed operation.
///
/// Closed connections become connection errors; everything else is a query
/// error carrying the operation name.
pub fn map_diesel_error(error: diesel::result::Error, operation: &str) -> PricingStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), %operation, "diesel operation failed");
        }
        _ => debug!(%error, %operation, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            PricingStoreError::connection(format!("{operation}: database connection closed"))
        }
        DieselError::NotFound => PricingStoreError::query(format!("{operation}: record not found")),
        DieselError::DatabaseError(_, info) => {
            PricingStoreError::query(format!("{operation}: {}", info.message()))
        }
        other => PricingStoreError::query(format!("{operation}: {other}")),
    }
}

/// Convert a row count reported by PostgreSQL into `u64`.
pub fn cast_count(count: i64, operation: &str) -> Result<u64, PricingStoreError> {
    u64::try_from(count)
        .map_err(|_| PricingStoreError::query(format!("{operation}: negative row count {count}")))
}
