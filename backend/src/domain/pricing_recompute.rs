//! Trigger for the external location pricing recompute.

use tracing::info;

use crate::domain::ports::{PricingStoreError, PricingTransaction};

/// Recompute every location/service estimate and return the resulting row
/// count. Safe to repeat: the recompute overwrites its own rows.
///
/// # Errors
///
/// Propagates store failures.
pub async fn recompute_all(tx: &mut dyn PricingTransaction) -> Result<u64, PricingStoreError> {
    tx.recompute_location_pricing().await?;
    let total = tx.count_location_pricing().await?;
    info!(total_estimates = total, "location pricing recomputed");
    Ok(total)
}
