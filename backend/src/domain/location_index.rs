//! Applies regional price parities to state locations.
//!
//! Matching is exact, case-sensitive equality between the provider's
//! geographic name and `locations.state_name`. Unmatched names are
//! diagnostics only; the completeness guard decides whether the run as a
//! whole is usable.

use tracing::{debug, info};

use crate::domain::ports::{PricingStoreError, PricingTransaction, RefreshError, StateIndexRow};

/// Minimum number of matched states for a run to commit: all 50 states
/// with a small tolerance for provider omissions.
pub const DEFAULT_MIN_UPDATED_STATES: usize = 45;

/// Outcome of applying one snapshot of state indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub updated_count: usize,
    pub unmatched: Vec<String>,
    pub skipped_rows: usize,
}

/// Parse a provider value such as `"1,234.5"`.
///
/// Thousands separators are stripped. Anything that does not parse to a
/// finite number yields `None`.
///
/// # Examples
/// ```
/// use pricing_backend::domain::parse_index_value;
///
/// assert_eq!(parse_index_value("1,234.5"), Some(1234.5));
/// assert_eq!(parse_index_value("N/A"), None);
/// ```
pub fn parse_index_value(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|ch| *ch != ',').collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Overwrite index value and year for every matching state location.
///
/// # Errors
///
/// Propagates store failures; unmatched rows are not errors.
pub async fn apply_state_indices(
    tx: &mut dyn PricingTransaction,
    rows: &[StateIndexRow],
    year: i32,
) -> Result<SyncReport, PricingStoreError> {
    let mut report = SyncReport::default();

    for row in rows {
        let name = row.geo_name.trim();
        let Some(value) = row.value.filter(|value| value.is_finite()) else {
            report.skipped_rows += 1;
            continue;
        };
        if name.is_empty() {
            report.skipped_rows += 1;
            continue;
        }

        if tx.update_state_index(name, value, year).await? {
            debug!(state = name, rpp = value, year, "state index updated");
            report.updated_count += 1;
        } else {
            report.unmatched.push(name.to_owned());
        }
    }

    info!(
        updated = report.updated_count,
        unmatched = report.unmatched.len(),
        skipped = report.skipped_rows,
        year,
        "state indices applied"
    );
    Ok(report)
}

/// Reject a run whose match count fell below `minimum`.
///
/// # Errors
///
/// Returns [`RefreshError::IncompleteSourceData`] on violation.
pub fn check_completeness(report: &SyncReport, minimum: usize) -> Result<(), RefreshError> {
    if report.updated_count < minimum {
        return Err(RefreshError::incomplete_source_data(
            report.updated_count,
            minimum,
        ));
    }
    Ok(())
}
