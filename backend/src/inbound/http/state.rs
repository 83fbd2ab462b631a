//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only depend
//! on the refresh port and stay testable without I/O.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::ports::PricingRefreshCommand;

/// Shared secret expected in the `x-admin-key` header.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminApiKey(String);

impl AdminApiKey {
    /// Wrap a configured key; blank keys count as unconfigured.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Compare against a presented key without short-circuiting on the
    /// first differing byte.
    pub fn matches(&self, presented: &str) -> bool {
        let expected = self.0.as_bytes();
        let presented = presented.as_bytes();
        if expected.len() != presented.len() {
            return false;
        }
        expected
            .iter()
            .zip(presented)
            .fold(0_u8, |diff, (left, right)| diff | (left ^ right))
            == 0
    }
}

impl fmt::Debug for AdminApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AdminApiKey(<redacted>)")
    }
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub refresh: Arc<dyn PricingRefreshCommand>,
    /// `None` rejects every admin request.
    pub admin_key: Option<AdminApiKey>,
    /// Held for the duration of a refresh; overlapping requests see it locked.
    pub refresh_gate: Arc<Mutex<()>>,
}

impl HttpState {
    /// Construct state around a refresh command.
    ///
    /// # Examples
    /// ```ignore
    /// let state = HttpState::new(Arc::new(service), AdminApiKey::new(key));
    /// ```
    pub fn new(refresh: Arc<dyn PricingRefreshCommand>, admin_key: Option<AdminApiKey>) -> Self {
        Self {
            refresh,
            admin_key,
            refresh_gate: Arc::new(Mutex::new(())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::exact("s3cret", true)]
    #[case::different("s3creT", false)]
    #[case::prefix("s3c", false)]
    #[case::empty("", false)]
    fn key_comparison(#[case] presented: &str, #[case] expected: bool) {
        let key = AdminApiKey::new("s3cret").expect("non-blank key");
        assert_eq!(key.matches(presented), expected);
    }

    #[rstest]
    fn blank_keys_are_unconfigured() {
        assert!(AdminApiKey::new("   ").is_none());
    }

    #[rstest]
    fn debug_output_is_redacted() {
        let key = AdminApiKey::new("s3cret").expect("non-blank key");
        assert_eq!(format!("{key:?}"), "AdminApiKey(<redacted>)");
    }
}
