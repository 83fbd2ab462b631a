//! Response helpers shared by the reqwest-backed index sources.

use reqwest::StatusCode;

/// User-agent sent to every index provider.
pub(crate) const USER_AGENT: &str = "pricing-backend-refresh/0.1";

/// Describe a non-success response as `status N: <body preview>`.
pub(crate) fn status_message(status: StatusCode, body: &[u8]) -> String {
    let preview = body_preview(body);
    if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {preview}", status.as_u16())
    }
}

/// Whitespace-collapsed, length-capped preview of a response body.
pub(crate) fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

/// Transport failure text, flagging timeouts explicitly.
pub(crate) fn transport_message(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        format!("request timed out: {error}")
    } else {
        format!("request failed: {error}")
    }
}
