//! Image fetching: one GET per row, typed failures, no retries.
//!
//! The URL check is purely syntactic; rows that fail it never touch the
//! network. Everything else is a single GET against the shared
//! [`reqwest::Client`] (one client per run, carrying the configured
//! timeout). Per the propagation policy every failure here is a
//! [`RowError`]: the orchestrator records it and moves on to the next
//! row.

use crate::error::RowError;
use tracing::debug;

/// Check that the input string is an HTTP(S) URL by prefix.
///
/// No DNS or reachability check; a row like `not-a-url` is rejected
/// before any network activity.
pub fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Fetch `url` and return the full response body.
///
/// Exactly one attempt. `200` is the only success status; any other
/// status maps to [`RowError::HttpStatus`] and transport failures map to
/// [`RowError::Network`].
pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, RowError> {
    if !is_http_url(url) {
        return Err(RowError::InvalidUrl {
            url: url.to_string(),
        });
    }

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| RowError::Network {
            detail: e.to_string(),
        })?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(RowError::HttpStatus {
            status: status.as_u16(),
        });
    }

    let bytes = response.bytes().await.map_err(|e| RowError::Network {
        detail: e.to_string(),
    })?;
    debug!("Fetched {} → {} bytes", url, bytes.len());

    Ok(bytes.to_vec())
}
