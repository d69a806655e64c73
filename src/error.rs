//! Error types for the skupack library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PipelineError`] — **Fatal**: the run cannot proceed at all
//!   (unusable content root, archive write failure, bad configuration).
//!   Returned as `Err(PipelineError)` from the top-level `run*` functions.
//!
//! * [`RowError`] — **Non-fatal**: a single input row failed (bad URL,
//!   HTTP error, undecodable payload) but every other row is fine. Stored
//!   inside [`crate::output::RowResult`] so callers can inspect partial
//!   success rather than losing the whole batch to one bad row.
//!
//! The separation mirrors the propagation policy: row-level failures are
//! recovered locally and reported as diagnostics; infrastructure failures
//! abort the run immediately, since an unusable output location makes
//! continuing meaningless.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the skupack library.
///
/// Row-level failures use [`RowError`] and are stored in
/// [`crate::output::RowResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not create, clear, or write into a content root.
    #[error("Failed to write staged output '{path}': {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Archive construction failed partway; no partial archive is left
    /// in place.
    #[error("Failed to build archive '{path}': {detail}")]
    Archiving { path: PathBuf, detail: String },

    /// Unexpected internal error (task join, runtime construction).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single input row.
///
/// Stored alongside [`crate::output::RowResult`] when a row is skipped.
/// The overall run continues; the row still counts toward progress.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum RowError {
    /// The source URL does not start with `http://` or `https://`.
    /// No network call is made for such rows.
    #[error("invalid URL '{url}': expected http:// or https://")]
    InvalidUrl { url: String },

    /// The GET completed but the server answered with a non-200 status.
    #[error("HTTP status {status}")]
    HttpStatus { status: u16 },

    /// Transport-level failure: connection refused, DNS, TLS.
    #[error("network error: {detail}")]
    Network { detail: String },

    /// The response body could not be decoded as an image, or the decoded
    /// image could not be re-encoded for the target.
    #[error("image decode failed: {detail}")]
    Decode { detail: String },

    /// The identifier sanitized down to an empty filename stem.
    #[error("identifier '{identifier}' is empty after sanitization")]
    EmptyIdentifier { identifier: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_display_names_schemes() {
        let e = RowError::InvalidUrl {
            url: "ftp://host/img.png".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("ftp://host/img.png"), "got: {msg}");
        assert!(msg.contains("http://"), "got: {msg}");
    }

    #[test]
    fn http_status_display() {
        let e = RowError::HttpStatus { status: 404 };
        assert!(e.to_string().contains("404"));
    }

    #[test]
    fn staging_display_includes_path() {
        let e = PipelineError::Staging {
            path: PathBuf::from("/srv/webp/A1.webp"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = e.to_string();
        assert!(msg.contains("/srv/webp/A1.webp"), "got: {msg}");
    }

    #[test]
    fn row_error_round_trips_through_serde() {
        let e = RowError::Network {
            detail: "connection refused".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: RowError = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, RowError::Network { .. }));
    }
}
