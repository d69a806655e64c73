//! Input rows and identifier sanitization.
//!
//! The library consumes an already-parsed, ordered sequence of
//! [`InputRow`]s; tabular parsing and schema validation belong to the
//! caller (the `skupack` binary does both for CSV input). What the
//! library does own is turning a caller-supplied identifier into a safe
//! filename stem, since the identifier names files on disk and entries in
//! the archives.

use serde::{Deserialize, Serialize};

/// One row of the input table: a stable identifier (SKU) and the remote
/// image URL it names. Immutable for the lifetime of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputRow {
    pub identifier: String,
    pub source_url: String,
}

impl InputRow {
    pub fn new(identifier: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            source_url: source_url.into(),
        }
    }
}

/// Derive a safe filename stem from a caller-supplied identifier.
///
/// Keeps alphanumerics, `-`, `_`, and interior `.`; every other
/// character (path separators included) becomes `_`. Leading and
/// trailing dots are stripped so a stem can never be `.`, `..`, or a
/// dotfile. An empty result means the identifier is unusable and the row
/// must be skipped.
pub fn sanitize_identifier(raw: &str) -> String {
    let stem: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    stem.trim_matches('.').to_string()
}
