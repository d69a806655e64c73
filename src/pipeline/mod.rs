//! Pipeline stages for the fetch → normalize → stage → archive run.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap
//! implementations without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ fetch ──▶ normalize ──▶ stage ──▶ archive
//! (rows)    (HTTP)    (decode +     (content   (zip per
//!                      re-encode)    roots)     encoding)
//! ```
//!
//! 1. [`input`]     — input rows and identifier-to-filename sanitization
//! 2. [`fetch`]     — one GET per row; the only stage with network I/O
//! 3. [`normalize`] — decode bytes, apply the per-target alpha policy,
//!    re-encode; CPU-bound, driven through `spawn_blocking`
//! 4. [`stage`]     — idempotent root creation, keyed overwrite-writes,
//!    pre-run clearing
//! 5. [`archive`]   — walk a root and pack matching files into a fresh
//!    deflate ZIP, atomically
//!
//! Data flows strictly downstream; no stage reads back from a later one.

pub mod archive;
pub mod fetch;
pub mod input;
pub mod normalize;
pub mod stage;
