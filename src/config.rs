//! Configuration types for a pipeline run.
//!
//! All run behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. Every path the pipeline touches (the two
//! content roots and the two archive outputs) is an explicit field here;
//! there are no module-level directory names and no reliance on the
//! process working directory.

use crate::error::PipelineError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::{Path, PathBuf};

/// Configuration for one fetch → normalize → stage → archive run.
///
/// Built via [`PipelineConfig::builder()`], or with
/// [`PipelineConfig::with_out_dir`] to place roots and archives under a
/// single output directory.
///
/// # Example
/// ```rust
/// use skupack::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .out_dir("out")
///     .concurrency(8)
///     .build()
///     .unwrap();
/// assert!(config.webp_root.ends_with("webp"));
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Content root for staged WEBP files. Cleared at run start.
    pub webp_root: PathBuf,

    /// Content root for converted JPEG files. Cleared at run start even
    /// though it is only populated in the conversion phase, so the JPEG
    /// archive reflects only the current run.
    pub jpeg_root: PathBuf,

    /// Output path of the WEBP archive. Rewritten (not appended) per run.
    pub webp_archive: PathBuf,

    /// Output path of the JPEG archive. Rewritten (not appended) per run.
    pub jpeg_archive: PathBuf,

    /// Number of rows fetched and normalized in flight at once. Default: 4.
    ///
    /// Fetching is network-bound; a small pool cuts wall-clock time
    /// without hammering the remote host. `1` reproduces strictly
    /// sequential processing.
    pub concurrency: usize,

    /// Timeout for each image GET in seconds. Default: 30.
    pub fetch_timeout_secs: u64,

    /// Progress callback fired per phase change and per completed row.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_out_dir("out")
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("webp_root", &self.webp_root)
            .field("jpeg_root", &self.jpeg_root)
            .field("webp_archive", &self.webp_archive)
            .field("jpeg_archive", &self.jpeg_archive)
            .field("concurrency", &self.concurrency)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::with_out_dir("out"),
        }
    }

    /// Place both content roots and both archives under `dir`:
    /// `<dir>/webp`, `<dir>/jpeg`, `<dir>/webp.zip`, `<dir>/jpeg.zip`.
    pub fn with_out_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            webp_root: dir.join("webp"),
            jpeg_root: dir.join("jpeg"),
            webp_archive: dir.join("webp.zip"),
            jpeg_archive: dir.join("jpeg.zip"),
            concurrency: 4,
            fetch_timeout_secs: 30,
            progress_callback: None,
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Re-root every path under `dir` (see [`PipelineConfig::with_out_dir`]).
    pub fn out_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let callback = self.config.progress_callback.take();
        let mut config = PipelineConfig::with_out_dir(dir);
        config.concurrency = self.config.concurrency;
        config.fetch_timeout_secs = self.config.fetch_timeout_secs;
        config.progress_callback = callback;
        self.config = config;
        self
    }

    pub fn webp_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.webp_root = path.into();
        self
    }

    pub fn jpeg_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.jpeg_root = path.into();
        self
    }

    pub fn webp_archive(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.webp_archive = path.into();
        self
    }

    pub fn jpeg_archive(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.jpeg_archive = path.into();
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.webp_root == c.jpeg_root {
            return Err(PipelineError::InvalidConfig(format!(
                "WEBP and JPEG roots must differ, both are '{}'",
                c.webp_root.display()
            )));
        }
        if c.webp_archive == c.jpeg_archive {
            return Err(PipelineError::InvalidConfig(format!(
                "WEBP and JPEG archive paths must differ, both are '{}'",
                c.webp_archive.display()
            )));
        }
        if c.concurrency == 0 {
            return Err(PipelineError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_out_dir_places_all_paths() {
        let c = PipelineConfig::with_out_dir("/tmp/run");
        assert_eq!(c.webp_root, PathBuf::from("/tmp/run/webp"));
        assert_eq!(c.jpeg_root, PathBuf::from("/tmp/run/jpeg"));
        assert_eq!(c.webp_archive, PathBuf::from("/tmp/run/webp.zip"));
        assert_eq!(c.jpeg_archive, PathBuf::from("/tmp/run/jpeg.zip"));
    }

    #[test]
    fn builder_clamps_concurrency() {
        let c = PipelineConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn builder_rejects_identical_roots() {
        let err = PipelineConfig::builder()
            .webp_root("same")
            .jpeg_root("same")
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)));
    }

    #[test]
    fn out_dir_preserves_tuning_fields() {
        let c = PipelineConfig::builder()
            .concurrency(9)
            .fetch_timeout_secs(7)
            .out_dir("elsewhere")
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 9);
        assert_eq!(c.fetch_timeout_secs, 7);
        assert!(c.webp_root.starts_with("elsewhere"));
    }
}
