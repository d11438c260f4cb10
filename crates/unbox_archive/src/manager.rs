//! The entry point tying detection, validation and extraction together

use crate::{
    detect,
    error::{ExtractionError, Result},
    extractor::{
        ArchiveExtractor, Backend, ExtractContext, ExtractionSummary, FailurePolicy,
        DEFAULT_TICK_INTERVAL,
    },
    format::{archive_base_name, ArchiveKind},
    progress::ProgressReporter,
};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use tokio_util::sync::CancellationToken;

/// Configuration shared by every operation of an [`ArchiveManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    pub backend: Backend,
    pub tick_interval: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Builder for configuring an [`ArchiveManager`]
#[derive(Debug, Default)]
pub struct ArchiveManagerBuilder {
    options: ExtractOptions,
}

impl ArchiveManagerBuilder {
    /// Create a new builder with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode in-process or through the external tools
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.options.backend = backend;
        self
    }

    /// Interval between progress ticks of the external backend
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.options.tick_interval = tick_interval;
        self
    }

    /// What to do with partial output after a failure
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.options.failure_policy = failure_policy;
        self
    }

    /// Build the manager
    pub fn build(self) -> ArchiveManager {
        ArchiveManager::new(self.options)
    }
}

/// Detects, validates and extracts archives.
#[derive(Debug, Clone, Default)]
pub struct ArchiveManager {
    options: ExtractOptions,
}

impl ArchiveManager {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }

    pub fn builder() -> ArchiveManagerBuilder {
        ArchiveManagerBuilder::new()
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Detect the archive kind of `path` from its file name.
    pub fn detect(&self, path: impl AsRef<Path>) -> Option<ArchiveKind> {
        detect::detect(path)
    }

    /// Whether `kind` can be extracted.
    pub fn is_supported_for_extraction(kind: ArchiveKind) -> bool {
        kind.is_supported_for_extraction()
    }

    /// The directory `source` is extracted into when `destination_dir` is
    /// chosen: `destination_dir` itself if it does not exist yet, otherwise a
    /// sub-directory named after the archive.
    pub fn resolve_destination(&self, source: &Path, destination_dir: &Path) -> PathBuf {
        if destination_dir.exists() {
            destination_dir.join(archive_base_name(source))
        } else {
            destination_dir.to_path_buf()
        }
    }

    /// Extract `source` below `destination_dir`, see [`Self::resolve_destination`].
    pub fn extract(
        &self,
        source: &Path,
        destination_dir: &Path,
        reporter: &dyn ProgressReporter,
    ) -> Result<ExtractionSummary> {
        self.extract_with_cancellation(source, destination_dir, reporter, CancellationToken::new())
    }

    /// Like [`Self::extract`], stopping early once `cancellation` is cancelled.
    pub fn extract_with_cancellation(
        &self,
        source: &Path,
        destination_dir: &Path,
        reporter: &dyn ProgressReporter,
        cancellation: CancellationToken,
    ) -> Result<ExtractionSummary> {
        let (kind, extractor) = self.prepare(source)?;
        let destination = self.resolve_destination(source, destination_dir);
        let created = !destination.exists();

        let _span = tracing::info_span!(
            "extract",
            source = %source.display(),
            destination = %destination.display(),
            kind = kind.id(),
            backend = %self.options.backend,
        )
        .entered();
        tracing::debug!("starting extraction");

        let ctx = ExtractContext::new(reporter)
            .with_cancellation(cancellation)
            .with_tick_interval(self.options.tick_interval);

        match extractor.extract(source, &destination, &ctx) {
            Ok(summary) => {
                tracing::info!(files = summary.files_extracted, "extraction finished");
                Ok(summary)
            }
            Err(err) => {
                tracing::debug!("extraction failed: {err}");
                self.clean_up(&destination, created);
                Err(err)
            }
        }
    }

    /// List the entries of `source` in archive order.
    pub fn list_archive_contents(&self, source: &Path) -> Result<Vec<String>> {
        let (_, extractor) = self.prepare(source)?;
        extractor.list_contents(source)
    }

    /// Estimate the extracted size of `source` in bytes.
    pub fn estimate_archive_size(&self, source: &Path) -> Result<u64> {
        let (_, extractor) = self.prepare(source)?;
        extractor.estimate_size(source)
    }

    fn prepare(&self, source: &Path) -> Result<(ArchiveKind, ArchiveExtractor)> {
        let kind = detect::detect(source).ok_or_else(|| {
            ExtractionError::unsupported_format(source.display().to_string())
        })?;
        detect::validate(source)?;
        let extractor = ArchiveExtractor::for_kind(kind, self.options.backend)?;
        Ok((kind, extractor))
    }

    fn clean_up(&self, destination: &Path, created: bool) {
        if self.options.failure_policy == FailurePolicy::KeepPartial || !created {
            return;
        }
        if destination.exists() {
            tracing::debug!("removing partial output {}", destination.display());
            if let Err(err) = fs_err::remove_dir_all(destination) {
                tracing::warn!("failed to remove partial output: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{CallbackReporter, NoProgressReporter};
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_resolve_destination() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArchiveManager::default();
        let source = Path::new("/downloads/photos.tar.gz");

        let fresh = dir.path().join("fresh");
        assert_eq!(manager.resolve_destination(source, &fresh), fresh);
        assert_eq!(
            manager.resolve_destination(source, dir.path()),
            dir.path().join("photos")
        );
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("notes.rar2");
        fs_err::write(&source, b"data").unwrap();

        let manager = ArchiveManager::default();
        assert_matches!(
            manager.extract(&source, dir.path(), &NoProgressReporter),
            Err(ExtractionError::UnsupportedFormat { .. })
        );
    }

    #[test]
    fn test_recognized_but_unimplemented_kinds_are_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArchiveManager::default();
        for name in ["bundle.7z", "bundle.rar"] {
            let source = dir.path().join(name);
            fs_err::write(&source, b"data").unwrap();
            assert!(manager.detect(&source).is_some());
            assert_matches!(
                manager.extract(&source, &dir.path().join("out"), &NoProgressReporter),
                Err(ExtractionError::UnsupportedFormat { .. })
            );
        }
    }

    #[test]
    fn test_validation_runs_before_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ArchiveManager::default();

        assert_matches!(
            manager.list_archive_contents(&dir.path().join("missing.zip")),
            Err(ExtractionError::FileNotFound { .. })
        );

        let empty = dir.path().join("empty.tar.gz");
        fs_err::write(&empty, b"").unwrap();
        assert_matches!(
            manager.estimate_archive_size(&empty),
            Err(ExtractionError::CorruptedArchive { .. })
        );
    }

    #[test]
    fn test_pre_cancelled_extraction_reports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("data.tar");
        fs_err::write(&source, vec![0u8; 1024]).unwrap();
        let destination = dir.path().join("out");

        let ticks = AtomicUsize::new(0);
        let reporter = CallbackReporter::new(|_| {
            ticks.fetch_add(1, Ordering::SeqCst);
        });
        let token = CancellationToken::new();
        token.cancel();

        let result = ArchiveManager::default().extract_with_cancellation(
            &source,
            &destination,
            &reporter,
            token,
        );
        assert_matches!(result, Err(ExtractionError::UserCancelled));
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
        assert!(!destination.exists());
    }
}
