//! Extractor dispatch and the state shared by every extraction

mod tar;
mod zip;

pub use self::tar::TarExtractor;
pub use self::zip::ZipExtractor;

use crate::{
    error::{ExtractionError, Result},
    format::ArchiveKind,
    progress::{ExtractionProgress, ProgressReporter},
};
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use tokio_util::sync::CancellationToken;

/// Interval between synthesized progress ticks of the external backend.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// How archives are decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Decode in-process. Listings are exact and progress is reported after
    /// every entry.
    #[default]
    Native,
    /// Shell out to `unzip`, `tar` and `gunzip` and scrape their output.
    /// Progress is approximated from elapsed time and output lines.
    External,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Native => "native",
            Backend::External => "external",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(Backend::Native),
            "external" => Ok(Backend::External),
            other => Err(format!("unknown backend '{other}', expected 'native' or 'external'")),
        }
    }
}

/// What happens to a destination directory after a failed or cancelled
/// extraction. Only a directory created by the failed operation is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FailurePolicy {
    #[default]
    RemovePartial,
    KeepPartial,
}

/// Per-operation state handed to the extractors.
pub struct ExtractContext<'a> {
    reporter: &'a dyn ProgressReporter,
    cancellation: CancellationToken,
    tick_interval: Duration,
}

impl<'a> ExtractContext<'a> {
    pub fn new(reporter: &'a dyn ProgressReporter) -> Self {
        Self {
            reporter,
            cancellation: CancellationToken::new(),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns [`ExtractionError::UserCancelled`] once cancellation was requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ExtractionError::UserCancelled)
        } else {
            Ok(())
        }
    }

    pub(crate) fn start(&self, total_files: u64, total_bytes: u64) {
        if !self.is_cancelled() {
            self.reporter.on_start(total_files, total_bytes);
            self.reporter
                .on_progress(ExtractionProgress::starting(total_files, total_bytes));
        }
    }

    /// Forwards a tick to the reporter unless the operation was cancelled.
    pub(crate) fn report(&self, progress: ExtractionProgress) {
        if self.is_cancelled() {
            return;
        }
        tracing::trace!(
            file = progress.current_file(),
            processed = progress.files_processed(),
            total = progress.total_files(),
            "progress"
        );
        self.reporter.on_progress(progress);
    }

    pub(crate) fn finish(&self, message: &str) {
        if !self.is_cancelled() {
            self.reporter.on_finish(message);
        }
    }
}

/// The outcome of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Directory the archive was extracted into
    pub destination: PathBuf,
    /// Number of entries written
    pub files_extracted: u64,
    /// Bytes written, when known. The external backend does not track it.
    pub bytes_written: Option<u64>,
}

/// One extractor per archive family, selected by [`ArchiveKind`].
#[derive(Debug, Clone)]
pub enum ArchiveExtractor {
    Zip(ZipExtractor),
    Tar(TarExtractor),
}

impl ArchiveExtractor {
    /// Selects the extractor for `kind`. 7-Zip and RAR archives have none.
    pub fn for_kind(kind: ArchiveKind, backend: Backend) -> Result<Self> {
        match kind {
            ArchiveKind::Zip => Ok(Self::Zip(ZipExtractor::new(backend))),
            ArchiveKind::Tar
            | ArchiveKind::TarGz
            | ArchiveKind::TarBz2
            | ArchiveKind::TarXz
            | ArchiveKind::Gzip => Ok(Self::Tar(TarExtractor::new(kind, backend)?)),
            ArchiveKind::SevenZip | ArchiveKind::Rar => {
                Err(ExtractionError::unsupported_format(kind.display_name()))
            }
        }
    }

    pub fn kind(&self) -> ArchiveKind {
        match self {
            Self::Zip(_) => ArchiveKind::Zip,
            Self::Tar(tar) => tar.kind(),
        }
    }

    /// Extract `source` into `destination`.
    pub fn extract(
        &self,
        source: &Path,
        destination: &Path,
        ctx: &ExtractContext<'_>,
    ) -> Result<ExtractionSummary> {
        match self {
            Self::Zip(zip) => zip.extract(source, destination, ctx),
            Self::Tar(tar) => tar.extract(source, destination, ctx),
        }
    }

    /// List the entry names of `source` in archive order.
    pub fn list_contents(&self, source: &Path) -> Result<Vec<String>> {
        match self {
            Self::Zip(zip) => zip.list_contents(source),
            Self::Tar(tar) => tar.list_contents(source),
        }
    }

    /// Estimate the extracted size of `source` in bytes.
    pub fn estimate_size(&self, source: &Path) -> Result<u64> {
        match self {
            Self::Zip(zip) => zip.estimate_size(source),
            Self::Tar(tar) => tar.estimate_size(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::CallbackReporter;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_for_kind_rejects_unimplemented_kinds() {
        assert_matches!(
            ArchiveExtractor::for_kind(ArchiveKind::SevenZip, Backend::Native),
            Err(ExtractionError::UnsupportedFormat { .. })
        );
        assert_matches!(
            ArchiveExtractor::for_kind(ArchiveKind::Rar, Backend::External),
            Err(ExtractionError::UnsupportedFormat { .. })
        );
    }

    #[test]
    fn test_for_kind_dispatch() {
        for kind in ArchiveKind::all().filter(ArchiveKind::is_supported_for_extraction) {
            let extractor = ArchiveExtractor::for_kind(kind, Backend::Native).unwrap();
            assert_eq!(extractor.kind(), kind);
        }
    }

    #[test]
    fn test_context_drops_ticks_after_cancellation() {
        let ticks = AtomicUsize::new(0);
        let reporter = CallbackReporter::new(|_| {
            ticks.fetch_add(1, Ordering::SeqCst);
        });
        let token = CancellationToken::new();
        let ctx = ExtractContext::new(&reporter).with_cancellation(token.clone());

        ctx.report(ExtractionProgress::new("a", 1, 2, 0, 0));
        token.cancel();
        ctx.report(ExtractionProgress::new("b", 2, 2, 0, 0));

        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert_matches!(ctx.check_cancelled(), Err(ExtractionError::UserCancelled));
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("External".parse::<Backend>(), Ok(Backend::External));
        assert!("7zip".parse::<Backend>().is_err());
    }
}
