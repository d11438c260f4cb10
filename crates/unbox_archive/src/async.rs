//! Async archive extraction using tokio

use crate::{
    error::{ExtractionError, Result},
    extractor::ExtractionSummary,
    manager::ArchiveManager,
    progress::{ExtractionProgress, ProgressReporter},
};
use parking_lot::Mutex;
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::task::{self, JoinHandle};
use tokio_util::sync::CancellationToken;

/// Runs extractions of an [`ArchiveManager`] on the blocking thread pool.
#[derive(Debug, Clone, Default)]
pub struct AsyncArchiveManager {
    inner: Arc<ArchiveManager>,
}

impl AsyncArchiveManager {
    pub fn new(manager: ArchiveManager) -> Self {
        Self {
            inner: Arc::new(manager),
        }
    }

    pub fn manager(&self) -> &ArchiveManager {
        &self.inner
    }

    /// Starts extracting `source` below `destination_dir` and returns a
    /// handle to the in-flight operation. Must be called within a tokio
    /// runtime.
    pub fn spawn_extract<P>(
        &self,
        source: impl Into<PathBuf>,
        destination_dir: impl Into<PathBuf>,
        reporter: P,
    ) -> ExtractionTask
    where
        P: ProgressReporter + 'static,
    {
        let source = source.into();
        let destination_dir = destination_dir.into();
        let cancellation = CancellationToken::new();
        let extracting = Arc::new(AtomicBool::new(true));

        let gate = Arc::new(Mutex::new(true));

        let manager = self.inner.clone();
        let reporter = GatedReporter {
            inner: reporter,
            open: gate.clone(),
        };
        let token = cancellation.clone();
        let flag = extracting.clone();
        let handle = task::spawn_blocking(move || {
            let result =
                manager.extract_with_cancellation(&source, &destination_dir, &reporter, token);
            flag.store(false, Ordering::SeqCst);
            result
        });

        ExtractionTask {
            handle,
            control: CancelHandle {
                cancellation,
                extracting,
                gate,
            },
        }
    }

    /// List the entries of `source` without blocking the runtime.
    pub async fn list_archive_contents(&self, source: &Path) -> Result<Vec<String>> {
        let manager = self.inner.clone();
        let source = source.to_owned();
        task::spawn_blocking(move || manager.list_archive_contents(&source))
            .await
            .map_err(join_error)?
    }

    /// Estimate the extracted size of `source` without blocking the runtime.
    pub async fn estimate_archive_size(&self, source: &Path) -> Result<u64> {
        let manager = self.inner.clone();
        let source = source.to_owned();
        task::spawn_blocking(move || manager.estimate_archive_size(&source))
            .await
            .map_err(join_error)?
    }
}

/// An extraction running in the background.
pub struct ExtractionTask {
    handle: JoinHandle<Result<ExtractionSummary>>,
    control: CancelHandle,
}

impl ExtractionTask {
    /// See [`CancelHandle::cancel`].
    pub fn cancel(&self) {
        self.control.cancel();
    }

    /// Whether the extraction is still in flight and was not cancelled.
    pub fn is_extracting(&self) -> bool {
        self.control.is_extracting()
    }

    /// A handle that can cancel this extraction from elsewhere, e.g. a
    /// Ctrl-C handler.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.control.clone()
    }

    /// Waits for the extraction to finish. Resolves to
    /// [`ExtractionError::UserCancelled`] if cancellation stopped the
    /// extraction before it completed.
    pub async fn wait(self) -> Result<ExtractionSummary> {
        self.handle.await.map_err(join_error)?
    }
}

/// Cancels an [`ExtractionTask`].
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancellation: CancellationToken,
    extracting: Arc<AtomicBool>,
    gate: Arc<Mutex<bool>>,
}

impl CancelHandle {
    /// Requests cancellation. No progress is reported after this returns and
    /// a running external tool is killed.
    ///
    /// Waits for a progress callback that is currently running, so it must
    /// not be called from within the reporter.
    pub fn cancel(&self) {
        *self.gate.lock() = false;
        self.cancellation.cancel();
        self.extracting.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn is_extracting(&self) -> bool {
        self.extracting.load(Ordering::SeqCst)
    }
}

/// Drops ticks once the gate was closed by [`ExtractionTask::cancel`].
struct GatedReporter<P> {
    inner: P,
    open: Arc<Mutex<bool>>,
}

impl<P: ProgressReporter> ProgressReporter for GatedReporter<P> {
    fn on_start(&self, total_files: u64, total_bytes: u64) {
        let open = self.open.lock();
        if *open {
            self.inner.on_start(total_files, total_bytes);
        }
    }

    fn on_progress(&self, progress: ExtractionProgress) {
        let open = self.open.lock();
        if *open {
            self.inner.on_progress(progress);
        }
    }

    fn on_finish(&self, message: &str) {
        let open = self.open.lock();
        if *open {
            self.inner.on_finish(message);
        }
    }
}

fn join_error(err: task::JoinError) -> ExtractionError {
    ExtractionError::Io(std::io::Error::other(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::CallbackReporter;
    use assert_matches::assert_matches;
    use std::fs::File;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    fn create_test_tar_gz(entries: usize) -> (TempDir, PathBuf) {
        let temp_dir = tempfile::tempdir().unwrap();
        let tar_path = temp_dir.path().join("test.tar.gz");

        let file = File::create(&tar_path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut tar = tar::Builder::new(encoder);

        for idx in 0..entries {
            let mut header = tar::Header::new_gnu();
            header.set_path(format!("file-{idx}.txt")).unwrap();
            header.set_size(5);
            header.set_mode(0o644);
            header.set_cksum();
            tar.append(&header, "hello".as_bytes()).unwrap();
        }

        tar.into_inner().unwrap().finish().unwrap();
        (temp_dir, tar_path)
    }

    #[tokio::test]
    async fn test_async_extract_tar_gz() {
        let (temp_dir, archive_path) = create_test_tar_gz(3);
        let destination = temp_dir.path().join("out");

        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let reporter = CallbackReporter::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let manager = AsyncArchiveManager::default();
        let task = manager.spawn_extract(&archive_path, &destination, reporter);
        let summary = task.wait().await.unwrap();

        assert_eq!(summary.files_extracted, 3);
        assert_eq!(
            tokio::fs::read_to_string(destination.join("file-2.txt"))
                .await
                .unwrap(),
            "hello"
        );
        // one starting tick plus one per entry
        assert_eq!(ticks.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_cancel_stops_progress() {
        let (temp_dir, archive_path) = create_test_tar_gz(200);
        let destination = temp_dir.path().join("out");

        let after_cancel = Arc::new(AtomicUsize::new(0));
        let cancelled = Arc::new(AtomicBool::new(false));
        let reporter = {
            let after_cancel = after_cancel.clone();
            let cancelled = cancelled.clone();
            CallbackReporter::new(move |_| {
                if cancelled.load(Ordering::SeqCst) {
                    after_cancel.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        let task = AsyncArchiveManager::default().spawn_extract(
            &archive_path,
            &destination,
            reporter,
        );
        task.cancel();
        cancelled.store(true, Ordering::SeqCst);

        assert!(!task.is_extracting());
        // the extraction may have completed before the cancellation landed
        assert_matches!(task.wait().await, Ok(_) | Err(ExtractionError::UserCancelled));
        assert_eq!(after_cancel.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_async_listing() {
        let (_temp_dir, archive_path) = create_test_tar_gz(2);
        let manager = AsyncArchiveManager::default();
        assert_eq!(
            manager.list_archive_contents(&archive_path).await.unwrap(),
            vec!["file-0.txt", "file-1.txt"]
        );
        assert!(manager.estimate_archive_size(&archive_path).await.unwrap() > 0);
    }
}
