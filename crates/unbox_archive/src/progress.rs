//! Progress reporting for archive operations

/// An immutable snapshot of extraction progress.
///
/// A fresh value is created for every tick and handed to the reporter by
/// value. A total of `0` means the total is unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionProgress {
    current_file: String,
    files_processed: u64,
    total_files: u64,
    bytes_processed: u64,
    total_bytes: u64,
}

impl ExtractionProgress {
    /// Create a new progress snapshot. `files_processed` is clamped to
    /// `total_files` when the total is known.
    pub fn new(
        current_file: impl Into<String>,
        files_processed: u64,
        total_files: u64,
        bytes_processed: u64,
        total_bytes: u64,
    ) -> Self {
        let files_processed = if total_files > 0 {
            files_processed.min(total_files)
        } else {
            files_processed
        };
        Self {
            current_file: current_file.into(),
            files_processed,
            total_files,
            bytes_processed,
            total_bytes,
        }
    }

    /// The snapshot reported before the first entry is processed.
    pub fn starting(total_files: u64, total_bytes: u64) -> Self {
        Self::new("", 0, total_files, 0, total_bytes)
    }

    /// Name of the entry being processed, empty before the first one.
    pub fn current_file(&self) -> &str {
        &self.current_file
    }

    pub fn files_processed(&self) -> u64 {
        self.files_processed
    }

    pub fn total_files(&self) -> u64 {
        self.total_files
    }

    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Percentage of files processed, `0.0` if the total is unknown.
    pub fn file_percentage(&self) -> f64 {
        percentage(self.files_processed, self.total_files)
    }

    /// Percentage of bytes processed, `0.0` if the total is unknown.
    pub fn byte_percentage(&self) -> f64 {
        percentage(self.bytes_processed, self.total_bytes)
    }

    /// The byte percentage when the byte total is known, otherwise the file
    /// percentage.
    pub fn percentage(&self) -> f64 {
        if self.total_bytes > 0 {
            self.byte_percentage()
        } else {
            self.file_percentage()
        }
    }

    /// Whether every file of a known total has been processed.
    pub fn is_complete(&self) -> bool {
        self.total_files > 0 && self.files_processed == self.total_files
    }
}

fn percentage(processed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (processed as f64 / total as f64 * 100.0).min(100.0)
    }
}

/// A trait for reporting progress during archive extraction
pub trait ProgressReporter: Send + Sync {
    /// Called when extraction starts
    fn on_start(&self, _total_files: u64, _total_bytes: u64) {}

    /// Called for every progress tick
    fn on_progress(&self, progress: ExtractionProgress);

    /// Called when extraction finishes
    fn on_finish(&self, _message: &str) {}
}

impl<P: ProgressReporter + ?Sized> ProgressReporter for &P {
    fn on_start(&self, total_files: u64, total_bytes: u64) {
        (**self).on_start(total_files, total_bytes)
    }

    fn on_progress(&self, progress: ExtractionProgress) {
        (**self).on_progress(progress)
    }

    fn on_finish(&self, message: &str) {
        (**self).on_finish(message)
    }
}

impl<P: ProgressReporter + ?Sized> ProgressReporter for std::sync::Arc<P> {
    fn on_start(&self, total_files: u64, total_bytes: u64) {
        (**self).on_start(total_files, total_bytes)
    }

    fn on_progress(&self, progress: ExtractionProgress) {
        (**self).on_progress(progress)
    }

    fn on_finish(&self, message: &str) {
        (**self).on_finish(message)
    }
}

/// A no-op progress reporter
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgressReporter;

impl ProgressReporter for NoProgressReporter {
    fn on_progress(&self, _progress: ExtractionProgress) {}
}

/// Forwards every tick to a closure.
pub struct CallbackReporter<F> {
    callback: F,
}

impl<F> CallbackReporter<F>
where
    F: Fn(ExtractionProgress) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for CallbackReporter<F>
where
    F: Fn(ExtractionProgress) + Send + Sync,
{
    fn on_progress(&self, progress: ExtractionProgress) {
        (self.callback)(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_percentages() {
        let progress = ExtractionProgress::new("a.txt", 1, 4, 50, 200);
        assert_eq!(progress.file_percentage(), 25.0);
        assert_eq!(progress.byte_percentage(), 25.0);
        assert_eq!(progress.percentage(), 25.0);

        let unknown = ExtractionProgress::new("a.txt", 3, 0, 10, 0);
        assert_eq!(unknown.percentage(), 0.0);
        assert!(!unknown.is_complete());
    }

    #[test]
    fn test_files_processed_is_bounded_by_total() {
        let progress = ExtractionProgress::new("z", 9, 2, 0, 0);
        assert_eq!(progress.files_processed(), 2);
        assert!(progress.is_complete());
        assert_eq!(progress.percentage(), 100.0);
    }

    #[test]
    fn test_callback_reporter() {
        let seen = Mutex::new(Vec::new());
        let reporter = CallbackReporter::new(|p: ExtractionProgress| {
            seen.lock().unwrap().push(p.current_file().to_string())
        });
        reporter.on_progress(ExtractionProgress::new("one", 1, 2, 0, 0));
        (&reporter).on_progress(ExtractionProgress::new("two", 2, 2, 0, 0));
        assert_eq!(*seen.lock().unwrap(), vec!["one", "two"]);
    }
}
