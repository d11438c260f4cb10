//! Archive type detection and extraction
//!
//! This crate detects archive kinds from file names (ZIP, TAR, TAR.GZ,
//! TAR.BZ2, TAR.XZ and single GZIP files), validates them and extracts them
//! while reporting progress.
//!
//! # Features
//!
//! - Filename based detection with compound extensions (`.tar.gz` wins over `.gz`)
//! - In-process decoding, or the system `unzip`, `tar` and `gunzip` tools
//! - Progress reporting through [`ProgressReporter`]
//! - Cooperative cancellation, killing a running external tool
//! - Removal of partial output after a failed extraction
//! - Async API on top of tokio (`tokio` feature)
//!
//! # Examples
//!
//! ## Basic extraction
//!
//! ```no_run
//! use unbox_archive::{ArchiveManager, NoProgressReporter};
//! use std::path::Path;
//!
//! let manager = ArchiveManager::builder().build();
//!
//! let summary = manager.extract(
//!     Path::new("archive.tar.gz"),
//!     Path::new("output_dir"),
//!     &NoProgressReporter,
//! )?;
//! println!("extracted into {}", summary.destination.display());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## With progress reporting
//!
//! ```no_run
//! use unbox_archive::{ArchiveManager, CallbackReporter, ExtractionProgress};
//! use std::path::Path;
//!
//! let reporter = CallbackReporter::new(|progress: ExtractionProgress| {
//!     println!("{:>5.1}% {}", progress.percentage(), progress.current_file());
//! });
//!
//! ArchiveManager::default().extract(
//!     Path::new("archive.zip"),
//!     Path::new("output_dir"),
//!     &reporter,
//! )?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod detect;
pub mod error;
pub mod external;
pub mod extractor;
pub mod format;
pub mod manager;
pub mod parse;
pub mod progress;

#[cfg(feature = "tokio")]
pub mod r#async;

pub use detect::{detect, validate};
pub use error::{ExtractionError, Result};
pub use extractor::{
    ArchiveExtractor, Backend, ExtractContext, ExtractionSummary, FailurePolicy, TarExtractor,
    ZipExtractor,
};
pub use format::{strip_archive_suffix, ArchiveKind};
pub use manager::{ArchiveManager, ArchiveManagerBuilder, ExtractOptions};
pub use progress::{CallbackReporter, ExtractionProgress, NoProgressReporter, ProgressReporter};

#[cfg(feature = "tokio")]
pub use r#async::{AsyncArchiveManager, CancelHandle, ExtractionTask};

pub use tokio_util::sync::CancellationToken;

/// Check if a filename has a known archive extension
pub fn is_archive(filename: &str) -> bool {
    ArchiveKind::detect_from_filename(filename).is_some()
}

/// Check if a filename is a tarball
pub fn is_tarball(filename: &str) -> bool {
    ArchiveKind::detect_from_filename(filename).is_some_and(|kind| kind.is_tar_based())
}
