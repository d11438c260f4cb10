//! Error types for the unbox_archive crate

use std::path::PathBuf;

/// Result type for archive operations
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Error type for archive operations
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The file extension is not recognized, or the kind has no extractor
    #[error("Unsupported archive format for file: {filename}")]
    UnsupportedFormat { filename: String },

    /// The source archive does not exist
    #[error("Archive not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// The source archive (or the destination) cannot be accessed
    #[error("Insufficient permissions to access {}", path.display())]
    InsufficientPermissions { path: PathBuf },

    /// The archive is empty, its size cannot be read, or it cannot be listed
    #[error("The archive {} appears to be corrupted: {reason}", path.display())]
    CorruptedArchive { path: PathBuf, reason: String },

    /// Reserved: destination collisions are resolved by extracting into a
    /// sub-directory instead.
    #[error("Destination already exists: {}", path.display())]
    DestinationExists { path: PathBuf },

    /// Extraction did not complete
    #[error("Extraction failed{}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    ExtractionFailed { detail: Option<String> },

    /// The operation was cancelled before it completed
    #[error("Extraction was cancelled")]
    UserCancelled,

    /// I/O error while writing the extracted output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    /// Create a new unsupported format error
    pub fn unsupported_format(filename: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            filename: filename.into(),
        }
    }

    /// Create a new corrupted archive error
    pub fn corrupted(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptedArchive {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new extraction failure carrying diagnostic text
    pub fn extraction_failed(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let detail = detail.trim();
        Self::ExtractionFailed {
            detail: (!detail.is_empty()).then(|| detail.to_string()),
        }
    }

    /// Whether this error was caused by a cancellation request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }

    /// Short, user-facing suggestions for recovering from this error.
    pub fn recovery_suggestions(&self) -> &'static [&'static str] {
        match self {
            Self::UnsupportedFormat { .. } => &[
                "Choose a different file",
                "Supported formats are ZIP, TAR, TAR.GZ, TAR.BZ2, TAR.XZ and GZIP",
            ],
            Self::FileNotFound { .. } => &[
                "Choose a different file",
                "Check that the file has not been moved or deleted",
            ],
            Self::InsufficientPermissions { .. } => &[
                "Check permissions",
                "Choose a different destination",
            ],
            Self::CorruptedArchive { .. } => &[
                "Choose a different file",
                "Download the archive again",
            ],
            Self::DestinationExists { .. } => &["Choose a different destination"],
            Self::ExtractionFailed { .. } | Self::Io(_) => &[
                "Choose a different destination",
                "Check permissions",
                "Check available disk space",
            ],
            Self::UserCancelled => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_failed_message() {
        assert_eq!(
            ExtractionError::extraction_failed("exit status: 9\n").to_string(),
            "Extraction failed: exit status: 9"
        );
        assert_eq!(
            ExtractionError::extraction_failed("  ").to_string(),
            "Extraction failed"
        );
    }

    #[test]
    fn test_recovery_suggestions() {
        let err = ExtractionError::unsupported_format("a.cab");
        assert_eq!(err.recovery_suggestions()[0], "Choose a different file");
        assert!(ExtractionError::UserCancelled
            .recovery_suggestions()
            .is_empty());
    }
}
