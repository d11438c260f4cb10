//! Archive kind registry and filename based detection

use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// The archive kinds known to this crate.
///
/// The declaration order is the registration order used by detection. Kinds
/// with compound extensions (`tar.gz`) come before the kinds whose extension
/// is a suffix of them (`gz`), so that `file.tar.gz` is never classified as a
/// plain gzip file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArchiveKind {
    /// ZIP archive
    Zip,
    /// Plain tar archive
    Tar,
    /// Gzip-compressed tar archive (.tar.gz, .tgz)
    TarGz,
    /// Bzip2-compressed tar archive (.tar.bz2, .tbz2, .tbz)
    TarBz2,
    /// XZ-compressed tar archive (.tar.xz, .txz)
    TarXz,
    /// A single gzip-compressed file
    Gzip,
    /// 7-Zip archive, recognized but not extractable
    SevenZip,
    /// RAR archive, recognized but not extractable
    Rar,
}

impl ArchiveKind {
    /// Every kind, in registration order.
    pub const ALL: &'static [ArchiveKind] = &[
        Self::Zip,
        Self::Tar,
        Self::TarGz,
        Self::TarBz2,
        Self::TarXz,
        Self::Gzip,
        Self::SevenZip,
        Self::Rar,
    ];

    /// Returns all kinds in registration order.
    pub fn all() -> impl Iterator<Item = ArchiveKind> {
        Self::ALL.iter().copied()
    }

    /// The recognized filename extensions, without the leading dot. Compound
    /// extensions are listed before shorter ones.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Zip => &["zip"],
            Self::Tar => &["tar"],
            Self::TarGz => &["tar.gz", "tgz"],
            Self::TarBz2 => &["tar.bz2", "tbz2", "tbz"],
            Self::TarXz => &["tar.xz", "txz"],
            Self::Gzip => &["gz"],
            Self::SevenZip => &["7z"],
            Self::Rar => &["rar"],
        }
    }

    /// Get a human-readable name for this kind
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Zip => "ZIP Archive",
            Self::Tar => "TAR Archive",
            Self::TarGz => "TAR.GZ Archive",
            Self::TarBz2 => "TAR.BZ2 Archive",
            Self::TarXz => "TAR.XZ Archive",
            Self::Gzip => "GZIP File",
            Self::SevenZip => "7-Zip Archive",
            Self::Rar => "RAR Archive",
        }
    }

    /// Short identifier, also accepted by [`FromStr`].
    pub fn id(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::TarGz => "tar-gz",
            Self::TarBz2 => "tar-bz2",
            Self::TarXz => "tar-xz",
            Self::Gzip => "gzip",
            Self::SevenZip => "7z",
            Self::Rar => "rar",
        }
    }

    /// Whether an extractor exists for this kind.
    pub fn is_supported_for_extraction(&self) -> bool {
        !matches!(self, Self::SevenZip | Self::Rar)
    }

    /// Check if this is a tar-based kind
    pub fn is_tar_based(&self) -> bool {
        matches!(self, Self::Tar | Self::TarGz | Self::TarBz2 | Self::TarXz)
    }

    /// Detect the archive kind from a file name.
    pub fn detect_from_filename(filename: &str) -> Option<Self> {
        let filename = filename.to_lowercase();
        Self::all().find(|kind| {
            kind.extensions().iter().any(|ext| {
                filename
                    .strip_suffix(ext)
                    .is_some_and(|rest| rest.ends_with('.'))
            })
        })
    }

    /// Detect the archive kind from the final component of a path.
    pub fn detect_from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .file_name()
            .and_then(OsStr::to_str)
            .and_then(Self::detect_from_filename)
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Error returned when parsing an [`ArchiveKind`] from a string fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown archive kind '{0}'")]
pub struct ParseArchiveKindError(String);

impl FromStr for ArchiveKind {
    type Err = ParseArchiveKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().trim_start_matches('.').to_lowercase();
        Self::all()
            .find(|kind| kind.id() == needle || kind.extensions().iter().any(|ext| *ext == needle))
            .ok_or_else(|| ParseArchiveKindError(s.to_string()))
    }
}

/// Strips the archive extension from a file name.
///
/// Compound extensions are removed as a unit, so `data.tar.gz` becomes `data`.
/// Names without a known archive extension lose only their last extension.
/// Names without any extension are returned unchanged.
pub fn strip_archive_suffix(filename: &str) -> String {
    const COMPOUND: &[&str] = &[
        ".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tbz", ".tar.xz", ".txz", ".tar", ".gz",
    ];

    let lower = filename.to_ascii_lowercase();
    for suffix in COMPOUND {
        if lower.ends_with(suffix) && lower.len() > suffix.len() {
            return filename[..filename.len() - suffix.len()].to_string();
        }
    }

    match filename.rfind('.') {
        Some(idx) if idx > 0 => filename[..idx].to_string(),
        _ => filename.to_string(),
    }
}

/// Returns the file name of `path` with its archive extension stripped.
pub fn archive_base_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    strip_archive_suffix(&name)
}
