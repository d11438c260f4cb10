//! Source archive validation

use crate::error::{ExtractionError, Result};
use crate::format::ArchiveKind;
use std::io::ErrorKind;
use std::path::Path;

/// Classifies `path` by its file name. See [`ArchiveKind::detect_from_path`].
pub fn detect(path: impl AsRef<Path>) -> Option<ArchiveKind> {
    ArchiveKind::detect_from_path(path)
}

/// Checks that `path` names an existing, readable, non-empty file and
/// returns its size in bytes.
pub fn validate(path: impl AsRef<Path>) -> Result<u64> {
    let path = path.as_ref();

    let metadata = match fs_err::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(ExtractionError::FileNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            return Err(ExtractionError::InsufficientPermissions {
                path: path.to_path_buf(),
            })
        }
        Err(err) => {
            return Err(ExtractionError::corrupted(
                path,
                format!("cannot determine file size: {err}"),
            ))
        }
    };

    if let Err(err) = fs_err::File::open(path) {
        return Err(match err.kind() {
            ErrorKind::PermissionDenied => ExtractionError::InsufficientPermissions {
                path: path.to_path_buf(),
            },
            _ => ExtractionError::corrupted(path, err.to_string()),
        });
    }

    if metadata.len() == 0 {
        return Err(ExtractionError::corrupted(path, "file is empty"));
    }

    Ok(metadata.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_validate_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_matches!(
            validate(dir.path().join("missing.zip")),
            Err(ExtractionError::FileNotFound { .. })
        );
    }

    #[test]
    fn test_validate_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.tar");
        fs_err::write(&path, b"").unwrap();
        assert_matches!(
            validate(&path),
            Err(ExtractionError::CorruptedArchive { .. })
        );
    }

    #[test]
    fn test_validate_returns_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.gz");
        fs_err::write(&path, b"12345").unwrap();
        assert_eq!(validate(&path).unwrap(), 5);
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_unreadable_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locked.zip");
        fs_err::write(&path, b"PK").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

        // root ignores permission bits
        if std::fs::File::open(&path).is_ok() {
            return;
        }
        assert_matches!(
            validate(&path),
            Err(ExtractionError::InsufficientPermissions { .. })
        );
    }
}
