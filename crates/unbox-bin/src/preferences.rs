//! Persistent user preferences

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use unbox_archive::Backend;

/// Environment variable overriding the location of the preferences file.
pub const CONFIG_ENV: &str = "UNBOX_CONFIG";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Preferences {
    /// The directory the last archive was extracted into
    last_destination: Option<PathBuf>,

    /// Open the extracted files in the system file viewer
    pub open_after_extract: bool,

    /// Either `native` or `external`
    backend: Option<String>,
}

impl Preferences {
    /// `$UNBOX_CONFIG`, or `config.toml` in the platform configuration directory.
    pub fn default_path() -> Option<PathBuf> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => dirs::config_dir().map(|dir| dir.join("unbox").join("config.toml")),
        }
    }

    /// Reads the preferences at `path`. A missing file yields the defaults,
    /// an unreadable one the defaults and a warning.
    pub fn load(path: &Path) -> Self {
        let contents = match fs_err::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                tracing::warn!("failed to read preferences from {}: {err}", path.display());
                return Self::default();
            }
        };

        toml::from_str(&contents).unwrap_or_else(|err| {
            tracing::warn!("ignoring invalid preferences in {}: {err}", path.display());
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("failed to serialize preferences")?;
        fs_err::write(path, contents)
            .with_context(|| format!("failed to write preferences to {}", path.display()))
    }

    /// The last used destination, if it still exists.
    pub fn last_destination(&self) -> Option<&Path> {
        self.last_destination
            .as_deref()
            .filter(|path| path.is_dir())
    }

    pub fn set_last_destination(&mut self, destination: impl Into<PathBuf>) {
        self.last_destination = Some(destination.into());
    }

    /// The preferred backend. Unknown values are ignored.
    pub fn backend(&self) -> Option<Backend> {
        let backend = self.backend.as_deref()?;
        match backend.parse() {
            Ok(backend) => Some(backend),
            Err(err) => {
                tracing::warn!("ignoring preferred backend: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut preferences = Preferences::default();
        preferences.set_last_destination(dir.path());
        preferences.open_after_extract = true;
        preferences.save(&path).unwrap();

        let loaded = Preferences::load(&path);
        assert_eq!(loaded, preferences);
        assert_eq!(loaded.last_destination(), Some(dir.path()));
    }

    #[test]
    fn test_stale_destination_is_ignored() {
        let mut preferences = Preferences::default();
        preferences.set_last_destination("/definitely/not/a/real/dir");
        assert_eq!(preferences.last_destination(), None);
    }

    #[test]
    fn test_invalid_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs_err::write(&path, "open-after-extract = \"maybe\"").unwrap();
        assert_eq!(Preferences::load(&path), Preferences::default());
        assert_eq!(
            Preferences::load(&dir.path().join("missing.toml")),
            Preferences::default()
        );
    }

    #[test]
    fn test_unreadable_path_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Preferences::load(dir.path()), Preferences::default());
    }

    #[test]
    fn test_backend() {
        let preferences: Preferences = toml::from_str("backend = \"external\"").unwrap();
        assert_eq!(preferences.backend(), Some(Backend::External));

        let preferences: Preferences = toml::from_str("backend = \"7zip\"").unwrap();
        assert_eq!(preferences.backend(), None);
    }
}
