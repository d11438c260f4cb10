//! Opening extracted files in the system file viewer

use anyhow::Context;
use std::path::Path;
use std::process::{Command, Stdio};

#[cfg(target_os = "macos")]
const OPENER: &str = "open";
#[cfg(windows)]
const OPENER: &str = "explorer";
#[cfg(not(any(target_os = "macos", windows)))]
const OPENER: &str = "xdg-open";

/// Opens `path` with the platform opener without waiting for it.
pub fn open(path: &Path) -> anyhow::Result<()> {
    let opener = which::which(OPENER).with_context(|| format!("`{OPENER}` is not available"))?;
    tracing::debug!("opening {} with {}", path.display(), opener.display());
    Command::new(opener)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to open {}", path.display()))?;
    Ok(())
}
