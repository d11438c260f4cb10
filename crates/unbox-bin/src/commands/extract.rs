use crate::{preferences::Preferences, viewer};
use anyhow::Context;
use console::style;
use std::{path::PathBuf, sync::Arc, time::Duration};
use unbox_archive::{
    ArchiveManager, AsyncArchiveManager, Backend, ExtractionError, FailurePolicy,
};
use unbox_progress::ExtractionProgressBar;

#[derive(Debug, clap::Parser)]
pub struct Opt {
    /// The archive to extract
    archive: PathBuf,

    /// Directory to extract into. If it already exists, a sub-directory named
    /// after the archive is created inside it. Defaults to the last used
    /// destination, then to the directory containing the archive.
    #[clap(short, long)]
    destination: Option<PathBuf>,

    /// Use the system tools instead of decoding in-process
    #[clap(long)]
    backend: Option<Backend>,

    /// Keep partially extracted files when extraction fails
    #[clap(long)]
    keep_partial: bool,

    /// Open the extracted files in the system file viewer
    #[clap(long)]
    open: bool,

    /// Interval in milliseconds between progress updates of the external backend
    #[clap(long, default_value_t = 100)]
    tick_ms: u64,

    /// Do not remember the destination for the next extraction
    #[clap(long)]
    no_remember: bool,
}

pub async fn extract(opt: Opt) -> anyhow::Result<()> {
    let preferences_path = Preferences::default_path();
    let mut preferences = preferences_path
        .as_deref()
        .map(Preferences::load)
        .unwrap_or_default();

    let destination_dir = match opt.destination {
        Some(destination) => destination,
        None => match preferences.last_destination() {
            Some(last) => last.to_path_buf(),
            None => default_destination(&opt.archive)?,
        },
    };

    let manager = ArchiveManager::builder()
        .with_backend(opt.backend.or(preferences.backend()).unwrap_or_default())
        .with_tick_interval(Duration::from_millis(opt.tick_ms.max(1)))
        .with_failure_policy(if opt.keep_partial {
            FailurePolicy::KeepPartial
        } else {
            FailurePolicy::RemovePartial
        })
        .build();

    let kind = manager
        .detect(&opt.archive)
        .ok_or_else(|| ExtractionError::unsupported_format(opt.archive.display().to_string()))?;
    tracing::info!(
        "extracting {} ({kind}) with the {} backend",
        opt.archive.display(),
        manager.options().backend
    );

    let progress = Arc::new(if console::Term::stderr().is_term() {
        ExtractionProgressBar::new(kind.display_name())
    } else {
        ExtractionProgressBar::hidden()
    });

    let task = AsyncArchiveManager::new(manager).spawn_extract(
        &opt.archive,
        &destination_dir,
        progress.clone(),
    );

    let cancel = task.cancel_handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("received Ctrl-C, cancelling");
            cancel.cancel();
        }
    });
    let result = task.wait().await;
    ctrl_c.abort();

    let summary = match result {
        Ok(summary) => summary,
        Err(err) => {
            progress.abandon();
            return Err(err).with_context(|| format!("failed to extract {}", opt.archive.display()));
        }
    };

    eprintln!(
        "{} Extracted {} entries into {}",
        style("✔").green(),
        summary.files_extracted,
        style(summary.destination.display()).bold()
    );

    if !opt.no_remember {
        preferences.set_last_destination(&destination_dir);
        if let Some(path) = &preferences_path {
            if let Err(err) = preferences.save(path) {
                tracing::warn!("{err:#}");
            }
        }
    }

    if opt.open || preferences.open_after_extract {
        viewer::open(&summary.destination)?;
    }

    Ok(())
}

/// The directory containing `archive`, or the working directory.
fn default_destination(archive: &std::path::Path) -> anyhow::Result<PathBuf> {
    match archive.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
        _ => std::env::current_dir().context("failed to determine the working directory"),
    }
}
