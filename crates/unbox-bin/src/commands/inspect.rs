use anyhow::Context;
use console::style;
use humansize::{format_size, DECIMAL};
use itertools::Itertools;
use std::path::PathBuf;
use unbox_archive::{ArchiveKind, ArchiveManager, AsyncArchiveManager, Backend};

#[derive(Debug, clap::Parser)]
pub struct DetectOpt {
    /// Files to classify
    #[clap(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(Debug, clap::Parser)]
pub struct ListOpt {
    /// The archive to list
    archive: PathBuf,

    /// Use the system tools instead of decoding in-process
    #[clap(long, default_value = "native")]
    backend: Backend,
}

#[derive(Debug, clap::Parser)]
pub struct SizeOpt {
    /// The archive to inspect
    archive: PathBuf,

    /// Use the system tools instead of decoding in-process
    #[clap(long, default_value = "native")]
    backend: Backend,

    /// Print the size in bytes only
    #[clap(long)]
    bytes: bool,
}

pub fn detect(opt: DetectOpt) -> anyhow::Result<()> {
    let manager = ArchiveManager::default();
    for path in opt.paths {
        match manager.detect(&path) {
            Some(kind) if kind.is_supported_for_extraction() => {
                println!("{}: {}", path.display(), style(kind).green());
            }
            Some(kind) => println!(
                "{}: {} {}",
                path.display(),
                style(kind).yellow(),
                style("(extraction not supported)").dim()
            ),
            None => println!("{}: {}", path.display(), style("unknown").red()),
        }
    }
    Ok(())
}

pub async fn list(opt: ListOpt) -> anyhow::Result<()> {
    let manager =
        AsyncArchiveManager::new(ArchiveManager::builder().with_backend(opt.backend).build());
    let entries = manager
        .list_archive_contents(&opt.archive)
        .await
        .with_context(|| format!("failed to list {}", opt.archive.display()))?;
    for entry in entries {
        println!("{entry}");
    }
    Ok(())
}

pub async fn size(opt: SizeOpt) -> anyhow::Result<()> {
    let manager =
        AsyncArchiveManager::new(ArchiveManager::builder().with_backend(opt.backend).build());
    let size = manager
        .estimate_archive_size(&opt.archive)
        .await
        .with_context(|| format!("failed to estimate the size of {}", opt.archive.display()))?;
    if opt.bytes {
        println!("{size}");
    } else {
        println!("{} ({size} bytes)", format_size(size, DECIMAL));
    }
    Ok(())
}

pub fn formats() -> anyhow::Result<()> {
    for kind in ArchiveKind::all() {
        let extensions = kind.extensions().iter().map(|ext| format!(".{ext}")).join(", ");
        let support = if kind.is_supported_for_extraction() {
            style("extract").green()
        } else {
            style("detect only").yellow()
        };
        println!("{:<16} {:<28} {support}", kind.display_name(), extensions);
    }
    Ok(())
}
