//! ZIP extraction

use crate::{
    error::{ExtractionError, Result},
    external,
    extractor::{Backend, ExtractContext, ExtractionSummary},
    parse,
    progress::ExtractionProgress,
};
use std::{path::Path, process::Stdio};

/// Extracts ZIP archives, in-process or through `unzip`.
#[derive(Debug, Clone)]
pub struct ZipExtractor {
    backend: Backend,
}

impl ZipExtractor {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// List entry names in central directory order. Directories keep their
    /// trailing `/`.
    pub fn list_contents(&self, source: &Path) -> Result<Vec<String>> {
        match self.backend {
            Backend::Native => {
                let mut archive = open(source)?;
                (0..archive.len())
                    .map(|index| {
                        archive
                            .by_index_raw(index)
                            .map(|entry| entry.name().to_string())
                            .map_err(|err| ExtractionError::corrupted(source, err.to_string()))
                    })
                    .collect()
            }
            Backend::External => Ok(parse::parse_unzip_listing(&unzip_listing(source)?)),
        }
    }

    /// Sum of the uncompressed sizes of all entries.
    pub fn estimate_size(&self, source: &Path) -> Result<u64> {
        match self.backend {
            Backend::Native => {
                let mut archive = open(source)?;
                let mut total = 0;
                for index in 0..archive.len() {
                    let entry = archive
                        .by_index_raw(index)
                        .map_err(|err| ExtractionError::corrupted(source, err.to_string()))?;
                    total += entry.size();
                }
                Ok(total)
            }
            Backend::External => Ok(parse::parse_unzip_total_size(&unzip_listing(source)?)),
        }
    }

    /// Extract `source` into `destination`, creating it if needed.
    pub fn extract(
        &self,
        source: &Path,
        destination: &Path,
        ctx: &ExtractContext<'_>,
    ) -> Result<ExtractionSummary> {
        ctx.check_cancelled()?;
        fs_err::create_dir_all(destination)?;

        let summary = match self.backend {
            Backend::Native => self.extract_native(source, destination, ctx)?,
            Backend::External => self.extract_external(source, destination, ctx)?,
        };

        ctx.finish("Extracted ZIP archive");
        Ok(summary)
    }

    fn extract_native(
        &self,
        source: &Path,
        destination: &Path,
        ctx: &ExtractContext<'_>,
    ) -> Result<ExtractionSummary> {
        let mut archive = open(source)?;
        let total_files = archive.len() as u64;
        let total_bytes = self.estimate_size(source)?;
        ctx.start(total_files, total_bytes);

        let mut bytes_written = 0;
        for index in 0..archive.len() {
            ctx.check_cancelled()?;

            let mut entry = archive
                .by_index(index)
                .map_err(|err| ExtractionError::extraction_failed(err.to_string()))?;
            let name = entry.name().to_string();
            let relative = entry.enclosed_name().ok_or_else(|| {
                ExtractionError::extraction_failed(format!(
                    "entry '{name}' points outside of the destination"
                ))
            })?;
            let target = destination.join(relative);

            if entry.is_dir() {
                fs_err::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    fs_err::create_dir_all(parent)?;
                }
                let mut output = fs_err::File::create(&target)?;
                bytes_written += std::io::copy(&mut entry, &mut output)?;

                #[cfg(unix)]
                if let Some(mode) = entry.unix_mode() {
                    use std::os::unix::fs::PermissionsExt;
                    fs_err::set_permissions(&target, std::fs::Permissions::from_mode(mode))?;
                }
            }

            ctx.report(ExtractionProgress::new(
                name,
                index as u64 + 1,
                total_files,
                bytes_written,
                total_bytes,
            ));
        }

        Ok(ExtractionSummary {
            destination: destination.to_path_buf(),
            files_extracted: total_files,
            bytes_written: Some(bytes_written),
        })
    }

    fn extract_external(
        &self,
        source: &Path,
        destination: &Path,
        ctx: &ExtractContext<'_>,
    ) -> Result<ExtractionSummary> {
        let listing = self.list_contents(source)?;
        let total_files = listing.len() as u64;
        ctx.start(total_files, 0);

        let mut command = external::command("unzip")?;
        command
            .arg("-qq")
            .arg(source)
            .arg("-d")
            .arg(destination)
            .stdout(Stdio::null());

        // unzip is quiet, so ticks advance one listed entry per interval
        let mut processed = 0u64;
        let run = external::run_monitored(command, ctx, |_, _| {
            if total_files == 0 {
                return;
            }
            processed = (processed + 1).min(total_files);
            ctx.report(ExtractionProgress::new(
                listing[processed as usize - 1].as_str(),
                processed,
                total_files,
                0,
                0,
            ));
        })?;
        run.into_result("unzip")?;

        ctx.report(ExtractionProgress::new(
            listing.last().map(String::as_str).unwrap_or_default(),
            total_files,
            total_files,
            0,
            0,
        ));

        Ok(ExtractionSummary {
            destination: destination.to_path_buf(),
            files_extracted: total_files,
            bytes_written: None,
        })
    }
}

fn open(source: &Path) -> Result<zip::ZipArchive<fs_err::File>> {
    let file = fs_err::File::open(source)?;
    zip::ZipArchive::new(file).map_err(|err| ExtractionError::corrupted(source, err.to_string()))
}

fn unzip_listing(source: &Path) -> Result<String> {
    let mut command = external::command("unzip")?;
    command.arg("-l").arg(source);
    let output = external::capture(command)?;
    if !output.status.success() {
        return Err(ExtractionError::corrupted(
            source,
            format!(
                "unzip -l exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
