//! Extraction of tar archives and single gzip-compressed files

use crate::{
    error::{ExtractionError, Result},
    external,
    extractor::{Backend, ExtractContext, ExtractionSummary},
    format::{archive_base_name, ArchiveKind},
    parse,
    progress::ExtractionProgress,
};
use std::{
    io::{BufReader, Read},
    path::Path,
    process::Stdio,
};

const PROCESSING: &str = "Processing...";

/// Extracts the tar family (`tar`, `tar.gz`, `tar.bz2`, `tar.xz`) and plain
/// gzip files.
#[derive(Debug, Clone)]
pub struct TarExtractor {
    kind: ArchiveKind,
    backend: Backend,
}

/// Tar compression types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TarCompression {
    Plain,
    Gzip,
    Bzip2,
    Xz,
}

impl TarCompression {
    /// The compression flag understood by `tar`.
    fn flag(self) -> &'static str {
        match self {
            TarCompression::Plain => "",
            TarCompression::Gzip => "z",
            TarCompression::Bzip2 => "j",
            TarCompression::Xz => "J",
        }
    }
}

impl TarExtractor {
    /// Fails with [`ExtractionError::UnsupportedFormat`] for kinds outside of
    /// the tar family.
    pub fn new(kind: ArchiveKind, backend: Backend) -> Result<Self> {
        match kind {
            ArchiveKind::Tar
            | ArchiveKind::TarGz
            | ArchiveKind::TarBz2
            | ArchiveKind::TarXz
            | ArchiveKind::Gzip => Ok(Self { kind, backend }),
            other => Err(ExtractionError::unsupported_format(other.display_name())),
        }
    }

    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    fn compression(&self) -> Option<TarCompression> {
        match self.kind {
            ArchiveKind::Tar => Some(TarCompression::Plain),
            ArchiveKind::TarGz => Some(TarCompression::Gzip),
            ArchiveKind::TarBz2 => Some(TarCompression::Bzip2),
            ArchiveKind::TarXz => Some(TarCompression::Xz),
            _ => None,
        }
    }

    /// Heuristic ratio between extracted size and archive size.
    pub fn compression_ratio(&self) -> u64 {
        match self.kind {
            ArchiveKind::TarGz => 3,
            ArchiveKind::TarBz2 => 4,
            ArchiveKind::TarXz => 5,
            ArchiveKind::Tar => 1,
            _ => 2,
        }
    }

    /// List entry names in archive order. A gzip file lists the single file
    /// it decompresses to.
    pub fn list_contents(&self, source: &Path) -> Result<Vec<String>> {
        let Some(compression) = self.compression() else {
            return Ok(vec![archive_base_name(source)]);
        };

        match self.backend {
            Backend::Native => Ok(scan_entries(source, compression)?
                .into_iter()
                .map(|(name, _)| name)
                .collect()),
            Backend::External => {
                let mut command = external::command("tar")?;
                command
                    .arg(format!("-t{}f", compression.flag()))
                    .arg(source);
                let output = external::capture(command)?;
                if !output.status.success() {
                    return Err(ExtractionError::corrupted(
                        source,
                        format!(
                            "tar exited with {}: {}",
                            output.status,
                            String::from_utf8_lossy(&output.stderr).trim()
                        ),
                    ));
                }
                Ok(parse::parse_tar_listing(&String::from_utf8_lossy(
                    &output.stdout,
                )))
            }
        }
    }

    /// The archive size multiplied by [`Self::compression_ratio`].
    pub fn estimate_size(&self, source: &Path) -> Result<u64> {
        let size = fs_err::metadata(source)
            .map_err(|err| ExtractionError::corrupted(source, format!("cannot read size: {err}")))?
            .len();
        Ok(size.saturating_mul(self.compression_ratio()))
    }

    /// Replace `destination` with the extracted contents of `source`.
    pub fn extract(
        &self,
        source: &Path,
        destination: &Path,
        ctx: &ExtractContext<'_>,
    ) -> Result<ExtractionSummary> {
        ctx.check_cancelled()?;

        if destination.exists() {
            tracing::debug!("removing existing destination {}", destination.display());
            fs_err::remove_dir_all(destination)?;
        }
        fs_err::create_dir_all(destination)?;

        let summary = match (self.compression(), self.backend) {
            (None, backend) => self.extract_single_file(source, destination, ctx, backend)?,
            (Some(compression), Backend::Native) => {
                self.extract_native(source, destination, compression, ctx)?
            }
            (Some(compression), Backend::External) => {
                self.extract_external(source, destination, compression, ctx)?
            }
        };

        ctx.finish(&format!("Extracted {}", self.kind.display_name()));
        Ok(summary)
    }

    fn extract_native(
        &self,
        source: &Path,
        destination: &Path,
        compression: TarCompression,
        ctx: &ExtractContext<'_>,
    ) -> Result<ExtractionSummary> {
        let entries = scan_entries(source, compression)?;
        let total_files = entries.len() as u64;
        let total_bytes: u64 = entries.iter().map(|(_, size)| size).sum();
        ctx.start(total_files, total_bytes);

        let failed = |err: std::io::Error| ExtractionError::extraction_failed(err.to_string());
        let mut archive = tar::Archive::new(open_decoder(source, compression)?);
        archive.set_preserve_permissions(true);
        archive.set_overwrite(true);

        // progress counts every entry seen, the summary only what was written
        let mut processed = 0;
        let mut bytes_processed = 0;
        let mut extracted = 0;
        let mut bytes_written = 0;
        for entry in archive.entries().map_err(failed)? {
            ctx.check_cancelled()?;

            let mut entry = entry.map_err(failed)?;
            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            let size = entry.size();
            if entry.unpack_in(destination).map_err(failed)? {
                extracted += 1;
                bytes_written += size;
            } else {
                tracing::warn!("skipped entry '{name}' pointing outside of the destination");
            }
            processed += 1;
            bytes_processed += size;

            ctx.report(ExtractionProgress::new(
                name,
                processed,
                total_files,
                bytes_processed,
                total_bytes,
            ));
        }

        Ok(ExtractionSummary {
            destination: destination.to_path_buf(),
            files_extracted: extracted,
            bytes_written: Some(bytes_written),
        })
    }

    fn extract_external(
        &self,
        source: &Path,
        destination: &Path,
        compression: TarCompression,
        ctx: &ExtractContext<'_>,
    ) -> Result<ExtractionSummary> {
        let listing = self.list_contents(source)?;
        let total_files = listing.len() as u64;
        ctx.start(total_files, 0);

        // verbose mode prints one line per extracted entry
        let mut command = external::command("tar")?;
        command
            .arg(format!("-xv{}f", compression.flag()))
            .arg(source)
            .arg("-C")
            .arg(destination)
            .stdout(Stdio::piped());

        let run = external::run_monitored(command, ctx, |_, lines| {
            let processed = if total_files > 0 {
                lines.min(total_files)
            } else {
                lines
            };
            let current = usize::try_from(processed)
                .ok()
                .and_then(|idx| listing.get(idx))
                .map(String::as_str)
                .unwrap_or(PROCESSING);
            ctx.report(ExtractionProgress::new(current, processed, total_files, 0, 0));
        })?;
        run.into_result("tar")?;

        ctx.report(ExtractionProgress::new(
            listing.last().map(String::as_str).unwrap_or(PROCESSING),
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

    fn extract_single_file(
        &self,
        source: &Path,
        destination: &Path,
        ctx: &ExtractContext<'_>,
        backend: Backend,
    ) -> Result<ExtractionSummary> {
        let name = archive_base_name(source);
        let target = destination.join(&name);
        ctx.start(1, 0);
        ctx.report(ExtractionProgress::new(name.as_str(), 0, 1, 0, 0));

        let output = fs_err::File::create(&target)?;
        let bytes_written = match backend {
            Backend::Native => {
                let file = fs_err::File::open(source)?;
                // gunzip -c concatenates every member, so does this
                let mut decoder = flate2::read::MultiGzDecoder::new(BufReader::new(file));
                let mut output = output;
                std::io::copy(&mut decoder, &mut output)
                    .map_err(|err| ExtractionError::extraction_failed(err.to_string()))?
            }
            Backend::External => {
                let mut command = external::command("gunzip")?;
                command
                    .arg("-c")
                    .arg(source)
                    .stdout(Stdio::from(output.into_parts().0));
                external::run_monitored(command, ctx, |_, _| {})?.into_result("gunzip")?;
                fs_err::metadata(&target)?.len()
            }
        };

        ctx.report(ExtractionProgress::new(
            name.as_str(),
            1,
            1,
            bytes_written,
            bytes_written,
        ));

        Ok(ExtractionSummary {
            destination: destination.to_path_buf(),
            files_extracted: 1,
            bytes_written: Some(bytes_written),
        })
    }
}

/// Names and header sizes of the entries of a tar archive, in archive order.
fn scan_entries(source: &Path, compression: TarCompression) -> Result<Vec<(String, u64)>> {
    let corrupted = |err: std::io::Error| ExtractionError::corrupted(source, err.to_string());
    let mut archive = tar::Archive::new(open_decoder(source, compression)?);
    let mut entries = Vec::new();
    for entry in archive.entries().map_err(corrupted)? {
        let entry = entry.map_err(corrupted)?;
        let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        entries.push((name, entry.size()));
    }
    Ok(entries)
}

fn open_decoder(source: &Path, compression: TarCompression) -> Result<Box<dyn Read>> {
    let file = fs_err::File::open(source)?;
    let buf_reader = BufReader::new(file);

    let reader: Box<dyn Read> = match compression {
        TarCompression::Plain => Box::new(buf_reader),
        TarCompression::Gzip => Box::new(flate2::read::MultiGzDecoder::new(buf_reader)),
        TarCompression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(buf_reader)),
        TarCompression::Xz => Box::new(xz2::read::XzDecoder::new(buf_reader)),
    };
    Ok(reader)
}
