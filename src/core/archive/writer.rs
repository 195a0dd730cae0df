// ─── Archive Writer ───
// Streams installer downloads straight into one zip per title.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use super::{Compression, FetchFailurePolicy};
use crate::core::catalog::InstallerFile;
use crate::core::downloader::{last_segment, FileSource};
use crate::core::error::{ErrorKind, VaultError, VaultResult};

/// What to build for one title: the archive name and its entries, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSpec {
    pub output_name: String,
    pub entries: Vec<InstallerFile>,
}

impl ArchiveSpec {
    pub fn output_path(&self, dest_dir: &Path) -> PathBuf {
        dest_dir.join(&self.output_name)
    }
}

/// Outcome of a finished archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Entry names in archive order.
    pub entries: Vec<String>,
    /// Remote paths left out under the best-effort policy.
    pub missing: Vec<String>,
    /// Uncompressed payload bytes.
    pub bytes_written: u64,
}

type Zip = ZipWriter<BufWriter<File>>;

pub struct ArchiveWriter<'a> {
    source: &'a dyn FileSource,
    policy: FetchFailurePolicy,
    compression: Compression,
}

impl<'a> ArchiveWriter<'a> {
    pub fn new(source: &'a dyn FileSource) -> Self {
        Self {
            source,
            policy: FetchFailurePolicy::default(),
            compression: Compression::default(),
        }
    }

    pub fn with_policy(mut self, policy: FetchFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Create `output` (it must not exist yet) and fill it with one entry per file.
    ///
    /// Entry names come from the last segment of each download's final URL.
    /// When the title fails, the unfinished archive is removed again.
    pub async fn write(&self, output: &Path, files: &[InstallerFile]) -> VaultResult<ArchiveReport> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(output)
            .map_err(|e| VaultError::io(output, e))?;
        let mut zip = ZipWriter::new(BufWriter::new(file));

        let written = self.write_entries(&mut zip, output, files).await;
        let report = match written {
            Ok(report) => report,
            Err(e) => {
                drop(zip);
                discard(output);
                return Err(e);
            }
        };

        if let Err(e) = finish(zip, output) {
            discard(output);
            return Err(e);
        }

        info!(
            "Wrote {:?}: {} entries, {} bytes",
            output,
            report.entries.len(),
            report.bytes_written
        );
        Ok(report)
    }

    async fn write_entries(
        &self,
        zip: &mut Zip,
        output: &Path,
        files: &[InstallerFile],
    ) -> VaultResult<ArchiveReport> {
        let options = SimpleFileOptions::default()
            .compression_method(self.compression.into())
            .large_file(true);

        let mut report = ArchiveReport::default();
        let mut taken = HashSet::new();

        for (index, file) in files.iter().enumerate() {
            debug!("[{}/{}] {}", index + 1, files.len(), file.remote_path);

            match self.copy_entry(zip, output, file, &options, &taken).await {
                Ok((name, bytes)) => {
                    taken.insert(name.clone());
                    report.entries.push(name);
                    report.bytes_written += bytes;
                }
                Err(e)
                    if e.kind() == ErrorKind::FetchFailed
                        && self.policy == FetchFailurePolicy::BestEffort =>
                {
                    warn!("Leaving out {}: {}", file.remote_path, e);
                    report.missing.push(file.remote_path.clone());
                }
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }

    /// Stream one download into a new entry. Returns the entry name and size.
    async fn copy_entry(
        &self,
        zip: &mut Zip,
        output: &Path,
        file: &InstallerFile,
        options: &SimpleFileOptions,
        taken: &HashSet<String>,
    ) -> VaultResult<(String, u64)> {
        let mut remote = self.source.fetch_file(&file.remote_path).await?;

        let base = remote
            .file_name()
            .or_else(|| last_segment(&file.remote_path))
            .ok_or_else(|| VaultError::fetch(&file.remote_path, "download URL has no file name"))?;
        let name = unique_name(&base, taken);

        zip.start_file(name.as_str(), options.clone())?;

        let mut written = 0u64;
        while let Some(chunk) = remote.body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    zip.abort_file()?;
                    return Err(e);
                }
            };
            zip.write_all(&chunk).map_err(|e| VaultError::io(output, e))?;
            written += chunk.len() as u64;
        }

        Ok((name, written))
    }
}

/// Write the central directory and flush everything to disk.
fn finish(zip: Zip, output: &Path) -> VaultResult<()> {
    let buffered = zip.finish()?;
    let file = buffered
        .into_inner()
        .map_err(|e| VaultError::io(output, e.into_error()))?;
    file.sync_all().map_err(|e| VaultError::io(output, e))
}

fn discard(output: &Path) {
    match std::fs::remove_file(output) {
        Ok(()) => debug!("Removed unfinished archive {:?}", output),
        Err(e) => warn!("Could not remove unfinished archive {:?}: {}", output, e),
    }
}

/// `name`, or `stem (n).ext` when an earlier entry already uses it.
fn unique_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(i) if i > 0 => name.split_at(i),
        _ => (name, ""),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{stem} ({n}){ext}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
