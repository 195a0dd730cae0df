pub mod writer;

use serde::{Deserialize, Serialize};

pub use writer::{ArchiveReport, ArchiveSpec, ArchiveWriter};

/// What to do when one installer of a title cannot be retrieved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchFailurePolicy {
    /// Fail the whole title and delete the unfinished archive.
    #[default]
    Abort,
    /// Leave the entry out, keep going, and finalize the archive anyway.
    BestEffort,
}

/// Compression applied to archive entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Deflated,
    /// Installers are already compressed; storing skips the CPU cost.
    Stored,
}

impl From<Compression> for zip::CompressionMethod {
    fn from(value: Compression) -> Self {
        match value {
            Compression::Deflated => zip::CompressionMethod::Deflated,
            Compression::Stored => zip::CompressionMethod::Stored,
        }
    }
}
