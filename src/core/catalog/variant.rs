// ─── Variant Selection ───
// Picks the installer set for a (language, platform) target.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::record::{InstallerFile, TitleRecord};
use crate::core::error::{VaultError, VaultResult};

/// The (language, platform) pair a run downloads installers for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantTarget {
    /// Language label exactly as the storefront spells it, e.g. `English`.
    pub language: String,
    /// Platform key inside a language entry, e.g. `windows`.
    pub platform: String,
}

impl Default for VariantTarget {
    fn default() -> Self {
        Self {
            language: "English".into(),
            platform: "windows".into(),
        }
    }
}

impl VariantTarget {
    pub fn new(language: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            platform: platform.into(),
        }
    }
}

impl TitleRecord {
    /// Installer files for `target`, in the order the storefront lists them.
    ///
    /// The first entry whose language equals `target.language` (case-sensitive)
    /// wins; later entries with the same label are never consulted. A missing
    /// platform key is an error rather than a fallback to another platform.
    pub fn select_variant(&self, target: &VariantTarget) -> VaultResult<&[InstallerFile]> {
        let entry = self
            .downloads
            .iter()
            .find(|d| d.language == target.language)
            .ok_or_else(|| VaultError::VariantNotFound {
                language: target.language.clone(),
            })?;

        let files = entry
            .platforms
            .get(&target.platform)
            .ok_or_else(|| VaultError::PlatformNotFound {
                language: target.language.clone(),
                platform: target.platform.clone(),
            })?;

        debug!(
            "Selected {}/{} for '{}': {} files",
            target.language,
            target.platform,
            self.title,
            files.len()
        );
        Ok(files)
    }
}
