use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::archive::{Compression, FetchFailurePolicy};
use crate::core::catalog::VariantTarget;
use crate::core::error::{VaultError, VaultResult};
use crate::core::http::Timeouts;

const APP_DIR_NAME: &str = "gamevault-importer";
const SETTINGS_FILE: &str = "settings.json";
const SNAPSHOT_DIR: &str = "metadata";

/// Tunables for one sync run, persisted as JSON.
///
/// Every field has a default, so a settings file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub language: String,
    pub platform: String,
    pub on_fetch_failure: FetchFailurePolicy,
    pub compression: Compression,
    pub request_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub write_snapshots: bool,
    /// Where raw metadata snapshots go. Defaults to `<dest>/metadata`.
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        let target = VariantTarget::default();
        Self {
            language: target.language,
            platform: target.platform,
            on_fetch_failure: FetchFailurePolicy::Abort,
            compression: Compression::Deflated,
            request_timeout_secs: 30,
            read_timeout_secs: 60,
            write_snapshots: true,
            snapshot_dir: None,
        }
    }
}

impl SyncSettings {
    pub fn target(&self) -> VariantTarget {
        VariantTarget::new(&self.language, &self.platform)
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            request: Duration::from_secs(self.request_timeout_secs.max(1)),
            read: Duration::from_secs(self.read_timeout_secs.max(1)),
        }
    }

    /// Snapshot directory for a run into `dest_dir`, or `None` when disabled.
    pub fn snapshot_dir_for(&self, dest_dir: &Path) -> Option<PathBuf> {
        if !self.write_snapshots {
            return None;
        }
        Some(
            self.snapshot_dir
                .clone()
                .unwrap_or_else(|| dest_dir.join(SNAPSHOT_DIR)),
        )
    }

    /// Load settings from an explicit file. A missing or invalid file is an error.
    pub fn load(path: &Path) -> VaultResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| VaultError::io(path, e))?;
        let settings = serde_json::from_str(&raw).map_err(|e| VaultError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Load the per-user settings file if there is one, defaults otherwise.
    pub fn load_default() -> Self {
        let Some(path) = default_settings_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            warn!("Ignoring settings file: {}", e);
            Self::default()
        })
    }
}

/// `<config dir>/gamevault-importer/settings.json`
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(SETTINGS_FILE))
}
