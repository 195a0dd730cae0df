// ─── Title Record ───
// Decodes the per-title `gameDetails` JSON into a typed record.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::core::error::{VaultError, VaultResult};

/// Stable identifier of one owned title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TitleId(String);

impl TitleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TitleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TitleId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // The licences endpoint has served ids both as strings and as numbers.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => TitleId(s),
            RawId::Number(n) => TitleId(n.to_string()),
        })
    }
}

/// One downloadable installer file as listed in the title metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InstallerFile {
    /// Relative manual-download URL, e.g. `/downloads/foo/en1installer0`.
    #[serde(rename = "manualUrl")]
    pub remote_path: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub version: String,
    #[serde(rename = "date")]
    pub release_date: String,
    #[serde(rename = "size")]
    pub size_label: String,
}

/// Installer sets for one language, keyed by platform name (`windows`, `mac`, `linux`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEntry {
    pub language: String,
    pub platforms: BTreeMap<String, Vec<InstallerFile>>,
}

/// Decoded metadata for one title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleRecord {
    pub title: String,
    /// Release time in epoch seconds, `0` when the storefront omits it.
    pub release_timestamp: i64,
    pub downloads: Vec<DownloadEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    title: String,
    #[serde(default)]
    release_timestamp: Option<i64>,
    downloads: Vec<Value>,
}

impl TitleRecord {
    /// Decode raw metadata bytes.
    ///
    /// Every `downloads` element must be a `[language, {platform: [file, ...]}]`
    /// pair; anything else fails with `MalformedMetadata`.
    pub fn decode(raw: &[u8]) -> VaultResult<Self> {
        let record: RawRecord = serde_json::from_slice(raw)?;

        let downloads = record
            .downloads
            .into_iter()
            .enumerate()
            .map(|(index, value)| DownloadEntry::decode(index, value))
            .collect::<VaultResult<Vec<_>>>()?;

        debug!(
            "Decoded '{}' with {} language entries",
            record.title,
            downloads.len()
        );

        Ok(Self {
            title: record.title,
            release_timestamp: record.release_timestamp.unwrap_or(0),
            downloads,
        })
    }
}

impl DownloadEntry {
    fn decode(index: usize, value: Value) -> VaultResult<Self> {
        let Value::Array(items) = value else {
            return Err(VaultError::MalformedMetadata(format!(
                "downloads[{index}] is not an array"
            )));
        };
        let [language, platforms]: [Value; 2] = items.try_into().map_err(|items: Vec<Value>| {
            VaultError::MalformedMetadata(format!(
                "downloads[{index}] has {} elements, expected a [language, platforms] pair",
                items.len()
            ))
        })?;

        let Value::String(language) = language else {
            return Err(VaultError::MalformedMetadata(format!(
                "downloads[{index}][0] is not a language label"
            )));
        };

        let platforms: BTreeMap<String, Vec<InstallerFile>> = serde_json::from_value(platforms)
            .map_err(|e| {
                VaultError::MalformedMetadata(format!(
                    "downloads[{index}][1] is not a platform map for {language:?}: {e}"
                ))
            })?;

        Ok(Self {
            language,
            platforms,
        })
    }
}
