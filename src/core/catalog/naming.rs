// ─── Archive Naming ───
// `<title> (<version>) (<year>).zip`, stable across runs.

use chrono::{DateTime, Datelike, Local};

use super::record::{InstallerFile, TitleRecord};
use crate::core::error::{VaultError, VaultResult};

/// Characters rejected in file names by at least one common file system.
const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Output archive name for a title, derived from its first selected installer.
///
/// Pure: the same record and file always give the same string. The result is a
/// single path component; reserved characters become `_`.
pub fn archive_file_name(record: &TitleRecord, first: &InstallerFile) -> VaultResult<String> {
    let year = release_year(record.release_timestamp)?;
    let name = format!("{} ({}) ({}).zip", record.title, first.version, year);
    Ok(sanitize_file_name(&name))
}

/// Calendar year of an epoch-seconds timestamp in the local time zone.
fn release_year(timestamp: i64) -> VaultResult<i32> {
    let utc = DateTime::from_timestamp(timestamp, 0).ok_or_else(|| {
        VaultError::MalformedMetadata(format!("releaseTimestamp {timestamp} is out of range"))
    })?;
    Ok(utc.with_timezone(&Local).year())
}

fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_control() || RESERVED.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}
