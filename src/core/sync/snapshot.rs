use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::catalog::TitleId;
use crate::core::error::{VaultError, VaultResult};

/// Persist the raw metadata of a title verbatim as `<dir>/<id>.json`.
///
/// Written before decoding so that records which fail to decode can still be
/// inspected afterwards.
pub async fn write_snapshot(dir: &Path, id: &TitleId, raw: &[u8]) -> VaultResult<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| VaultError::io(dir, e))?;

    let file_name = format!("{}.json", id.as_str().replace(['/', '\\'], "_"));
    let path = dir.join(file_name);
    tokio::fs::write(&path, raw)
        .await
        .map_err(|e| VaultError::io(&path, e))?;

    debug!("Saved metadata snapshot {:?}", path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("metadata");

        let path = write_snapshot(&target, &TitleId::new("1207658924"), b"not even json")
            .await
            .unwrap();

        assert_eq!(path, target.join("1207658924.json"));
        assert_eq!(std::fs::read(&path).unwrap(), b"not even json");
    }

    #[tokio::test]
    async fn ids_cannot_escape_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_snapshot(dir.path(), &TitleId::new("../x"), b"{}")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join(".._x.json"));
    }
}
