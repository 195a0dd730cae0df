// ─── Sync Pipeline ───
// One pass over the owned titles: metadata -> variant -> name -> archive.

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use super::snapshot::write_snapshot;
use crate::core::archive::{ArchiveReport, ArchiveSpec, ArchiveWriter};
use crate::core::catalog::{archive_file_name, TitleId, TitleRecord};
use crate::core::downloader::Storefront;
use crate::core::error::{VaultError, VaultResult};
use crate::core::state::SyncSettings;

/// Progress of a single title through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleState {
    Pending,
    MetadataFetched,
    VariantSelected,
    NameComputed,
    Skipped,
    Archived,
    Done,
    Failed,
}

/// How a title ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleOutcome {
    /// The archive was already on disk; nothing was downloaded.
    Skipped { path: PathBuf },
    Archived { path: PathBuf, report: ArchiveReport },
}

/// Result for one title of a run.
#[derive(Debug)]
pub struct TitleResult {
    pub id: TitleId,
    /// Last state reached before finishing or failing.
    pub state: TitleState,
    pub outcome: VaultResult<TitleOutcome>,
}

/// Summary of a whole run.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub titles: Vec<TitleResult>,
    /// The requested single title is not owned by the account.
    pub filter_missed: bool,
}

impl SyncReport {
    pub fn archived(&self) -> usize {
        self.count(|o| matches!(o, Ok(TitleOutcome::Archived { .. })))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Ok(TitleOutcome::Skipped { .. })))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| o.is_err())
    }

    /// `true` when every attempted title was archived or skipped.
    pub fn is_success(&self) -> bool {
        !self.filter_missed && self.failed() == 0
    }

    fn count<F>(&self, pred: F) -> usize
    where
        F: Fn(&VaultResult<TitleOutcome>) -> bool,
    {
        self.titles.iter().filter(|t| pred(&t.outcome)).count()
    }
}

/// Drives the per-title state machine over every owned title, one at a time.
pub struct SyncPipeline<'a, S: Storefront> {
    store: &'a S,
    settings: &'a SyncSettings,
    dest_dir: PathBuf,
}

impl<'a, S: Storefront> SyncPipeline<'a, S> {
    pub fn new(store: &'a S, settings: &'a SyncSettings, dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            settings,
            dest_dir: dest_dir.into(),
        }
    }

    /// Process every owned title (or only `filter`).
    ///
    /// Only failures before the first title (destination, listing) are returned
    /// as `Err`; per-title failures are recorded in the report.
    pub async fn run(&self, filter: Option<&TitleId>) -> VaultResult<SyncReport> {
        tokio::fs::create_dir_all(&self.dest_dir)
            .await
            .map_err(|e| VaultError::io(&self.dest_dir, e))?;

        let owned = self.store.list_owned_titles().await?;
        let mut report = SyncReport::default();

        let selected: Vec<TitleId> = match filter {
            Some(wanted) => {
                let hit: Vec<TitleId> = owned.into_iter().filter(|id| id == wanted).collect();
                if hit.is_empty() {
                    warn!("Title {} is not owned by this account", wanted);
                    report.filter_missed = true;
                }
                hit
            }
            None => owned,
        };

        for id in selected {
            let mut state = TitleState::Pending;
            let outcome = self.sync_title(&id, &mut state).await;

            match &outcome {
                Ok(TitleOutcome::Skipped { .. }) | Ok(TitleOutcome::Archived { .. }) => {
                    advance(&id, &mut state, TitleState::Done);
                }
                Err(e) => {
                    error!("Title {} failed after {:?} [{}]: {}", id, state, e.kind(), e);
                    advance(&id, &mut state, TitleState::Failed);
                }
            }

            report.titles.push(TitleResult { id, state, outcome });
        }

        info!(
            "Sync finished: {} archived, {} skipped, {} failed",
            report.archived(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    /// Run one title through the pipeline, recording progress in `state`.
    pub async fn sync_title(
        &self,
        id: &TitleId,
        state: &mut TitleState,
    ) -> VaultResult<TitleOutcome> {
        // 1. Fetch, snapshot and decode metadata
        let raw = self.store.fetch_title_metadata(id).await?;
        if let Some(dir) = self.settings.snapshot_dir_for(&self.dest_dir) {
            if let Err(e) = write_snapshot(&dir, id, &raw).await {
                warn!("Could not save metadata snapshot for {}: {}", id, e);
            }
        }
        let record = TitleRecord::decode(&raw)?;
        advance(id, state, TitleState::MetadataFetched);

        // 2. Pick the installer set
        let target = self.settings.target();
        let files = record.select_variant(&target)?;
        let first = files.first().ok_or_else(|| VaultError::VariantNotFound {
            language: target.language.clone(),
        })?;
        advance(id, state, TitleState::VariantSelected);

        // 3. Name the archive
        let spec = ArchiveSpec {
            output_name: archive_file_name(&record, first)?,
            entries: files.to_vec(),
        };
        let path = spec.output_path(&self.dest_dir);
        advance(id, state, TitleState::NameComputed);

        // 4. Skip what is already on disk
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| VaultError::io(&path, e))?;
        if exists {
            info!("{:?} already downloaded, skipping", path);
            advance(id, state, TitleState::Skipped);
            return Ok(TitleOutcome::Skipped { path });
        }

        // 5. Download into the archive
        info!(
            "'{}': found {} files, downloading into {:?}",
            record.title,
            spec.entries.len(),
            path
        );
        let report = ArchiveWriter::new(self.store)
            .with_policy(self.settings.on_fetch_failure)
            .with_compression(self.settings.compression)
            .write(&path, &spec.entries)
            .await?;
        if !report.missing.is_empty() {
            warn!(
                "'{}' archived without {} file(s): {:?}",
                record.title,
                report.missing.len(),
                report.missing
            );
        }
        advance(id, state, TitleState::Archived);

        Ok(TitleOutcome::Archived { path, report })
    }
}

fn advance(id: &TitleId, state: &mut TitleState, next: TitleState) {
    debug!("Title {}: {:?} -> {:?}", id, state, next);
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::archive::FetchFailurePolicy;
    use crate::core::downloader::{FileSource, RemoteFile};
    use crate::core::error::ErrorKind;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::StreamExt;
    use reqwest::Url;
    use std::collections::HashMap;
    use std::io::Read;
    use std::path::Path;
    use std::sync::Mutex;

    // 2021-06-15T00:00:00Z
    const MID_2021: i64 = 1_623_715_200;

    #[derive(Default)]
    struct StubStore {
        owned: Vec<TitleId>,
        metadata: HashMap<TitleId, Vec<u8>>,
        payloads: HashMap<String, &'static str>,
        file_calls: Mutex<Vec<String>>,
    }

    impl StubStore {
        fn title(mut self, id: &str, metadata: serde_json::Value) -> Self {
            let id = TitleId::new(id);
            self.owned.push(id.clone());
            self.metadata.insert(id, metadata.to_string().into_bytes());
            self
        }

        fn payload(mut self, remote_path: &str, body: &'static str) -> Self {
            self.payloads.insert(remote_path.to_string(), body);
            self
        }

        fn file_calls(&self) -> Vec<String> {
            self.file_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FileSource for StubStore {
        async fn fetch_file(&self, remote_path: &str) -> VaultResult<RemoteFile> {
            self.file_calls.lock().unwrap().push(remote_path.to_string());
            let body = self
                .payloads
                .get(remote_path)
                .ok_or_else(|| VaultError::fetch(remote_path, "HTTP 404"))?;
            Ok(RemoteFile {
                final_url: Url::parse("https://cdn.example.com")
                    .unwrap()
                    .join(remote_path)
                    .unwrap(),
                body: futures_util::stream::iter(vec![Ok(Bytes::from_static(body.as_bytes()))])
                    .boxed(),
            })
        }
    }

    #[async_trait]
    impl Storefront for StubStore {
        async fn list_owned_titles(&self) -> VaultResult<Vec<TitleId>> {
            Ok(self.owned.clone())
        }

        async fn fetch_title_metadata(&self, id: &TitleId) -> VaultResult<Bytes> {
            self.metadata
                .get(id)
                .map(|raw| Bytes::from(raw.clone()))
                .ok_or_else(|| VaultError::BadStatus {
                    url: format!("gameDetails/{id}.json"),
                    status: 404,
                })
        }
    }

    fn foo_metadata() -> serde_json::Value {
        serde_json::json!({
            "title": "Foo",
            "releaseTimestamp": MID_2021,
            "downloads": [
                ["English", {
                    "windows": [{
                        "manualUrl": "/dl/foo_1.0.exe",
                        "name": "Foo",
                        "version": "1.0",
                        "date": "",
                        "size": "12 MB"
                    }]
                }]
            ]
        })
    }

    fn single_entry(path: &Path) -> (String, Vec<u8>) {
        let mut archive = zip::ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_index(0).unwrap();
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        (entry.name().to_string(), data)
    }

    #[tokio::test]
    async fn archives_selected_variant_under_policy_name() {
        let store = StubStore::default()
            .title("1", foo_metadata())
            .payload("/dl/foo_1.0.exe", "installer bytes");
        let dir = tempfile::tempdir().unwrap();
        let settings = SyncSettings::default();

        let report = SyncPipeline::new(&store, &settings, dir.path())
            .run(None)
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.archived(), 1);
        assert_eq!(report.titles[0].state, TitleState::Done);

        let archive = dir.path().join("Foo (1.0) (2021).zip");
        assert_eq!(
            single_entry(&archive),
            ("foo_1.0.exe".to_string(), b"installer bytes".to_vec())
        );
        assert!(dir.path().join("metadata").join("1.json").exists());
    }

    #[tokio::test]
    async fn existing_archive_is_skipped_without_fetching() {
        let store = StubStore::default()
            .title("1", foo_metadata())
            .payload("/dl/foo_1.0.exe", "installer bytes");
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("Foo (1.0) (2021).zip");
        std::fs::write(&existing, b"previous run").unwrap();
        let settings = SyncSettings::default();

        let report = SyncPipeline::new(&store, &settings, dir.path())
            .run(None)
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.skipped(), 1);
        assert!(store.file_calls().is_empty());
        assert_eq!(std::fs::read(&existing).unwrap(), b"previous run");
    }

    #[tokio::test]
    async fn malformed_title_does_not_stop_the_batch() {
        let store = StubStore::default()
            .title(
                "broken",
                serde_json::json!({ "title": "Broken", "downloads": [["English"]] }),
            )
            .title("1", foo_metadata())
            .payload("/dl/foo_1.0.exe", "installer bytes");
        let dir = tempfile::tempdir().unwrap();
        let settings = SyncSettings::default();

        let report = SyncPipeline::new(&store, &settings, dir.path())
            .run(None)
            .await
            .unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failed(), 1);
        assert_eq!(report.archived(), 1);

        let broken = &report.titles[0];
        assert_eq!(broken.state, TitleState::Failed);
        let err = broken.outcome.as_ref().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedMetadata);
        // The raw record is still kept for inspection.
        assert!(dir.path().join("metadata").join("broken.json").exists());
        assert!(dir.path().join("Foo (1.0) (2021).zip").exists());
    }

    #[tokio::test]
    async fn missing_variant_fails_only_that_title() {
        let store = StubStore::default()
            .title(
                "de",
                serde_json::json!({
                    "title": "Nur Deutsch",
                    "releaseTimestamp": MID_2021,
                    "downloads": [["Deutsch", { "windows": [] }]]
                }),
            )
            .title(
                "empty",
                serde_json::json!({
                    "title": "Empty",
                    "downloads": [["English", { "windows": [] }]]
                }),
            )
            .title("1", foo_metadata())
            .payload("/dl/foo_1.0.exe", "installer bytes");
        let dir = tempfile::tempdir().unwrap();
        let settings = SyncSettings::default();

        let report = SyncPipeline::new(&store, &settings, dir.path())
            .run(None)
            .await
            .unwrap();

        let kinds: Vec<Option<ErrorKind>> = report
            .titles
            .iter()
            .map(|t| t.outcome.as_ref().err().map(|e| e.kind()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                Some(ErrorKind::VariantNotFound),
                Some(ErrorKind::VariantNotFound),
                None
            ]
        );
    }

    #[tokio::test]
    async fn failed_download_leaves_no_archive_behind() {
        let store = StubStore::default().title("1", foo_metadata());
        let dir = tempfile::tempdir().unwrap();
        let settings = SyncSettings {
            on_fetch_failure: FetchFailurePolicy::Abort,
            ..SyncSettings::default()
        };

        let report = SyncPipeline::new(&store, &settings, dir.path())
            .run(None)
            .await
            .unwrap();

        assert_eq!(report.failed(), 1);
        let err = report.titles[0].outcome.as_ref().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FetchFailed);
        assert!(!dir.path().join("Foo (1.0) (2021).zip").exists());
    }

    #[tokio::test]
    async fn filter_limits_run_to_one_title() {
        let store = StubStore::default()
            .title(
                "broken",
                serde_json::json!({ "title": "Broken", "downloads": [["English"]] }),
            )
            .title("1", foo_metadata())
            .payload("/dl/foo_1.0.exe", "installer bytes");
        let dir = tempfile::tempdir().unwrap();
        let settings = SyncSettings {
            write_snapshots: false,
            ..SyncSettings::default()
        };
        let pipeline = SyncPipeline::new(&store, &settings, dir.path());

        let report = pipeline.run(Some(&TitleId::new("1"))).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.titles.len(), 1);
        assert!(!dir.path().join("metadata").exists());

        let report = pipeline.run(Some(&TitleId::new("404"))).await.unwrap();
        assert!(report.titles.is_empty());
        assert!(!report.is_success());
    }
}
