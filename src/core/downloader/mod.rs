pub mod client;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use reqwest::Url;

use crate::core::catalog::TitleId;
use crate::core::error::VaultResult;

pub use client::{Endpoints, GogClient};

/// Body of a remote installer file, read chunk by chunk.
pub type ByteStream = BoxStream<'static, VaultResult<Bytes>>;

/// An installer response whose body has not been consumed yet.
pub struct RemoteFile {
    /// URL the request ended at after following redirects.
    pub final_url: Url,
    pub body: ByteStream,
}

impl RemoteFile {
    /// Last non-empty path segment of the resolved URL, percent-decoded.
    pub fn file_name(&self) -> Option<String> {
        last_segment(self.final_url.path())
    }
}

/// Last non-empty `/`-separated segment of a URL path, percent-decoded.
///
/// A segment that does not decode to UTF-8 is returned as is.
pub fn last_segment(path: &str) -> Option<String> {
    let raw = path.rsplit('/').find(|s| !s.is_empty())?;
    match urlencoding::decode(raw) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(_) => Some(raw.to_string()),
    }
}

/// Capability to stream one installer file.
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn fetch_file(&self, remote_path: &str) -> VaultResult<RemoteFile>;
}

/// Everything the sync pipeline needs from the storefront.
#[async_trait]
pub trait Storefront: FileSource {
    /// Identifiers of every title owned by the account.
    async fn list_owned_titles(&self) -> VaultResult<Vec<TitleId>>;

    /// Raw `gameDetails` JSON for one title.
    async fn fetch_title_metadata(&self, id: &TitleId) -> VaultResult<Bytes>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_segment_skips_trailing_slash() {
        assert_eq!(last_segment("/a/b/setup.exe").as_deref(), Some("setup.exe"));
        assert_eq!(last_segment("/a/b/").as_deref(), Some("b"));
        assert_eq!(last_segment("/"), None);
    }

    #[test]
    fn file_name_comes_from_resolved_url() {
        let remote = RemoteFile {
            final_url: Url::parse("https://cdn.example.com/secure/setup_foo_1.0.exe?token=x")
                .unwrap(),
            body: Box::pin(futures_util::stream::empty()),
        };
        assert_eq!(remote.file_name().as_deref(), Some("setup_foo_1.0.exe"));
    }

    #[test]
    fn file_name_is_percent_decoded() {
        let remote = RemoteFile {
            final_url: Url::parse("https://cdn.example.com/x/setup foo (64bit)_%2867486%29.exe")
                .unwrap(),
            body: Box::pin(futures_util::stream::empty()),
        };
        assert_eq!(
            remote.file_name().as_deref(),
            Some("setup foo (64bit)_(67486).exe")
        );
    }

    #[test]
    fn undecodable_segment_is_kept_raw() {
        assert_eq!(last_segment("/x/setup%FF.exe").as_deref(), Some("setup%FF.exe"));
    }
}
