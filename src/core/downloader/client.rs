use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode, Url};
use tracing::{debug, info};

use super::{FileSource, RemoteFile, Storefront};
use crate::core::auth::Credentials;
use crate::core::catalog::TitleId;
use crate::core::error::{VaultError, VaultResult};
use crate::core::http::{build_http_client, Timeouts};

const STORE_URL: &str = "https://www.gog.com";
const LICENCES_URL: &str = "https://menu.gog.com/v1/account/licences";

/// Storefront URLs. Overridable so the client can be pointed at a mirror.
#[derive(Debug, Clone)]
pub struct Endpoints {
    /// Base for `gameDetails` lookups and relative manual-download paths.
    pub store: Url,
    /// Endpoint returning the JSON array of owned title ids.
    pub licences: Url,
}

impl Endpoints {
    /// The public GOG endpoints.
    pub fn gog() -> VaultResult<Self> {
        Self::new(STORE_URL, LICENCES_URL)
    }

    pub fn new(store: &str, licences: &str) -> VaultResult<Self> {
        let parse = |s: &str| {
            Url::parse(s).map_err(|e| VaultError::Settings {
                path: Default::default(),
                reason: format!("invalid endpoint {s:?}: {e}"),
            })
        };
        Ok(Self {
            store: parse(store)?,
            licences: parse(licences)?,
        })
    }

    /// `GET <store>/account/gameDetails/<id>.json`
    pub fn title_details(&self, id: &TitleId) -> VaultResult<Url> {
        self.store
            .join(&format!("/account/gameDetails/{id}.json"))
            .map_err(|e| VaultError::MalformedMetadata(format!("bad title id {id:?}: {e}")))
    }

    /// Absolute download URL for a manifest `manualUrl`.
    pub fn file_url(&self, remote_path: &str) -> VaultResult<Url> {
        if let Ok(absolute) = Url::parse(remote_path) {
            return Ok(absolute);
        }
        self.store.join(remote_path).map_err(|e| {
            VaultError::MalformedMetadata(format!("bad download path {remote_path:?}: {e}"))
        })
    }
}

/// GOG account client. Every request carries the session cookies.
pub struct GogClient {
    client: Client,
    endpoints: Endpoints,
    /// Deadline for a response to start arriving.
    request_timeout: Duration,
}

impl GogClient {
    pub fn new(credentials: &Credentials, timeouts: Timeouts) -> VaultResult<Self> {
        Ok(Self {
            client: build_http_client(credentials, timeouts)?,
            endpoints: Endpoints::gog()?,
            request_timeout: timeouts.request,
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    // ── JSON endpoints ──────────────────────────────────

    /// GET a small JSON document and return its body.
    async fn get_document(&self, url: Url) -> VaultResult<Bytes> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.request_timeout)
            .send()
            .await?;

        check_status(&url, response.status())?;
        Ok(response.bytes().await?)
    }
}

/// Map session rejections to `Auth` and any other non-2xx to `BadStatus`.
fn check_status(url: &Url, status: StatusCode) -> VaultResult<()> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(VaultError::Auth(format!(
            "{url} rejected the session (HTTP {})",
            status.as_u16()
        )));
    }
    if !status.is_success() {
        return Err(VaultError::BadStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(())
}

#[async_trait]
impl Storefront for GogClient {
    async fn list_owned_titles(&self) -> VaultResult<Vec<TitleId>> {
        info!("Fetching owned titles...");
        let body = self.get_document(self.endpoints.licences.clone()).await?;
        let ids: Vec<TitleId> = serde_json::from_slice(&body)?;
        info!("Account owns {} titles", ids.len());
        Ok(ids)
    }

    async fn fetch_title_metadata(&self, id: &TitleId) -> VaultResult<Bytes> {
        let url = self.endpoints.title_details(id)?;
        debug!("Fetching metadata for {}: {}", id, url);
        self.get_document(url).await
    }
}

#[async_trait]
impl FileSource for GogClient {
    /// Follow redirects to the CDN and hand back the unread body.
    async fn fetch_file(&self, remote_path: &str) -> VaultResult<RemoteFile> {
        let url = self.endpoints.file_url(remote_path)?;

        // Only the wait for headers is bounded here; body stalls are bounded by
        // the client's read timeout so multi-gigabyte installers can finish.
        let response: Response =
            tokio::time::timeout(self.request_timeout, self.client.get(url.clone()).send())
                .await
                .map_err(|_| VaultError::fetch(url.as_str(), "timed out waiting for response"))?
                .map_err(|e| VaultError::fetch(url.as_str(), e))?;

        match check_status(&url, response.status()) {
            Err(VaultError::BadStatus { status, .. }) => {
                return Err(VaultError::fetch(url.as_str(), format!("HTTP {status}")));
            }
            other => other?,
        }

        let final_url = response.url().clone();
        debug!("Resolved {} -> {}", url, final_url);

        let source = url.to_string();
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| VaultError::fetch(source.clone(), e)))
            .boxed();

        Ok(RemoteFile { final_url, body })
    }
}
