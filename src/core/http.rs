use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, COOKIE};
use reqwest::Client;

use crate::core::auth::Credentials;
use crate::core::error::{VaultError, VaultResult};

const APP_USER_AGENT: &str = concat!("gamevault-importer/", env!("CARGO_PKG_VERSION"));

/// Deadlines applied to storefront traffic.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Connection setup and time until response headers arrive.
    pub request: Duration,
    /// Longest allowed stall while reading a response body.
    pub read: Duration,
}

/// Build the shared client with the session cookies baked into its default headers.
///
/// reqwest drops the `Cookie` header when a redirect leaves the original host,
/// so CDN redirects never see the secrets.
pub fn build_http_client(credentials: &Credentials, timeouts: Timeouts) -> VaultResult<Client> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    let mut cookie = HeaderValue::from_str(&credentials.cookie_header())
        .map_err(|_| VaultError::Auth("session secrets contain invalid characters".into()))?;
    cookie.set_sensitive(true);
    default_headers.insert(COOKIE, cookie);

    let client = Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .connect_timeout(timeouts.request)
        .read_timeout(timeouts.read)
        .build()?;
    Ok(client)
}
