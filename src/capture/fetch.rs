//! Resource fetching for tiles, marker icons and description pictures.

use crate::{Error, Result};
use base64::Engine as _;

#[cfg(feature = "http")]
use reqwest::blocking::Client;
#[cfg(feature = "http")]
use std::time::Duration;

/// Loads the bytes behind a resource URL.
pub trait ResourceFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Resolve `data:` and `file://` URLs without touching the network.
///
/// Returns `None` for any other scheme.
pub fn fetch_local(url: &str) -> Option<Result<Vec<u8>>> {
    if let Some(rest) = url.strip_prefix("data:") {
        return Some(decode_data_url(rest));
    }
    if url.starts_with("file:") {
        let res = url::Url::parse(url)
            .map_err(|e| Error::NetworkError(format!("bad file URL {}: {}", url, e)))
            .and_then(|u| {
                u.to_file_path()
                    .map_err(|_| Error::NetworkError(format!("not a local path: {}", url)))
            })
            .and_then(|p| std::fs::read(p).map_err(Error::from));
        return Some(res);
    }
    None
}

// Plain (non-base64) payloads are taken verbatim.
fn decode_data_url(rest: &str) -> Result<Vec<u8>> {
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::NetworkError("malformed data URL".into()))?;
    if meta.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| Error::NetworkError(format!("invalid base64 in data URL: {}", e)))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

/// Whether drawing `resource` into a canvas owned by `page_origin` keeps it
/// untainted. Local (`data:`/`file:`) resources never taint.
pub fn is_same_origin(resource: &str, page_origin: &str) -> bool {
    if resource.starts_with("data:") || resource.starts_with("file:") {
        return true;
    }
    match (url::Url::parse(resource), url::Url::parse(page_origin)) {
        (Ok(r), Ok(p)) => r.origin() == p.origin(),
        _ => false,
    }
}

/// Fetcher that refuses every remote URL.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineFetcher;

impl ResourceFetcher for OfflineFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        fetch_local(url)
            .unwrap_or_else(|| Err(Error::NetworkError(format!("offline; not fetching {}", url))))
    }
}

/// Blocking HTTP fetcher.
#[cfg(feature = "http")]
pub struct HttpFetcher {
    client: Client,
    user_agent: String,
}

#[cfg(feature = "http")]
impl HttpFetcher {
    pub fn new(user_agent: &str, timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| Error::NetworkError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }
}

#[cfg(feature = "http")]
impl ResourceFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if let Some(local) = fetch_local(url) {
            return local;
        }
        let resp = self
            .client
            .get(url)
            .header("User-Agent", self.user_agent.clone())
            .send()
            .map_err(|e| Error::NetworkError(format!("Failed to fetch {}: {}", url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::NetworkError(format!("{} returned {}", url, status)));
        }

        let body = resp
            .bytes()
            .map_err(|e| Error::NetworkError(format!("Failed to read response body: {}", e)))?;
        Ok(body.to_vec())
    }
}
