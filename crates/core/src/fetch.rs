//! The HTTP fetch primitive used for live pages.
//!
//! [`Fetcher`] is the seam between the live fetch guard and the network.
//! Implementations must not follow redirects on their own: a 3xx response
//! is handed back as-is so the guard can vet the `location` before any
//! forwarded cookie travels further. [`ReqwestFetcher`] is the production
//! implementation.

use std::future::Future;
#[cfg(feature = "fetch")]
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use url::Url;

use crate::Result;

/// Header marking a request as an internal fetch, so the front door
/// passes it through instead of classifying it again.
pub const INTERNAL_FETCH_HEADER: &str = "x-agentmd-internal";

/// HTTP client configuration for live fetches.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// User-Agent sent to the origin.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 10, user_agent: format!("agentmd/{} (internal fetch)", env!("CARGO_PKG_VERSION")) }
    }
}

/// Status, headers and an unread body.
#[derive(Debug)]
pub struct FetchResponse<B> {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: B,
}

/// A response body read incrementally.
pub trait ResponseBody: Send {
    /// Next chunk, or `None` at the end of the body.
    fn chunk(&mut self) -> impl Future<Output = Result<Option<Bytes>>> + Send;
}

/// Issues a single GET without following redirects.
pub trait Fetcher: Send + Sync {
    type Body: ResponseBody;

    fn fetch(&self, url: &Url, headers: HeaderMap) -> impl Future<Output = Result<FetchResponse<Self::Body>>> + Send;
}

/// [`Fetcher`] backed by a reqwest client with redirects disabled.
#[cfg(feature = "fetch")]
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    timeout: u64,
}

#[cfg(feature = "fetch")]
impl ReqwestFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { client, timeout: config.timeout })
    }
}

#[cfg(feature = "fetch")]
impl Fetcher for ReqwestFetcher {
    type Body = ReqwestBody;

    async fn fetch(&self, url: &Url, headers: HeaderMap) -> Result<FetchResponse<ReqwestBody>> {
        let response = self
            .client
            .get(url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| timeout_or(e, self.timeout))?;

        Ok(FetchResponse { status: response.status(), headers: response.headers().clone(), body: ReqwestBody(response) })
    }
}

/// Streaming body of a reqwest response.
#[cfg(feature = "fetch")]
#[derive(Debug)]
pub struct ReqwestBody(reqwest::Response);

#[cfg(feature = "fetch")]
impl ResponseBody for ReqwestBody {
    async fn chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(self.0.chunk().await?)
    }
}

#[cfg(feature = "fetch")]
fn timeout_or(e: reqwest::Error, timeout: u64) -> crate::AgentMdError {
    if e.is_timeout() { crate::AgentMdError::Timeout { timeout } } else { crate::AgentMdError::HttpError(e) }
}

/// A body already held in memory, yielded in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct BufferedBody {
    data: Bytes,
    chunk_size: usize,
}

impl BufferedBody {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into(), chunk_size: 16 * 1024 }
    }
}

impl ResponseBody for BufferedBody {
    async fn chunk(&mut self) -> Result<Option<Bytes>> {
        if self.data.is_empty() {
            return Ok(None);
        }
        let n = self.chunk_size.min(self.data.len());
        Ok(Some(self.data.split_to(n)))
    }
}
