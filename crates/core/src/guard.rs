//! Live fetch of uncurated pages.
//!
//! When no curated artifact exists, the page is fetched from the origin and
//! converted. The fetch is same-origin only, never follows redirects by
//! itself, and never buffers more than the size ceiling.

use http::header::{ACCEPT, CONTENT_LENGTH, COOKIE, LOCATION};
use http::{HeaderMap, HeaderValue};
use tracing::{debug, warn};
use url::Url;

use crate::convert::Converter;
use crate::error::Rejection;
use crate::fetch::{FetchResponse, Fetcher, INTERNAL_FETCH_HEADER, ResponseBody};
use crate::path::is_valid_path;
use crate::resolve::{CachePolicy, ResolvedContent};
use crate::signal::MARKDOWN_MEDIA_TYPE;

/// Largest live response body accepted: 5 MiB.
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// What a single live fetch produced.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveOutcome {
    /// Converted page content.
    Content(ResolvedContent),
    /// A same-origin redirect to this validated logical path.
    Redirect(String),
    /// Nothing usable.
    Unavailable(Rejection),
}

/// Fetches and converts live pages from a single origin.
#[derive(Debug, Clone)]
pub struct LiveFetchGuard<F, C> {
    fetcher: F,
    converter: C,
    origin: Url,
    max_body_bytes: usize,
}

impl<F: Fetcher, C: Converter> LiveFetchGuard<F, C> {
    pub fn new(fetcher: F, converter: C, origin: Url) -> Self {
        Self { fetcher, converter, origin, max_body_bytes: MAX_BODY_BYTES }
    }

    /// Overrides the response size ceiling.
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Fetches `logical_path` from the origin and converts it.
    ///
    /// `hops` is the number of alias or redirect hops already taken for
    /// this request; a redirect response is only reported while
    /// `hops < max_hops`.
    pub async fn fetch_and_convert(
        &self, logical_path: &str, cookies: Option<&str>, hops: usize, max_hops: usize,
    ) -> LiveOutcome {
        let url = self.page_url(logical_path);
        if !same_origin(&url, &self.origin) {
            warn!(path = logical_path, url = %url, "fetch URL left the origin");
            return LiveOutcome::Unavailable(Rejection::ForeignHost(url.host_str().unwrap_or_default().to_string()));
        }
        debug!(url = %url, hops, "live fetch");
        let response = match self.fetcher.fetch(&url, request_headers(cookies)).await {
            Ok(response) => response,
            Err(e) => return LiveOutcome::Unavailable(Rejection::Transport(e.to_string())),
        };

        if response.status.is_redirection() {
            if hops >= max_hops {
                return LiveOutcome::Unavailable(Rejection::HopLimit);
            }
            return self.redirect_target(&url, &response.headers);
        }

        if !response.status.is_success() {
            return LiveOutcome::Unavailable(Rejection::UpstreamStatus(response.status.as_u16()));
        }

        match self.read_body(response).await {
            Ok(body) => LiveOutcome::Content(ResolvedContent {
                body: self.converter.convert(&body),
                cache_policy: CachePolicy::Private,
            }),
            Err(rejection) => LiveOutcome::Unavailable(rejection),
        }
    }

    /// Validates a redirect's `location` and returns its logical path.
    fn redirect_target(&self, from: &Url, headers: &HeaderMap) -> LiveOutcome {
        let Some(location) = headers.get(LOCATION).and_then(|v| v.to_str().ok()) else {
            return LiveOutcome::Unavailable(Rejection::MissingLocation);
        };
        let target = match from.join(location) {
            Ok(target) => target,
            Err(_) => return LiveOutcome::Unavailable(Rejection::InvalidRedirectTarget(location.to_string())),
        };
        if !same_origin(&target, &self.origin) {
            warn!(from = %from, location, "redirect to foreign host refused");
            return LiveOutcome::Unavailable(Rejection::ForeignHost(
                target.host_str().unwrap_or_default().to_string(),
            ));
        }

        let Some(path) = strip_base(target.path(), self.base_path()) else {
            debug!(from = %from, location, "redirect outside the origin base path");
            return LiveOutcome::Unavailable(Rejection::InvalidRedirectTarget(target.path().to_string()));
        };
        if !is_valid_path(path) {
            return LiveOutcome::Unavailable(Rejection::InvalidRedirectTarget(path.to_string()));
        }
        LiveOutcome::Redirect(path.to_string())
    }

    /// The origin's path without its trailing slash; empty for a bare host.
    fn base_path(&self) -> &str {
        self.origin.path().trim_end_matches('/')
    }

    /// `logical_path` appended to the origin's base path.
    fn page_url(&self, logical_path: &str) -> Url {
        let mut url = self.origin.clone();
        url.set_path(&format!("{}{logical_path}", self.base_path()));
        url.set_query(None);
        url.set_fragment(None);
        url
    }

    /// Reads the body under the size ceiling.
    async fn read_body<B: ResponseBody>(&self, response: FetchResponse<B>) -> Result<String, Rejection> {
        let limit = self.max_body_bytes;
        let declared = response
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        if let Some(declared) = declared
            && declared > limit as u64
        {
            return Err(Rejection::Oversized { limit, actual: Some(declared) });
        }

        let mut body = response.body;
        let mut buf = Vec::new();
        loop {
            match body.chunk().await {
                Ok(Some(chunk)) => {
                    if buf.len() + chunk.len() > limit {
                        return Err(Rejection::Oversized { limit, actual: None });
                    }
                    buf.extend_from_slice(&chunk);
                }
                Ok(None) => break,
                Err(e) => return Err(Rejection::Transport(e.to_string())),
            }
        }

        let text = String::from_utf8_lossy(&buf).into_owned();
        if text.trim().is_empty() {
            return Err(Rejection::EmptyBody);
        }
        Ok(text)
    }
}

/// Headers for the internal fetch: marker, wanted representation, cookies.
fn request_headers(cookies: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(INTERNAL_FETCH_HEADER, HeaderValue::from_static("1"));
    headers.insert(ACCEPT, HeaderValue::from_static(MARKDOWN_MEDIA_TYPE));
    if let Some(value) = cookies.filter(|c| !c.is_empty()).and_then(|c| HeaderValue::from_str(c).ok()) {
        headers.insert(COOKIE, value);
    }
    headers
}

/// Logical path of an origin path under `base`.
fn strip_base<'a>(path: &'a str, base: &str) -> Option<&'a str> {
    if base.is_empty() {
        return Some(path);
    }
    match path.strip_prefix(base)? {
        "" => Some("/"),
        rest if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

/// Same host and port.
pub fn same_origin(url: &Url, origin: &Url) -> bool {
    url.host_str().is_some()
        && url.host_str() == origin.host_str()
        && url.port_or_known_default() == origin.port_or_known_default()
}
