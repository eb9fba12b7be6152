//! Resolution of a logical path to Markdown.
//!
//! [`Resolver`] ties the pieces together: validate the path, look for a
//! curated artifact (following `redirect` aliases), and fall back to a live
//! fetch of the page (following same-origin redirects). Aliases and
//! redirects share one hop budget of [`MAX_HOPS`], so a request makes at
//! most four resolution attempts.
//!
//! Every failure is reported to the caller as [`Resolution::NotFound`],
//! except a malformed inbound path, which is [`Resolution::InvalidInput`].
//! The underlying [`Rejection`] is logged and available from
//! [`Resolver::resolve_traced`].

use serde::Serialize;
use tracing::{debug, warn};

use crate::convert::Converter;
use crate::error::Rejection;
use crate::fetch::Fetcher;
use crate::frontmatter::parse_artifact;
use crate::guard::{LiveFetchGuard, LiveOutcome};
use crate::path::is_valid_path;
use crate::store::{ArtifactStore, ContentTree};

/// Most alias or redirect hops followed for one request.
pub const MAX_HOPS: usize = 3;

/// How long and how widely a response may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
    /// Curated content: long-lived, shareable.
    Public,
    /// Live-fetched content: cookies may have shaped it.
    Private,
}

/// Content ready to be written to a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedContent {
    pub body: String,
    pub cache_policy: CachePolicy,
}

/// Outcome of resolving a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ResolvedContent),
    NotFound,
    /// The inbound path failed validation.
    InvalidInput,
}

impl Resolution {
    pub fn content(&self) -> Option<&ResolvedContent> {
        match self {
            Resolution::Found(content) => Some(content),
            _ => None,
        }
    }
}

/// What happened while resolving, for logs and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionTrace {
    /// Hops taken.
    pub hops: usize,
    /// Logical paths visited, starting with the requested one.
    pub visited: Vec<String>,
    /// Why resolution failed, when it did.
    pub rejection: Option<Rejection>,
}

/// The logical path currently being resolved and the hops spent so far.
#[derive(Debug, Clone)]
struct ResolutionRequest {
    path: String,
    hops: usize,
}

impl ResolutionRequest {
    fn new(path: &str) -> Self {
        Self { path: path.to_string(), hops: 0 }
    }

    /// Moves to `target`, spending a hop.
    fn follow(&mut self, target: String, max_hops: usize) -> Result<(), Rejection> {
        if self.hops >= max_hops {
            return Err(Rejection::HopLimit);
        }
        self.hops += 1;
        self.path = target;
        Ok(())
    }
}

enum Step {
    Done(ResolvedContent),
    Follow(String),
    Fail(Rejection),
}

/// Resolves logical paths against curated artifacts and the live origin.
#[derive(Debug, Clone)]
pub struct Resolver<T, F, C> {
    store: ArtifactStore<T>,
    live: Option<LiveFetchGuard<F, C>>,
    max_hops: usize,
}

impl<T: ContentTree, F: Fetcher, C: Converter> Resolver<T, F, C> {
    /// A resolver over curated artifacts only.
    pub fn new(store: ArtifactStore<T>) -> Self {
        Self { store, live: None, max_hops: MAX_HOPS }
    }

    /// Enables the live fetch fallback.
    pub fn with_live_fetch(mut self, guard: LiveFetchGuard<F, C>) -> Self {
        self.live = Some(guard);
        self
    }

    /// Resolves `path`, forwarding `cookies` to live fetches.
    pub async fn resolve(&self, path: &str, cookies: Option<&str>) -> Resolution {
        self.resolve_traced(path, cookies).await.0
    }

    /// [`Resolver::resolve`], also returning what happened.
    pub async fn resolve_traced(&self, path: &str, cookies: Option<&str>) -> (Resolution, ResolutionTrace) {
        let mut trace = ResolutionTrace::default();
        if !is_valid_path(path) {
            debug!(path, "rejected invalid path");
            return (Resolution::InvalidInput, trace);
        }

        let mut request = ResolutionRequest::new(path);
        loop {
            trace.visited.push(request.path.clone());
            let step = self.step(&request, cookies).await;
            let rejection = match step {
                Step::Done(content) => {
                    trace.hops = request.hops;
                    return (Resolution::Found(content), trace);
                }
                Step::Follow(target) => match request.follow(target, self.max_hops) {
                    Ok(()) => continue,
                    Err(rejection) => rejection,
                },
                Step::Fail(rejection) => rejection,
            };

            trace.hops = request.hops;
            if rejection.is_security() {
                warn!(path, at = %request.path, hops = request.hops, reason = %rejection, "resolution refused");
            } else {
                debug!(path, at = %request.path, hops = request.hops, reason = %rejection, "resolution missed");
            }
            trace.rejection = Some(rejection);
            return (Resolution::NotFound, trace);
        }
    }

    /// One resolution attempt for the current path.
    async fn step(&self, request: &ResolutionRequest, cookies: Option<&str>) -> Step {
        if let Some(stored) = self.store.find(&request.path).await {
            let artifact = parse_artifact(&stored.text);
            return match artifact.redirect_target {
                Some(target) if is_valid_path(&target) => {
                    debug!(from = %request.path, to = %target, "following artifact alias");
                    Step::Follow(target)
                }
                Some(target) => Step::Fail(Rejection::InvalidRedirectTarget(target)),
                None => {
                    debug!(path = %request.path, artifact = %stored.path.display(), "curated artifact");
                    Step::Done(ResolvedContent { body: artifact.body, cache_policy: CachePolicy::Public })
                }
            };
        }

        let Some(live) = &self.live else {
            return Step::Fail(Rejection::Missing);
        };
        match live.fetch_and_convert(&request.path, cookies, request.hops, self.max_hops).await {
            LiveOutcome::Content(content) => Step::Done(content),
            LiveOutcome::Redirect(target) => {
                debug!(from = %request.path, to = %target, "following origin redirect");
                Step::Follow(target)
            }
            LiveOutcome::Unavailable(rejection) => Step::Fail(rejection),
        }
    }
}

#[cfg(feature = "fetch")]
mod default_stack {
    use super::Resolver;
    use crate::config::AgentMdConfig;
    use crate::convert::HtmlToMarkdown;
    use crate::fetch::ReqwestFetcher;
    use crate::guard::LiveFetchGuard;
    use crate::store::{ArtifactStore, FsContentTree};

    /// Filesystem artifacts, reqwest live fetches, `htmd` conversion.
    pub type DefaultResolver = Resolver<FsContentTree, ReqwestFetcher, HtmlToMarkdown>;

    impl DefaultResolver {
        /// Builds the production resolver from configuration.
        ///
        /// Live fetching is enabled only when an origin is configured.
        pub fn from_config(config: &AgentMdConfig) -> crate::Result<Self> {
            let store = ArtifactStore::new(FsContentTree::new(&config.content_root), &config.artifact_name);
            let resolver = Resolver::new(store);
            match config.origin_url()? {
                Some(origin) => {
                    let guard = LiveFetchGuard::new(ReqwestFetcher::new(&config.fetch)?, HtmlToMarkdown, origin)
                        .with_max_body_bytes(config.max_body_bytes);
                    Ok(resolver.with_live_fetch(guard))
                }
                None => Ok(resolver),
            }
        }
    }
}

#[cfg(feature = "fetch")]
pub use default_stack::DefaultResolver;
