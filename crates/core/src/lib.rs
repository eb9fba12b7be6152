//! Serve Markdown to AI agents.
//!
//! Classifies requests that want a machine-readable page (a `.md` suffix,
//! `Accept: text/markdown`, or a known agent `User-Agent`) and resolves
//! them to a curated Markdown artifact, or to a converted live page fetched
//! from the same origin.
//!
//! ```rust,no_run
//! use agentmd_core::{AgentMdConfig, DefaultResolver, Resolution};
//!
//! # async fn run() -> agentmd_core::Result<()> {
//! let config = AgentMdConfig::builder()
//!     .content_root("content")
//!     .origin("http://127.0.0.1:3000")
//!     .build();
//! let detector = config.detector()?;
//! let resolver = DefaultResolver::from_config(&config)?;
//!
//! if let Some(signal) = detector.classify("/pricing.md", None, None) {
//!     if let Resolution::Found(content) = resolver.resolve(signal.logical_path("/pricing.md"), None).await {
//!         println!("{}", content.body);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod fetch;
pub mod frontmatter;
pub mod guard;
pub mod path;
pub mod resolve;
pub mod signal;
pub mod site_index;
pub mod store;

pub use config::{AgentMdConfig, AgentMdConfigBuilder};
pub use convert::{Converter, HtmlToMarkdown, convert_html};
pub use error::{AgentMdError, Rejection, Result};
#[cfg(feature = "fetch")]
pub use fetch::ReqwestFetcher;
pub use fetch::{BufferedBody, FetchConfig, FetchResponse, Fetcher, INTERNAL_FETCH_HEADER, ResponseBody};
pub use frontmatter::{Artifact, parse_artifact};
pub use guard::{LiveFetchGuard, LiveOutcome, MAX_BODY_BYTES, same_origin};
pub use path::is_valid_path;
#[cfg(feature = "fetch")]
pub use resolve::DefaultResolver;
pub use resolve::{CachePolicy, MAX_HOPS, Resolution, ResolutionTrace, ResolvedContent, Resolver};
pub use signal::{BOT_PATTERNS, DetectOptions, Detector, MARKDOWN_MEDIA_TYPE, MARKDOWN_SUFFIX, Signal, detect};
pub use site_index::{IndexEntry, SiteIndex, build_site_index};
pub use store::{ArtifactStore, ContentTree, DEFAULT_ARTIFACT_NAME, FsContentTree, StoredArtifact, is_route_group};
