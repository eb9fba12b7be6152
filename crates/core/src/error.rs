//! Error types for agentmd operations.
//!
//! [`AgentMdError`] covers the fallible edges of the crate: loading
//! configuration, building the HTTP client, talking to the origin and
//! walking the content tree. The resolution pipeline itself never surfaces
//! these to its caller; see [`Rejection`] for how internal failures are
//! reported instead.
//!
//! # Example
//!
//! ```rust
//! use agentmd_core::{AgentMdError, Result};
//!
//! fn origin_for(raw: &str) -> Result<url::Url> {
//!     url::Url::parse(raw).map_err(|e| AgentMdError::InvalidUrl(e.to_string()))
//! }
//!
//! assert!(origin_for("not a url").is_err());
//! ```

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for agentmd operations.
#[derive(Error, Debug)]
pub enum AgentMdError {
    /// HTTP request errors from reqwest.
    ///
    /// Network errors, DNS failures and connection resets from the live fetch.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O errors while reading configuration or walking the content tree.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// TOML configuration could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// An exclude pattern could not be compiled.
    #[error("Invalid exclude pattern: {0}")]
    PatternError(#[from] regex::Error),

    /// Errors from the content tree walker.
    #[error("Failed to walk content tree: {0}")]
    WalkError(#[from] walkdir::Error),
}

/// Result type alias for AgentMdError.
pub type Result<T> = std::result::Result<T, AgentMdError>;

/// Why a resolution ended without content.
///
/// Every variant collapses to the same not-found outcome for the external
/// caller. The reason is only ever written to operator logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Neither a curated artifact nor a live page exists.
    Missing,
    /// More alias or redirect hops than allowed.
    HopLimit,
    /// An alias target or redirect location failed path validation.
    InvalidRedirectTarget(String),
    /// A URL pointed at a host other than the origin.
    ForeignHost(String),
    /// The live response was over the size ceiling.
    Oversized { limit: usize, actual: Option<u64> },
    /// The live response had a non-success, non-redirect status.
    UpstreamStatus(u16),
    /// A redirect response had no usable `location`.
    MissingLocation,
    /// The live response body was empty or whitespace.
    EmptyBody,
    /// The fetch itself failed (network, timeout, client construction).
    Transport(String),
}

impl Rejection {
    /// Rejections that indicate a possible probe or misconfiguration rather
    /// than an ordinary miss.
    pub fn is_security(&self) -> bool {
        matches!(
            self,
            Rejection::HopLimit
                | Rejection::InvalidRedirectTarget(_)
                | Rejection::ForeignHost(_)
                | Rejection::Oversized { .. }
        )
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Missing => write!(f, "no artifact and no live page"),
            Rejection::HopLimit => write!(f, "hop limit exceeded"),
            Rejection::InvalidRedirectTarget(target) => write!(f, "invalid redirect target {target:?}"),
            Rejection::ForeignHost(host) => write!(f, "foreign host {host:?}"),
            Rejection::Oversized { limit, actual: Some(actual) } => {
                write!(f, "response of {actual} bytes exceeds {limit}")
            }
            Rejection::Oversized { limit, actual: None } => write!(f, "response exceeds {limit} bytes"),
            Rejection::UpstreamStatus(status) => write!(f, "upstream status {status}"),
            Rejection::MissingLocation => write!(f, "redirect without location"),
            Rejection::EmptyBody => write!(f, "empty response body"),
            Rejection::Transport(msg) => write!(f, "transport failure: {msg}"),
        }
    }
}
