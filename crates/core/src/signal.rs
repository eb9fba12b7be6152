//! Request classification.
//!
//! Decides whether a request wants Markdown instead of the rendered page,
//! and records which signal made that decision. Checks run in a fixed
//! order: the `.md` suffix, then the `Accept` header, then the
//! `User-Agent`. The first match wins.
//!
//! # Example
//!
//! ```rust
//! use agentmd_core::signal::{DetectOptions, Signal, detect};
//!
//! let options = DetectOptions::default();
//! let signal = detect("/pricing", Some("text/markdown;q=0.8"), None, &options);
//! assert_eq!(signal, Some(Signal::AcceptHeader { quality: 0.8 }));
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Reserved path suffix that asks for the Markdown form of a page.
pub const MARKDOWN_SUFFIX: &str = ".md";

/// Media type agents negotiate for.
pub const MARKDOWN_MEDIA_TYPE: &str = "text/markdown";

/// Built-in client identifier fragments of known AI agents and crawlers.
///
/// Matching is a case-sensitive substring test against the `User-Agent`.
pub const BOT_PATTERNS: &[&str] = &[
    "GPTBot",
    "ChatGPT-User",
    "OAI-SearchBot",
    "ClaudeBot",
    "Claude-User",
    "Claude-Web",
    "anthropic-ai",
    "PerplexityBot",
    "Perplexity-User",
    "Google-Extended",
    "Applebot-Extended",
    "CCBot",
    "cohere-ai",
    "Bytespider",
    "Amazonbot",
    "meta-externalagent",
    "YouBot",
    "DuckAssistBot",
    "Diffbot",
    "MistralAI-User",
];

/// Why a request was classified as wanting Markdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    /// The path ended in `.md`; `original_path` is the path with it stripped.
    MdSuffix { original_path: String },
    /// The `Accept` header listed `text/markdown` with this quality.
    AcceptHeader { quality: f32 },
    /// The `User-Agent` contained a known bot pattern.
    UserAgent { matched_pattern: String },
}

impl Signal {
    /// Compact form used in the `x-agentmd-signal` response header.
    pub fn header_value(&self) -> String {
        match self {
            Signal::MdSuffix { .. } => "md-suffix".to_string(),
            Signal::AcceptHeader { quality } => format!("accept;q={quality}"),
            Signal::UserAgent { matched_pattern } => format!("user-agent={matched_pattern}"),
        }
    }

    /// The logical path to resolve for a request made to `request_path`.
    pub fn logical_path<'a>(&'a self, request_path: &'a str) -> &'a str {
        match self {
            Signal::MdSuffix { original_path } => original_path,
            _ => request_path,
        }
    }
}

/// Switches and extra patterns for detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectOptions {
    /// Honour the `.md` suffix (default: true).
    pub md_suffix: bool,
    /// Honour known bot user agents (default: true).
    pub user_agents: bool,
    /// Patterns checked after [`BOT_PATTERNS`].
    pub extra_bot_patterns: Vec<String>,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self { md_suffix: true, user_agents: true, extra_bot_patterns: Vec::new() }
    }
}

/// Classifies a request.
///
/// `accept` and `user_agent` are the raw header values, if present.
pub fn detect(path: &str, accept: Option<&str>, user_agent: Option<&str>, options: &DetectOptions) -> Option<Signal> {
    if options.md_suffix
        && let Some(original_path) = strip_markdown_suffix(path)
    {
        return Some(Signal::MdSuffix { original_path });
    }

    if let Some(quality) = accept.and_then(markdown_quality) {
        return Some(Signal::AcceptHeader { quality });
    }

    if options.user_agents
        && let Some(ua) = user_agent
    {
        let patterns = BOT_PATTERNS
            .iter()
            .copied()
            .chain(options.extra_bot_patterns.iter().map(String::as_str));
        for pattern in patterns {
            if !pattern.is_empty() && ua.contains(pattern) {
                return Some(Signal::UserAgent { matched_pattern: pattern.to_string() });
            }
        }
    }

    None
}

/// Strips the reserved suffix, mapping an empty remainder to `/`.
pub fn strip_markdown_suffix(path: &str) -> Option<String> {
    let stripped = path.strip_suffix(MARKDOWN_SUFFIX)?;
    if stripped.is_empty() { Some("/".to_string()) } else { Some(stripped.to_string()) }
}

/// Returns the quality of the first `text/markdown` entry in an `Accept` value.
fn markdown_quality(accept: &str) -> Option<f32> {
    for entry in accept.split(',') {
        let mut parts = entry.split(';');
        let media_type = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        if media_type != MARKDOWN_MEDIA_TYPE {
            continue;
        }

        let quality = parts
            .map(str::trim)
            .find_map(|param| {
                let (name, value) = param.split_once('=')?;
                name.trim().eq_ignore_ascii_case("q").then(|| value.trim())
            })
            .and_then(|value| value.parse::<f32>().ok())
            .filter(|q| q.is_finite())
            .map(|q| q.clamp(0.0, 1.0))
            .unwrap_or(1.0);

        return Some(quality);
    }

    None
}

/// Detection options plus the exclude list, built once at startup.
#[derive(Debug, Clone)]
pub struct Detector {
    options: DetectOptions,
    excludes: Vec<Regex>,
}

impl Detector {
    /// Builds a detector. Exclude patterns are matched against the whole
    /// path; `*` matches any run of characters.
    pub fn new(options: DetectOptions, exclude_patterns: &[String]) -> Result<Self> {
        let excludes = exclude_patterns
            .iter()
            .map(|pattern| glob_to_regex(pattern))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { options, excludes })
    }

    /// Whether `path` (or its suffix-stripped form) is excluded.
    pub fn is_excluded(&self, path: &str) -> bool {
        let stripped = strip_markdown_suffix(path);
        let target = stripped.as_deref().unwrap_or(path);
        self.excludes.iter().any(|re| re.is_match(target) || re.is_match(path))
    }

    /// [`detect`], skipping excluded paths.
    pub fn classify(&self, path: &str, accept: Option<&str>, user_agent: Option<&str>) -> Option<Signal> {
        if self.is_excluded(path) {
            return None;
        }
        detect(path, accept, user_agent, &self.options)
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let body = pattern.split('*').map(regex::escape).collect::<Vec<_>>().join(".*");
    Ok(Regex::new(&format!("^{body}$"))?)
}
