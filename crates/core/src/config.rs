//! Process-wide configuration.
//!
//! Built once at startup (from a TOML file, the builder, or both) and then
//! shared read-only with the detector and resolver.
//!
//! # Example
//!
//! ```rust
//! use agentmd_core::AgentMdConfig;
//!
//! let config = AgentMdConfig::builder()
//!     .content_root("site/content")
//!     .origin("http://127.0.0.1:3000")
//!     .exclude_path("/api/*")
//!     .build();
//! assert_eq!(config.artifact_name, "page.md");
//! ```
//!
//! The same settings as TOML:
//!
//! ```toml
//! content_root = "site/content"
//! origin = "http://127.0.0.1:3000"
//! exclude_paths = ["/api/*"]
//!
//! [detect]
//! extra_bot_patterns = ["MyCrawler"]
//!
//! [fetch]
//! timeout = 5
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::fetch::FetchConfig;
use crate::guard::MAX_BODY_BYTES;
use crate::signal::{DetectOptions, Detector};
use crate::store::DEFAULT_ARTIFACT_NAME;
use crate::{AgentMdError, Result};

/// Everything the detector and resolver need.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentMdConfig {
    /// Root of the curated artifact tree (default: `content`).
    pub content_root: PathBuf,

    /// Artifact file name in each directory (default: `page.md`).
    pub artifact_name: String,

    /// Base URL of the host site for live fetches. Live fetching is off
    /// when unset.
    pub origin: Option<String>,

    /// Detection switches and extra bot patterns.
    pub detect: DetectOptions,

    /// Paths never classified, `*` as wildcard.
    pub exclude_paths: Vec<String>,

    /// HTTP client settings for live fetches.
    pub fetch: FetchConfig,

    /// Live response size ceiling in bytes (default: 5 MiB).
    pub max_body_bytes: usize,

    /// Heading of the generated site index.
    pub site_title: Option<String>,
}

impl Default for AgentMdConfig {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("content"),
            artifact_name: DEFAULT_ARTIFACT_NAME.to_string(),
            origin: None,
            detect: DetectOptions::default(),
            exclude_paths: Vec::new(),
            fetch: FetchConfig::default(),
            max_body_bytes: MAX_BODY_BYTES,
            site_title: None,
        }
    }
}

impl AgentMdConfig {
    pub fn builder() -> AgentMdConfigBuilder {
        AgentMdConfigBuilder::new()
    }

    /// `<config dir>/agentmd/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("agentmd").join("config.toml"))
    }

    /// Reads and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AgentMdError::FileNotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parses and validates TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file at [`AgentMdConfig::default_path`] when it exists,
    /// otherwise returns the defaults.
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let name = &self.artifact_name;
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(AgentMdError::ConfigError(format!("artifact_name must be a plain file name, got {name:?}")));
        }
        if self.max_body_bytes == 0 {
            return Err(AgentMdError::ConfigError("max_body_bytes must be positive".to_string()));
        }
        self.origin_url()?;
        Ok(())
    }

    /// The parsed origin, which must be an http(s) URL with a host.
    pub fn origin_url(&self) -> Result<Option<Url>> {
        let Some(raw) = &self.origin else {
            return Ok(None);
        };
        let url = Url::parse(raw).map_err(|e| AgentMdError::InvalidUrl(format!("{raw}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(AgentMdError::InvalidUrl(format!("{raw}: origin must be an http(s) URL with a host")));
        }
        Ok(Some(url))
    }

    /// Builds the detector for these settings.
    pub fn detector(&self) -> Result<Detector> {
        Detector::new(self.detect.clone(), &self.exclude_paths)
    }
}

/// Fluent builder for [`AgentMdConfig`].
pub struct AgentMdConfigBuilder {
    config: AgentMdConfig,
}

impl AgentMdConfigBuilder {
    pub fn new() -> Self {
        Self { config: AgentMdConfig::default() }
    }

    /// Starts from an existing configuration.
    pub fn from_config(config: AgentMdConfig) -> Self {
        Self { config }
    }

    pub fn content_root(mut self, value: impl Into<PathBuf>) -> Self {
        self.config.content_root = value.into();
        self
    }

    pub fn artifact_name(mut self, value: impl Into<String>) -> Self {
        self.config.artifact_name = value.into();
        self
    }

    pub fn origin(mut self, value: impl Into<String>) -> Self {
        self.config.origin = Some(value.into());
        self
    }

    pub fn md_suffix(mut self, value: bool) -> Self {
        self.config.detect.md_suffix = value;
        self
    }

    pub fn user_agents(mut self, value: bool) -> Self {
        self.config.detect.user_agents = value;
        self
    }

    pub fn bot_pattern(mut self, value: impl Into<String>) -> Self {
        self.config.detect.extra_bot_patterns.push(value.into());
        self
    }

    pub fn exclude_path(mut self, value: impl Into<String>) -> Self {
        self.config.exclude_paths.push(value.into());
        self
    }

    /// Sets the live fetch timeout in seconds.
    pub fn timeout(mut self, value: u64) -> Self {
        self.config.fetch.timeout = value;
        self
    }

    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.config.fetch.user_agent = value.into();
        self
    }

    pub fn max_body_bytes(mut self, value: usize) -> Self {
        self.config.max_body_bytes = value;
        self
    }

    pub fn site_title(mut self, value: impl Into<String>) -> Self {
        self.config.site_title = Some(value.into());
        self
    }

    pub fn build(self) -> AgentMdConfig {
        self.config
    }
}

impl Default for AgentMdConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AgentMdConfig::default();
        assert_eq!(config.content_root, PathBuf::from("content"));
        assert_eq!(config.artifact_name, "page.md");
        assert_eq!(config.max_body_bytes, 5 * 1024 * 1024);
        assert!(config.detect.md_suffix);
        assert!(config.detect.user_agents);
        assert!(config.origin_url().unwrap().is_none());
    }

    #[test]
    fn test_from_toml() {
        let config = AgentMdConfig::from_toml(
            r#"
            content_root = "site/content"
            origin = "http://127.0.0.1:3000"
            exclude_paths = ["/api/*"]

            [detect]
            user_agents = false
            extra_bot_patterns = ["MyCrawler"]

            [fetch]
            timeout = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.content_root, PathBuf::from("site/content"));
        assert_eq!(config.origin_url().unwrap().unwrap().port(), Some(3000));
        assert!(!config.detect.user_agents);
        assert!(config.detect.md_suffix);
        assert_eq!(config.detect.extra_bot_patterns, vec!["MyCrawler"]);
        assert_eq!(config.fetch.timeout, 5);
        assert!(config.fetch.user_agent.contains("agentmd"));
        assert!(config.detector().unwrap().is_excluded("/api/v1"));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            AgentMdConfig::from_toml("content_root = ["),
            Err(AgentMdError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_rejects_bad_origin() {
        let config = AgentMdConfig::builder().origin("ftp://files.example").build();
        assert!(config.validate().is_err());
        let config = AgentMdConfig::builder().origin("not a url").build();
        assert!(matches!(config.origin_url(), Err(AgentMdError::InvalidUrl(_))));
    }

    #[test]
    fn test_rejects_bad_artifact_name() {
        for name in ["", "../page.md", "a/page.md", ".."] {
            let config = AgentMdConfig::builder().artifact_name(name).build();
            assert!(config.validate().is_err(), "{name}");
        }
    }

    #[test]
    fn test_load_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "artifact_name = \"index.md\"\nsite_title = \"Docs\"\n").unwrap();
        let config = AgentMdConfig::load(&path).unwrap();
        assert_eq!(config.artifact_name, "index.md");
        assert_eq!(config.site_title.as_deref(), Some("Docs"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = AgentMdConfig::load(Path::new("/nonexistent/agentmd.toml"));
        assert!(matches!(result, Err(AgentMdError::FileNotFound(_))));
    }

    #[test]
    fn test_builder() {
        let config = AgentMdConfig::builder()
            .content_root("c")
            .bot_pattern("X")
            .md_suffix(false)
            .timeout(3)
            .max_body_bytes(1024)
            .build();
        assert_eq!(config.detect.extra_bot_patterns, vec!["X"]);
        assert!(!config.detect.md_suffix);
        assert_eq!(config.fetch.timeout, 3);
        assert_eq!(config.max_body_bytes, 1024);
        assert!(config.validate().is_ok());
    }
}
