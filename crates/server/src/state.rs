use std::path::PathBuf;
use std::sync::Arc;

use agentmd_core::{AgentMdConfig, DefaultResolver, Detector};

/// Shared, read-only request handling state.
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<Detector>,
    pub resolver: Arc<DefaultResolver>,
    pub content_root: PathBuf,
    pub artifact_name: String,
    pub site_title: String,
}

impl AppState {
    /// Builds the detector and resolver once from configuration.
    pub fn from_config(config: &AgentMdConfig) -> agentmd_core::Result<Self> {
        config.validate()?;
        Ok(Self {
            detector: Arc::new(config.detector()?),
            resolver: Arc::new(DefaultResolver::from_config(config)?),
            content_root: config.content_root.clone(),
            artifact_name: config.artifact_name.clone(),
            site_title: config.site_title.clone().unwrap_or_else(|| "Site index".to_string()),
        })
    }
}
