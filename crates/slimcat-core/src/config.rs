use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_LOG_FILTER, DEFAULT_SITE_DOMAIN};

/// Core configuration that can be loaded from a JSON file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreConfig {
    /// Base URL that comment deep links are built on
    pub site_domain: String,

    /// tracing filter directive used when RUST_LOG is unset
    pub log_filter: String,

    /// Append logs to this file in addition to stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Let the default shell open links in the system browser
    pub open_links: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            site_domain: DEFAULT_SITE_DOMAIN.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_file: None,
            open_links: true,
        }
    }
}

impl CoreConfig {
    /// Load config from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load from `path` if given, else from the default location if it
    /// exists, else fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// `<config dir>/slimcat/bridge.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("slimcat").join("bridge.json"))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize config")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize config")
    }
}
