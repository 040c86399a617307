use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comics_source::SourceConfig;
use serde::{Deserialize, Serialize};

const CONFIG_DIR: &str = "comics";
const CONFIG_FILE: &str = "config.toml";

/// On-disk configuration.
///
/// ```toml
/// cookie = "%7B%22accessToken%22..."
///
/// [source]
/// locale = "id"
/// timeout_secs = 20
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    /// `access_token` cookie value to sign in with.
    pub cookie: Option<String>,
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load `path`, or the default location. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}
