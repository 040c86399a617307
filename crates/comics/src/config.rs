use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::locale::Locale;

pub const DEFAULT_BASE_URL: &str = "https://www.bilibilicomics.com";

pub(crate) const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Source configuration. Every field has a default so partial TOML files
/// deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub locale: Locale,
    pub base_url: String,
    pub user_agent: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Requests per second allowed against the main site. `0` disables the limit.
    pub rate_limit_per_sec: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_UA.to_string(),
            timeout_secs: 30,
            rate_limit_per_sec: 1,
        }
    }
}

impl SourceConfig {
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn rate_limit_interval(&self) -> Option<Duration> {
        (self.rate_limit_per_sec > 0)
            .then(|| Duration::from_secs(1) / self.rate_limit_per_sec)
    }
}
