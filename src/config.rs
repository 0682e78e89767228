//! Feed endpoint and transport settings.

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "http://webservices.nextbus.com/service/publicXMLFeed";

/// Where to reach the feed and how long to wait for it.
///
/// Stored as a JSON object on disk; every field is optional:
/// ```json
/// {
///   "base_url": "http://webservices.nextbus.com/service/publicXMLFeed",
///   "timeout_secs": 30,
///   "connect_timeout_secs": 10
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl FeedConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config '{path}'"))?;
        Self::from_json(&content).with_context(|| format!("parsing config '{path}'"))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Builds the config from `NEXTBUS_*` environment variables, falling back
    /// to defaults for any that are unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("NEXTBUS_BASE_URL") {
            config.base_url = url;
        }
        if let Some(secs) = lookup("NEXTBUS_TIMEOUT_SECS") {
            config.timeout_secs = secs
                .parse()
                .with_context(|| format!("NEXTBUS_TIMEOUT_SECS is not a number: {secs:?}"))?;
        }
        if let Some(secs) = lookup("NEXTBUS_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout_secs = secs.parse().with_context(|| {
                format!("NEXTBUS_CONNECT_TIMEOUT_SECS is not a number: {secs:?}")
            })?;
        }

        Ok(config)
    }
}
