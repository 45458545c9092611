//! Loader configuration.
//!
//! Configuration can be built in code, read from the environment, or loaded
//! from a JSON file:
//!
//! ```json
//! { "base_url": "/static", "debug": false, "load_timeout_ms": 30000 }
//! ```
//!
//! Environment variables:
//!
//! - `MODLOAD_BASE_URL` - location prefix for identifiers (default: none)
//! - `MODLOAD_DEBUG` - log every module state transition at `debug` level
//! - `MODLOAD_LOAD_TIMEOUT_MS` - fail pending modules if a fetch takes longer

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::env_utils::{env_bool, env_string, env_var};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Prefix joined in front of every identifier that is not already an
    /// absolute location. A trailing `/` is stripped once when applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Raise per-transition logging from `trace` to `debug`.
    pub debug: bool,
    /// Upper bound on a single fetch. `None` waits forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_timeout_ms: Option<u64>,
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from `MODLOAD_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: env_string("MODLOAD_BASE_URL"),
            debug: env_bool("MODLOAD_DEBUG"),
            load_timeout_ms: env_var("MODLOAD_LOAD_TIMEOUT_MS"),
        }
    }

    /// Load configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read loader config {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("failed to parse loader config {}", path.display()))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }

    /// Overlay every field that `other` sets on top of `self`.
    pub fn merge(mut self, other: LoaderConfig) -> Self {
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        self.debug |= other.debug;
        if other.load_timeout_ms.is_some() {
            self.load_timeout_ms = other.load_timeout_ms;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_json_file_partial() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("modload.json");
        std::fs::write(&path, r#"{ "base_url": "/static/", "load_timeout_ms": 250 }"#)?;

        let config = LoaderConfig::from_json_file(&path)?;
        assert_eq!(config.base_url.as_deref(), Some("/static/"));
        assert!(!config.debug);
        assert_eq!(config.load_timeout(), Some(Duration::from_millis(250)));
        Ok(())
    }

    #[test]
    fn test_from_json_file_rejects_garbage() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ base_url")?;

        let err = LoaderConfig::from_json_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse loader config"));
        Ok(())
    }

    #[test]
    fn test_merge_prefers_set_fields() {
        let base = LoaderConfig::new()
            .with_base_url("/a")
            .with_load_timeout(Duration::from_secs(1));
        let overlay = LoaderConfig::new().with_base_url("/b").with_debug(true);

        let merged = base.merge(overlay);
        assert_eq!(merged.base_url.as_deref(), Some("/b"));
        assert!(merged.debug);
        assert_eq!(merged.load_timeout_ms, Some(1000));
    }
}
