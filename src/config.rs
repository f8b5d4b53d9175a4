//! Configuration loading.
//!
//! Looked up in order: an explicit path, `./querylike.toml`, then
//! `<config dir>/querylike/config.toml`. Missing files fall back to defaults.
//!
//! ```toml
//! [matcher]
//! timeout_ms = 1000
//! size_limit = 10485760
//!
//! [engine]
//! on_timeout = "skip_row"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LikeError, LikeResult};
use crate::pattern::{DEFAULT_SIZE_LIMIT, MatchOptions, REGEX_TIMEOUT};

const LOCAL_CONFIG: &str = "querylike.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub matcher: MatcherConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatcherConfig {
    /// Match budget in milliseconds.
    pub timeout_ms: u64,
    /// Compiled regex size cap in bytes.
    pub size_limit: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            timeout_ms: REGEX_TIMEOUT.as_millis() as u64,
            size_limit: DEFAULT_SIZE_LIMIT,
        }
    }
}

impl From<&MatcherConfig> for MatchOptions {
    fn from(config: &MatcherConfig) -> Self {
        MatchOptions {
            timeout: Duration::from_millis(config.timeout_ms),
            size_limit: config.size_limit,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub on_timeout: OnTimeout,
}

/// What row filtering does when one row's match times out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnTimeout {
    /// Fail the whole filter.
    #[default]
    Abort,
    /// Treat the row as non-matching and keep going.
    SkipRow,
}

impl Config {
    /// Load configuration, falling back to defaults when no file exists.
    pub fn load(explicit: Option<&Path>) -> LikeResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::default_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> LikeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading config");
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> LikeResult<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| LikeError::Config(e.to_string()))?;
        if config.matcher.timeout_ms == 0 {
            return Err(LikeError::Config(
                "matcher.timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions::from(&self.matcher)
    }

    fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("querylike").join("config.toml"));
        }
        paths
    }
}
