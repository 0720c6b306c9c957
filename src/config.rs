//! Configuration loading.
//!
//! Precedence, low to highest: built-in defaults, `config.yaml` in the
//! platform config directory, then `GO_GENERATE_FAST_*` environment
//! variables.

use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::Context;
use color_eyre::eyre::ContextCompat;
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::{debug, instrument, trace};

use crate::fs;

const ENV_PREFIX: &str = "GO_GENERATE_FAST_";

/// Resolved runtime configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Directory holding `config.yaml` and, by default, the cache.
    pub config_dir: PathBuf,
    /// Root of the content-addressed cache store.
    pub cache_dir: PathBuf,
    /// Skip the cache entirely; every directive regenerates.
    pub disable: bool,
    /// Never write to the cache, only read from it.
    pub read_only: bool,
    /// Regenerate even on a cache hit, but still save the result.
    pub recache: bool,
    /// Fail any directive that would need to regenerate instead of using
    /// a stale cache entry.
    pub force_use_cache: bool,
    /// Verbose logging.
    pub debug: bool,
}

/// The subset of [`Config`] that can come from `config.yaml`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
struct FileConfig {
    dir: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    disable: Option<bool>,
    read_only: Option<bool>,
    recache: Option<bool>,
    force_use_cache: Option<bool>,
    debug: Option<bool>,
}

impl Config {
    /// Load configuration following the documented precedence order.
    #[instrument]
    pub fn load() -> Result<Self> {
        let default_config_dir = default_config_dir().context("determine default config dir")?;

        let file = read_file_config(&default_config_dir)?;

        let config_dir = env_path("DIR")
            .or(file.dir.clone())
            .unwrap_or_else(|| default_config_dir.clone());
        fs::create_dir_all(&config_dir)?;

        let cache_dir = env_path("CACHE_DIR")
            .or(file.cache_dir.clone())
            .unwrap_or_else(|| config_dir.join("cache"));
        fs::create_dir_all(&cache_dir)?;

        let config = Self {
            config_dir,
            cache_dir,
            disable: env_bool("DISABLE").or(file.disable).unwrap_or(false),
            read_only: env_bool("READ_ONLY").or(file.read_only).unwrap_or(false),
            recache: env_bool("RECACHE").or(file.recache).unwrap_or(false),
            force_use_cache: env_bool("FORCE_USE_CACHE")
                .or(file.force_use_cache)
                .unwrap_or(false),
            debug: env_bool("DEBUG").or(file.debug).unwrap_or(false),
        };

        debug!(?config, "loaded configuration");
        Ok(config)
    }
}

fn default_config_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "go-generate-fast")
        .context("determine platform config directory")?;
    Ok(dirs.config_dir().to_path_buf())
}

fn read_file_config(config_dir: &Path) -> Result<FileConfig> {
    let path = config_dir.join("config.yaml");
    if !fs::exists(&path) {
        trace!(?path, "no config file present");
        return Ok(FileConfig::default());
    }

    let raw = fs::read_buffered_utf8(&path)?;
    serde_yaml::from_str(&raw).with_context(|| format!("parse config file: {path:?}"))
}

fn env_bool(key: &str) -> Option<bool> {
    let raw = std::env::var(format!("{ENV_PREFIX}{key}")).ok()?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(format!("{ENV_PREFIX}{key}")).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_config_defaults_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = read_file_config(dir.path()).unwrap();
        assert!(config.dir.is_none());
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn env_path_overrides_config_dir() {
        // SAFETY: test-only mutation of the process environment, restored
        // immediately; no other test in this module reads this var concurrently.
        unsafe { std::env::set_var("GO_GENERATE_FAST_DIR", "/fake/config-dir") };
        let dir = env_path("DIR");
        unsafe { std::env::remove_var("GO_GENERATE_FAST_DIR") };
        assert_eq!(dir, Some(PathBuf::from("/fake/config-dir")));
    }

    #[test]
    fn file_config_parses_yaml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "disable: true\nread_only: false\n",
        )
        .unwrap();
        let config = read_file_config(dir.path()).unwrap();
        assert_eq!(config.disable, Some(true));
        assert_eq!(config.read_only, Some(false));
    }
}
