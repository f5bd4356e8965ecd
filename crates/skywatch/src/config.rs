//! Configuration management for skywatch.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "skywatch";

/// Default cache database file name.
const STORE_FILE_NAME: &str = "cache.db";

/// Default OpenSky REST endpoint.
const DEFAULT_BASE_URL: &str = "https://opensky-network.org/api";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SKYWATCH_`, `__` between sections)
/// 2. TOML config file at `~/.config/skywatch/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache store configuration.
    pub cache: CacheConfig,
    /// Viewport tracking configuration.
    pub tracker: TrackerConfig,
    /// Periodic refresh configuration.
    pub refresh: RefreshConfig,
    /// Data source configuration.
    pub source: SourceConfig,
}

/// Cache-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Path to the cache database file.
    /// Defaults to `~/.local/share/skywatch/cache.db`
    pub store_path: Option<PathBuf>,
    /// Maximum age of a cached record in seconds.
    pub ttl_secs: u64,
}

/// Region tracker configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Quiet period after the last viewport event before a region settles.
    pub debounce_ms: u64,
}

/// Background refresh configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Interval between silent refreshes in seconds.
    pub interval_secs: u64,
}

/// Data source configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the OpenSky REST API.
    pub base_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store_path: None, // Will be resolved to default at runtime
            ttl_secs: 300,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { debounce_ms: 500 }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 15,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("SKYWATCH_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let zero_checks = [
            ("cache.ttl_secs", self.cache.ttl_secs),
            ("tracker.debounce_ms", self.tracker.debounce_ms),
            ("refresh.interval_secs", self.refresh.interval_secs),
            ("source.timeout_secs", self.source.timeout_secs),
        ];
        for (name, value) in zero_checks {
            if value == 0 {
                return Err(Error::ConfigValidation {
                    message: format!("{name} must be greater than 0"),
                });
            }
        }

        let url = self.source.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::ConfigValidation {
                message: format!("source.base_url must be an http(s) URL: {url}"),
            });
        }

        Ok(())
    }

    /// Get the cache store path, resolving defaults if not set.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.cache
            .store_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(STORE_FILE_NAME))
    }

    /// Get the cache TTL as a Duration.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// Get the debounce window as a Duration.
    #[must_use]
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.tracker.debounce_ms)
    }

    /// Get the silent refresh interval as a Duration.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh.interval_secs)
    }

    /// Get the data source request timeout as a Duration.
    #[must_use]
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.tracker.debounce_ms, 500);
        assert_eq!(config.refresh.interval_secs, 30);
        assert_eq!(config.source.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_default_cache_config() {
        let cache = CacheConfig::default();

        assert!(cache.store_path.is_none());
        assert_eq!(cache.ttl_secs, 300);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_ttl() {
        let mut config = Config::default();
        config.cache.ttl_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("cache.ttl_secs"));
    }

    #[test]
    fn test_validate_zero_debounce() {
        let mut config = Config::default();
        config.tracker.debounce_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("tracker.debounce_ms"));
    }

    #[test]
    fn test_validate_zero_refresh_interval() {
        let mut config = Config::default();
        config.refresh.interval_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("refresh.interval_secs"));
    }

    #[test]
    fn test_validate_bad_base_url() {
        let mut config = Config::default();
        config.source.base_url = "ftp://example.com".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("base_url"));
    }

    #[test]
    fn test_store_path_default() {
        let config = Config::default();
        let path = config.store_path();

        assert!(path.to_string_lossy().contains("cache.db"));
    }

    #[test]
    fn test_store_path_custom() {
        let mut config = Config::default();
        config.cache.store_path = Some(PathBuf::from("/custom/path/cache.sqlite"));

        assert_eq!(
            config.store_path(),
            PathBuf::from("/custom/path/cache.sqlite")
        );
    }

    #[test]
    fn test_durations() {
        let config = Config::default();

        assert_eq!(config.ttl(), Duration::from_secs(300));
        assert_eq!(config.debounce_window(), Duration::from_millis(500));
        assert_eq!(config.refresh_interval(), Duration::from_secs(30));
        assert_eq!(config.source_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("skywatch"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // Loading from a nonexistent path should work (uses defaults)
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[cache]\nttl_secs = 60\n\n[refresh]\ninterval_secs = 10\n",
        )
        .unwrap();

        let config = Config::load_from(Some(path)).unwrap();
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.refresh.interval_secs, 10);
        assert_eq!(config.tracker.debounce_ms, 500);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[tracker]\ndebounce_ms = 0\n").unwrap();

        let result = Config::load_from(Some(path));
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_source_config_deserialize() {
        let json = r#"{"timeout_secs": 5}"#;
        let source: SourceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(source.timeout_secs, 5);
        assert_eq!(source.base_url, DEFAULT_BASE_URL);
    }
}
