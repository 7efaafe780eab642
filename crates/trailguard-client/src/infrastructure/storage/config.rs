//! TOML-based configuration for the client.
//!
//! Reads and writes [`AppConfig`] at the platform-appropriate location:
//! - Windows:  `%APPDATA%\TrailGuard\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/trailguard/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/TrailGuard/config.toml`
//!
//! Every field has a `#[serde(default = ...)]`, so a missing file, a missing
//! section, or a missing key all fall back to the defaults below:
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000"
//! timeout_secs = 30
//! user_agent = "trailguard-client/0.1"
//!
//! [cache]
//! stale_time_ms = 0
//! gc_time_secs = 300
//! retry_attempts = 3
//! retry_base_delay_ms = 1000
//!
//! [polling]
//! batch_status_interval_ms = 2000
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::cache::CacheConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed but is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the back end lives and how to talk to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    /// Scheme, host and port of the back end, without a trailing path.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Whole-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Resource cache tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheSettings {
    #[serde(default)]
    pub stale_time_ms: u64,
    #[serde(default = "default_gc_time_secs")]
    pub gc_time_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollingConfig {
    /// Interval between batch status polls.
    #[serde(default = "default_batch_status_interval_ms")]
    pub batch_status_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `tracing` level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("trailguard-client/{}", env!("CARGO_PKG_VERSION"))
}
fn default_gc_time_secs() -> u64 {
    300
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    1000
}
fn default_batch_status_interval_ms() -> u64 {
    2000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            stale_time_ms: 0,
            gc_time_secs: default_gc_time_secs(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            batch_status_interval_ms: default_batch_status_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CacheSettings {
    /// Converts the file representation into the cache's own settings.
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            stale_time: Duration::from_millis(self.stale_time_ms),
            gc_time: Duration::from_secs(self.gc_time_secs),
            retry_attempts: self.retry_attempts,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}

impl PollingConfig {
    pub fn batch_status_interval(&self) -> Duration {
        Duration::from_millis(self.batch_status_interval_ms)
    }

    /// Rejects a zero status interval.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `batch_status_interval_ms` is 0.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_status_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "polling.batch_status_interval_ms",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default path of the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed, and
/// [`ConfigError::Invalid`] for out-of-range values.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let config: AppConfig = toml::from_str(&content)?;
            config.polling.validate()?;
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Loads `AppConfig` from the platform location.
///
/// # Errors
///
/// See [`config_file_path`] and [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory including the `TrailGuard` part.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("TrailGuard"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("TrailGuard")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("trailguard"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.api.base_url, "http://localhost:8000");
        assert_eq!(cfg.api.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.polling.batch_status_interval(), Duration::from_millis(2000));
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.cache.to_cache_config(), CacheConfig::default());
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("parse");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        // Arrange
        let text = r#"
            [api]
            base_url = "https://trailguard.example.org"

            [polling]
            batch_status_interval_ms = 500
        "#;

        // Act
        let cfg: AppConfig = toml::from_str(text).expect("parse");

        // Assert
        assert_eq!(cfg.api.base_url, "https://trailguard.example.org");
        assert_eq!(cfg.api.timeout_secs, 30);
        assert_eq!(cfg.polling.batch_status_interval(), Duration::from_millis(500));
        assert_eq!(cfg.cache.retry_attempts, 3);
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let path = std::env::temp_dir().join(format!("trailguard-bad-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[api\nbase_url = ").expect("write");

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_zero_poll_interval_is_rejected_on_load() {
        // Arrange
        let path = std::env::temp_dir().join(format!("trailguard-zero-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[polling]\nbatch_status_interval_ms = 0\n").expect("write");

        // Act
        let result = load_config_from(&path);

        // Assert
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field: "polling.batch_status_interval_ms", .. })
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join(format!("trailguard-missing-{}.toml", uuid::Uuid::new_v4()));
        assert_eq!(load_config_from(&path).expect("load"), AppConfig::default());
    }

    #[test]
    fn test_save_then_load_restores_config() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("trailguard-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("config.toml");
        let mut cfg = AppConfig::default();
        cfg.api.base_url = "http://10.0.0.5:8000".to_string();
        cfg.cache.stale_time_ms = 5_000;

        // Act
        save_config_to(&cfg, &path).expect("save");
        let restored = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(restored, cfg);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
