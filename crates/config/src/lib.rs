//! Configuration loading and validation for EasyChat.
//!
//! Loads configuration from `~/.easychat/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.easychat/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend root, e.g. `http://127.0.0.1:5000`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Use `/api/chat/stream` instead of `/api/chat`
    #[serde(default = "default_true")]
    pub streaming: bool,

    /// Put the user's text back into the input box when a turn fails
    #[serde(default = "default_true")]
    pub restore_prompt_on_failure: bool,

    /// Maximum number of documents kept in memory (must be > 1)
    #[serde(default = "default_cache_capacity")]
    pub document_cache_capacity: usize,

    /// Timeout for non-streamed requests and document downloads
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Delay before the final cosmetic re-render of an answer
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Where downloaded documents are written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".into()
}
fn default_true() -> bool {
    true
}
fn default_cache_capacity() -> usize {
    10
}
fn default_request_timeout() -> u64 {
    120
}
fn default_settle_delay() -> u64 {
    250
}

impl ClientConfig {
    /// Load configuration from the default path (~/.easychat/config.toml).
    ///
    /// Environment variables take precedence over the file:
    /// - `EASYCHAT_BASE_URL`
    /// - `EASYCHAT_STREAMING` (`true`/`false`/`1`/`0`)
    /// - `EASYCHAT_RESTORE_ON_FAILURE`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup("EASYCHAT_BASE_URL") {
            self.base_url = url;
        }
        if let Some(flag) = lookup("EASYCHAT_STREAMING") {
            self.streaming = parse_flag("EASYCHAT_STREAMING", &flag)?;
        }
        if let Some(flag) = lookup("EASYCHAT_RESTORE_ON_FAILURE") {
            self.restore_prompt_on_failure = parse_flag("EASYCHAT_RESTORE_ON_FAILURE", &flag)?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".easychat")
    }

    /// Directory documents are saved to, falling back to `~/.easychat/documents`.
    pub fn download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("documents"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scheme_ok = self.base_url.starts_with("http://") || self.base_url.starts_with("https://");
        if !scheme_ok {
            return Err(ConfigError::ValidationError(format!(
                "base_url must start with http:// or https:// (got '{}')",
                self.base_url
            )));
        }

        if self.document_cache_capacity <= 1 {
            return Err(ConfigError::ValidationError(
                "document_cache_capacity must be greater than 1".into(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            streaming: true,
            restore_prompt_on_failure: true,
            document_cache_capacity: default_cache_capacity(),
            request_timeout_secs: default_request_timeout(),
            settle_delay_ms: default_settle_delay(),
            download_dir: None,
        }
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::ValidationError(format!(
            "{name} must be a boolean (got '{other}')"
        ))),
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = ClientConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.streaming);
        assert!(config.restore_prompt_on_failure);
        assert_eq!(config.document_cache_capacity, 10);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = ClientConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ClientConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.base_url, config.base_url);
        assert_eq!(parsed.settle_delay_ms, config.settle_delay_ms);
    }

    #[test]
    fn tiny_cache_rejected() {
        let config = ClientConfig {
            document_cache_capacity: 1,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_http_base_url_rejected() {
        let config = ClientConfig {
            base_url: "ftp://example.com".into(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = ClientConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:5000");
    }

    #[test]
    fn load_from_file_with_partial_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "streaming = false\ndocument_cache_capacity = 4\n").unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert!(!config.streaming);
        assert_eq!(config.document_cache_capacity, 4);
        assert!(config.restore_prompt_on_failure);
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "streaming = \"maybe\"").unwrap();
        assert!(matches!(
            ClientConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("EASYCHAT_BASE_URL", "https://chat.example.com"),
            ("EASYCHAT_STREAMING", "0"),
            ("EASYCHAT_RESTORE_ON_FAILURE", "false"),
        ]);
        let mut config = ClientConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.base_url, "https://chat.example.com");
        assert!(!config.streaming);
        assert!(!config.restore_prompt_on_failure);
    }

    #[test]
    fn bad_env_flag_rejected() {
        let mut config = ClientConfig::default();
        let res = config.apply_env(|k| (k == "EASYCHAT_STREAMING").then(|| "sometimes".to_string()));
        assert!(res.is_err());
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = ClientConfig::default_toml();
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("document_cache_capacity = 10"));
    }
}
