//! Client configuration.
//!
//! Layered lowest to highest: built-in defaults, `~/.memecap/config.toml`
//! (or `--config`), `MEMECAP_*` environment variables, then CLI flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 1500;

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_redirect_delay_ms() -> u64 {
    DEFAULT_REDIRECT_DELAY_MS
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the captioning API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Where the session is persisted. Defaults to `~/.memecap/session.json`.
    #[serde(default)]
    pub session_file: Option<PathBuf>,

    /// Pause after a successful login before moving to the dashboard.
    #[serde(default = "default_redirect_delay_ms")]
    pub redirect_delay_ms: u64,

    /// Per-request timeout. Unset means requests may wait indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// tracing filter directive, e.g. "info" or "memecap=debug".
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            session_file: None,
            redirect_delay_ms: default_redirect_delay_ms(),
            request_timeout_secs: None,
            log_level: None,
        }
    }
}

/// `~/.memecap/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".memecap")
        .join("config.toml")
}

impl Config {
    /// Load the default config file, falling back to defaults if absent.
    pub fn load() -> Result<Self> {
        let path = default_config_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Apply `MEMECAP_*` environment overrides. Values that fail to
    /// parse are skipped and described in the returned warnings, so the
    /// caller can log them once tracing is up.
    pub fn apply_env(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let Ok(url) = std::env::var("MEMECAP_BASE_URL") {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
        if let Ok(path) = std::env::var("MEMECAP_SESSION_FILE") {
            if !path.trim().is_empty() {
                self.session_file = Some(PathBuf::from(path));
            }
        }
        if let Ok(delay) = std::env::var("MEMECAP_REDIRECT_DELAY_MS") {
            match delay.parse() {
                Ok(ms) => self.redirect_delay_ms = ms,
                Err(_) => warnings.push(format!(
                    "ignoring invalid MEMECAP_REDIRECT_DELAY_MS '{}'",
                    delay
                )),
            }
        }
        if let Ok(timeout) = std::env::var("MEMECAP_TIMEOUT_SECS") {
            match timeout.parse() {
                Ok(secs) => self.request_timeout_secs = Some(secs),
                Err(_) => warnings.push(format!(
                    "ignoring invalid MEMECAP_TIMEOUT_SECS '{}'",
                    timeout
                )),
            }
        }
        warnings
    }

    /// Check the configuration, returning every problem found.
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let url = self.base_url.trim();
        match url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"))
        {
            None => errors.push(format!(
                "base_url: '{}' must start with http:// or https://",
                self.base_url
            )),
            Some(rest) if rest.split('/').next().unwrap_or("").is_empty() => {
                errors.push(format!("base_url: '{}' has no host", self.base_url));
            }
            Some(_) => {}
        }

        if self.request_timeout_secs == Some(0) {
            errors.push("request_timeout_secs: must be greater than 0".to_string());
        }

        if let Some(path) = &self.session_file {
            if path.as_os_str().is_empty() {
                errors.push("session_file: must not be empty".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn session_path(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(crate::session::default_session_path)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.redirect_delay(), Duration::from_millis(1500));
        assert!(cfg.request_timeout().is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let cfg: Config = toml::from_str(
            r#"
            base_url = "https://memes.example.com/"
            request_timeout_secs = 30
            "#,
        )
        .unwrap();
        assert_eq!(cfg.base_url, "https://memes.example.com/");
        assert_eq!(cfg.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(cfg.redirect_delay_ms, DEFAULT_REDIRECT_DELAY_MS);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "session_file = \"/tmp/memecap-session.json\"\n").unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.session_path(), PathBuf::from("/tmp/memecap-session.json"));
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("parsing config"));
    }

    #[test]
    fn test_validate_collects_errors() {
        let cfg = Config {
            base_url: "ftp://example.com".to_string(),
            request_timeout_secs: Some(0),
            ..Config::default()
        };
        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("base_url"));
    }

    #[test]
    fn test_validate_rejects_missing_host() {
        let cfg = Config {
            base_url: "http://".to_string(),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        let original = env::var("MEMECAP_BASE_URL").ok();
        env::set_var("MEMECAP_BASE_URL", "https://env.example.com");
        env::set_var("MEMECAP_REDIRECT_DELAY_MS", "0");

        let mut cfg = Config::default();
        let warnings = cfg.apply_env();

        if let Some(url) = original {
            env::set_var("MEMECAP_BASE_URL", url);
        } else {
            env::remove_var("MEMECAP_BASE_URL");
        }
        env::remove_var("MEMECAP_REDIRECT_DELAY_MS");

        assert_eq!(cfg.base_url, "https://env.example.com");
        assert_eq!(cfg.redirect_delay_ms, 0);
        assert!(warnings.is_empty());
    }

    #[test]
    #[serial]
    fn test_invalid_env_value_ignored() {
        env::set_var("MEMECAP_TIMEOUT_SECS", "soon");

        let mut cfg = Config::default();
        let warnings = cfg.apply_env();

        env::remove_var("MEMECAP_TIMEOUT_SECS");
        assert!(cfg.request_timeout_secs.is_none());
        assert_eq!(warnings, vec!["ignoring invalid MEMECAP_TIMEOUT_SECS 'soon'"]);
    }
}
