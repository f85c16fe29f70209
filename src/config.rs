//! Configuration management
//!
//! This module handles loading configuration from TOML files. Everything has
//! a compiled-in default; a config file only overrides timeouts, logging and
//! (for staging or tests) the portal base URL. Credentials are never read
//! from the file, only from the environment variables it names.

use crate::models::Credentials;
use crate::portal::kastle::{KastleConfig, BASE_URL};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Destination portal settings
    #[serde(default)]
    pub portal: PortalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PortalConfig {
    /// Human-readable name used in logs
    #[serde(default = "default_portal_name")]
    pub name: String,

    /// Root of the portal application
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the portal username
    #[serde(default = "default_username_env")]
    pub username_env: String,

    /// Environment variable holding the portal password
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            name: default_portal_name(),
            base_url: default_base_url(),
            username_env: default_username_env(),
            password_env: default_password_env(),
        }
    }
}

// Default value functions
fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_portal_name() -> String {
    "MyKastle".to_string()
}

fn default_base_url() -> String {
    BASE_URL.to_string()
}

fn default_username_env() -> String {
    "KASTLE_USERNAME".to_string()
}

fn default_password_env() -> String {
    "KASTLE_PASSWORD".to_string()
}

impl Config {
    /// Load configuration from `explicit`, or the first file found in the
    /// standard locations, or use defaults if none exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }

        let config_paths = vec![
            PathBuf::from("config.toml"),
            PathBuf::from("/etc/kastle-visit/config.toml"),
            dirs::home_dir()
                .map(|h| h.join(".config/kastle-visit/config.toml"))
                .unwrap_or_default(),
        ];

        // Try to find config file
        for path in &config_paths {
            if path.is_file() {
                return Self::from_path(path);
            }
        }

        // No config file found, use defaults
        tracing::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        tracing::debug!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Portal client settings. Zero timeouts are rejected: every request
    /// would fail before it was sent.
    pub fn kastle(&self) -> Result<KastleConfig> {
        Ok(KastleConfig {
            name: self.portal.name.clone(),
            base_url: self.portal.base_url.clone(),
            timeout: seconds("http.timeout", self.http.timeout)?,
            connect_timeout: seconds("http.connect_timeout", self.http.connect_timeout)?,
        })
    }

    /// Read the portal login from the configured environment variables
    pub fn credentials(&self) -> Result<Credentials> {
        self.credentials_with(|key| std::env::var(key).ok())
    }

    fn credentials_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<Credentials> {
        let read = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .with_context(|| format!("{} is not set", key))
        };
        Ok(Credentials::new(
            read(&self.portal.username_env)?,
            read(&self.portal.password_env)?,
        ))
    }
}

fn seconds(key: &str, value: u64) -> Result<Duration> {
    if value == 0 {
        anyhow::bail!("{} must be at least 1 second", key);
    }
    Ok(Duration::from_secs(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.http.timeout, 30);
        assert_eq!(cfg.http.connect_timeout, 10);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.portal.base_url, BASE_URL);

        let kastle = cfg.kastle().unwrap();
        assert_eq!(kastle.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let cfg: Config = toml::from_str("[http]\ntimeout = 0").unwrap();
        let err = cfg.kastle().unwrap_err();
        assert!(err.to_string().contains("http.timeout"));

        let cfg: Config = toml::from_str("[http]\nconnect_timeout = 0").unwrap();
        let err = cfg.kastle().unwrap_err();
        assert!(err.to_string().contains("http.connect_timeout"));

        let cfg: Config = toml::from_str("[http]\ntimeout = 1\nconnect_timeout = 1").unwrap();
        assert_eq!(cfg.kastle().unwrap().connect_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_partial_override_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [http]
            timeout = 5

            [portal]
            base_url = "http://127.0.0.1:9000/mykastleweb"
            "#
        )
        .unwrap();

        let cfg = Config::load(Some(file.path())).unwrap();
        assert_eq!(cfg.http.timeout, 5);
        assert_eq!(cfg.http.connect_timeout, 10);
        assert_eq!(cfg.portal.base_url, "http://127.0.0.1:9000/mykastleweb");
        assert_eq!(cfg.portal.username_env, "KASTLE_USERNAME");
    }

    #[test]
    fn test_bad_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http]\ntimeout = \"soon\"").unwrap();
        assert!(Config::from_path(file.path()).is_err());
    }

    #[test]
    fn test_credentials_lookup() {
        let cfg = Config::default();
        let creds = cfg
            .credentials_with(|key| match key {
                "KASTLE_USERNAME" => Some("frontdesk".to_string()),
                "KASTLE_PASSWORD" => Some("s3cret".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(creds.username, "frontdesk");
        assert_eq!(creds.password, "s3cret");

        let err = cfg
            .credentials_with(|key| (key == "KASTLE_USERNAME").then(|| "frontdesk".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("KASTLE_PASSWORD"));
    }
}
