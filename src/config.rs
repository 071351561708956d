//! Configuration Management
//!
//! Handles persistent connection settings for the `daktela` CLI.

use crate::api::http::{ClientConfig, DEFAULT_TIMEOUT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Instance URL (e.g. `my.daktela.com`)
    #[serde(default)]
    pub instance: Option<String>,
    /// Access token of the connecting user
    #[serde(default)]
    pub access_token: Option<String>,
    /// Request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<f64>,
    /// Whether TLS certificates are verified
    #[serde(default)]
    pub verify_tls: Option<bool>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("daktela").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load configuration from a file; a missing or unreadable file yields defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Get effective instance (CLI > config)
    pub fn effective_instance(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.instance.clone())
    }

    /// Get effective access token (CLI > config)
    pub fn effective_access_token(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string).or_else(|| self.access_token.clone())
    }

    /// Record connection settings given on the command line.
    /// Unset options keep their stored values.
    pub fn remember(
        &mut self,
        instance: &str,
        access_token: &str,
        timeout_secs: Option<f64>,
        insecure: bool,
    ) {
        self.instance = Some(instance.to_string());
        self.access_token = Some(access_token.to_string());
        if timeout_secs.is_some() {
            self.timeout_secs = timeout_secs;
        }
        if insecure {
            self.verify_tls = Some(false);
        }
    }

    /// Connection settings; CLI values take precedence over stored ones
    pub fn client_config(&self, timeout_secs: Option<f64>, insecure: bool) -> ClientConfig {
        let timeout = timeout_secs
            .or(self.timeout_secs)
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
            .unwrap_or(DEFAULT_TIMEOUT);
        let verify_tls = !insecure && self.verify_tls.unwrap_or(true);

        ClientConfig {
            timeout,
            verify_tls,
            ..ClientConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("daktela-config-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = temp_path("config.json");
        let config = Config {
            instance: Some("my.daktela.com".to_string()),
            access_token: Some("token".to_string()),
            timeout_secs: Some(5.0),
            verify_tls: Some(false),
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        assert_eq!(Config::load_from(&temp_path("absent.json")), Config::default());
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = Config {
            instance: Some("stored.daktela.com".to_string()),
            timeout_secs: Some(10.0),
            ..Config::default()
        };

        assert_eq!(
            config.effective_instance(Some("cli.daktela.com")).as_deref(),
            Some("cli.daktela.com")
        );
        assert_eq!(config.effective_instance(None).as_deref(), Some("stored.daktela.com"));
        assert_eq!(config.effective_access_token(None), None);

        let client = config.client_config(Some(3.0), false);
        assert_eq!(client.timeout, Duration::from_secs(3));
        assert!(client.verify_tls);
        assert_eq!(config.client_config(None, true).timeout, Duration::from_secs(10));
        assert!(!config.client_config(None, true).verify_tls);
    }

    #[test]
    fn test_remember_persists_insecure() {
        let path = temp_path("remember.json");
        let mut config = Config {
            timeout_secs: Some(10.0),
            ..Config::default()
        };

        config.remember("my.daktela.com", "token", None, true);
        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path);

        assert_eq!(loaded.instance.as_deref(), Some("my.daktela.com"));
        assert_eq!(loaded.access_token.as_deref(), Some("token"));
        assert_eq!(loaded.timeout_secs, Some(10.0));
        assert_eq!(loaded.verify_tls, Some(false));
        assert!(!loaded.client_config(None, false).verify_tls);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_invalid_timeout_falls_back_to_default() {
        let config = Config::default();
        assert_eq!(config.client_config(Some(-1.0), false).timeout, DEFAULT_TIMEOUT);
    }
}
