//! Configuration management for logbroker

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::archive::ArchiveConfig;
use crate::session::SessionConfig;

/// Broker configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Session settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Archive settings
    #[serde(default)]
    pub archive: ArchiveConfig,
}

impl BrokerConfig {
    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        let path = config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as TOML.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        if is_json(path) {
            serde_json::from_str(&content).context("Failed to parse config file")
        } else {
            toml::from_str(&content).context("Failed to parse config file")
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = if is_json(path) {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        } else {
            toml::to_string_pretty(self).context("Failed to serialize config")?
        };
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Get the base configuration directory (~/.logbroker)
/// Falls back to ./.logbroker if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".logbroker")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".logbroker"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Get the path to the default logs directory
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

/// Ensure all required directories exist
pub fn ensure_directories() -> Result<()> {
    std::fs::create_dir_all(config_dir()).context("Failed to create config directory")?;
    std::fs::create_dir_all(logs_dir()).context("Failed to create logs directory")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::CompressionStyle;
    use crate::level::LogLevel;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();
        assert_eq!(config.session.name, "LogBroker");
        assert_eq!(config.archive.set_size, 15);
        assert_eq!(config.archive.cleanup_count, 50);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = BrokerConfig::default();
        config.session.min_level = LogLevel::Debug;
        config.archive.compression_style = CompressionStyle::Gzip;
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: BrokerConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: BrokerConfig = toml::from_str(
            r#"
            [session]
            name = "Ingest"
            max_level = "error"

            [archive]
            trigger_count = 5
            "#,
        )
        .unwrap();
        assert_eq!(parsed.session.name, "Ingest");
        assert_eq!(parsed.session.min_level, LogLevel::Info);
        assert_eq!(parsed.session.max_level, LogLevel::Error);
        assert_eq!(parsed.archive.trigger_count, 5);
        assert_eq!(parsed.archive.set_size, 15);
    }

    #[test]
    fn test_load_from_json_and_toml() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = BrokerConfig::default();
        config.session.name = "Saved".to_string();

        let json = temp_dir.path().join("broker.json");
        config.save_to(&json).unwrap();
        assert!(std::fs::read_to_string(&json).unwrap().trim_start().starts_with('{'));
        assert_eq!(BrokerConfig::load_from(&json).unwrap(), config);

        let toml_path = temp_dir.path().join("broker.toml");
        config.save_to(&toml_path).unwrap();
        assert_eq!(BrokerConfig::load_from(&toml_path).unwrap(), config);
    }

    #[test]
    fn test_load_from_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(BrokerConfig::load_from(&temp_dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_config_dir_does_not_panic() {
        let dir = config_dir();
        assert!(dir.ends_with(".logbroker"));
    }

    #[test]
    fn test_try_config_dir() {
        if let Some(path) = try_config_dir() {
            assert!(path.ends_with(".logbroker"));
        }
    }
}
