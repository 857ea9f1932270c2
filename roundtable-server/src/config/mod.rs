//! Configuration module for roundtable-server.
//!
//! Handles loading configuration from the TOML file and CLI arguments,
//! validating it, and turning it into the settings of each component.

pub mod file;

use crate::config::file::FileConfig;
use roundtable_core::hub::HubConfig;
use roundtable_core::lifecycle::ControllerConfig;
use roundtable_core::monitor::MonitorConfig;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Loaded configuration, split per component.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub hub: HubConfig,
    pub monitor: MonitorConfig,
    pub controller: ControllerConfig,
    pub step_delay: Duration,
    pub history_dir: PathBuf,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Load and process the configuration.
    ///
    /// A missing file is not an error: every setting has a default.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let mut file_config = match std::fs::read_to_string(&self.config_path) {
            Ok(content) => toml::from_str::<FileConfig>(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    path = %self.config_path.display(),
                    "Config file not found, using defaults"
                );
                FileConfig::default()
            }
            Err(source) => {
                return Err(ConfigError::IoError {
                    path: self.config_path.clone(),
                    source,
                });
            }
        };

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;
        Ok(build_loaded_config(file_config))
    }

    /// Reload the configuration (used during SIGHUP).
    pub fn reload(&self) -> Result<LoadedConfig, ConfigError> {
        self.load()
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    let non_zero = [
        ("hub.channel_capacity", config.hub.channel_capacity as u64),
        ("hub.read_timeout_ms", config.hub.read_timeout_ms),
        ("monitor.period_ms", config.monitor.period_ms),
        ("monitor.idle_timeout_ms", config.monitor.idle_timeout_ms),
        ("monitor.evict_after_ms", config.monitor.evict_after_ms),
    ];
    for (name, value) in non_zero {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be greater than zero"
            )));
        }
    }

    if config.monitor.evict_after_ms < config.monitor.idle_timeout_ms {
        return Err(ConfigError::ValidationError(
            "monitor.evict_after_ms must not be shorter than monitor.idle_timeout_ms".into(),
        ));
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> LoadedConfig {
    LoadedConfig {
        listen: file_config.server.listen,
        hub: HubConfig {
            channel_capacity: file_config.hub.channel_capacity,
            read_timeout: Duration::from_millis(file_config.hub.read_timeout_ms),
        },
        monitor: MonitorConfig {
            period: Duration::from_millis(file_config.monitor.period_ms),
            idle_timeout: Duration::from_millis(file_config.monitor.idle_timeout_ms),
            evict_after: Duration::from_millis(file_config.monitor.evict_after_ms),
        },
        controller: ControllerConfig {
            stop_grace: Duration::from_millis(file_config.run.stop_grace_ms),
        },
        step_delay: Duration::from_millis(file_config.run.step_delay_ms),
        history_dir: file_config.history.dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("roundtable.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_applies_listen_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[server]\nlisten = \"127.0.0.1:3000\"\n");
        let override_addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();

        let loaded = ConfigLoader::new(&path, Some(override_addr)).load().unwrap();
        assert_eq!(loaded.listen, override_addr);
        assert_eq!(loaded.monitor, MonitorConfig::default());
        assert_eq!(loaded.controller.stop_grace, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ConfigLoader::new(dir.path().join("absent.toml"), None)
            .load()
            .unwrap();
        assert_eq!(loaded.hub, HubConfig::default());
        assert_eq!(loaded.history_dir, PathBuf::from("conversations_log"));
    }

    #[test]
    fn test_zero_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[hub]\nchannel_capacity = 0\n");
        let err = ConfigLoader::new(&path, None).load().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(msg) if msg.contains("channel_capacity")));

        let path = write_config(&dir, "[monitor]\nperiod_ms = 0\n");
        assert!(matches!(
            ConfigLoader::new(&path, None).load(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[hub\n");
        assert!(matches!(
            ConfigLoader::new(&path, None).load(),
            Err(ConfigError::ParseError(_))
        ));
    }
}
