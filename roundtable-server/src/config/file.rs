//! TOML file configuration structures.
//!
//! These structs map directly to the `roundtable.toml` file format. Every
//! section and every field may be omitted.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub hub: HubConfig,
    pub monitor: MonitorConfig,
    pub run: RunConfig,
    pub history: HistoryConfig,
}

/// `[server]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8000").
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8000)),
        }
    }
}

/// `[hub]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Unread items kept per subscriber before the oldest is dropped.
    pub channel_capacity: usize,
    /// Idle time after which the event stream writes a keep-alive.
    pub read_timeout_ms: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            read_timeout_ms: 1_000,
        }
    }
}

/// `[monitor]`. Reloaded on SIGHUP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub period_ms: u64,
    pub idle_timeout_ms: u64,
    pub evict_after_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            period_ms: 1_000,
            idle_timeout_ms: 1_000,
            evict_after_ms: 30_000,
        }
    }
}

/// `[run]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Time a stopped producer gets before it is aborted.
    pub stop_grace_ms: u64,
    /// Pause between two scripted messages.
    pub step_delay_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            stop_grace_ms: 5_000,
            step_delay_ms: 2_000,
        }
    }
}

/// `[history]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Directory receiving one JSON file per finished run.
    pub dir: PathBuf,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("conversations_log"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[hub]
channel_capacity = 64
read_timeout_ms = 500

[monitor]
period_ms = 250
idle_timeout_ms = 750
evict_after_ms = 10000

[run]
stop_grace_ms = 2000
step_delay_ms = 100

[history]
dir = "/var/lib/roundtable"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.hub.channel_capacity, 64);
        assert_eq!(config.monitor.evict_after_ms, 10_000);
        assert_eq!(config.run.step_delay_ms, 100);
        assert_eq!(config.history.dir, PathBuf::from("/var/lib/roundtable"));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: FileConfig = toml::from_str("[hub]\nchannel_capacity = 8\n").unwrap();
        assert_eq!(config.hub.channel_capacity, 8);
        assert_eq!(config.hub.read_timeout_ms, 1_000);
        assert_eq!(config.server, ServerConfig::default());
        assert_eq!(config.monitor, MonitorConfig::default());
    }

    #[test]
    fn test_empty_file_is_valid() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
    }
}
