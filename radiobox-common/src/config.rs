//! Bootstrap configuration for the RadioBox appliance
//!
//! All configuration is static: a single TOML file read once at startup.
//! The appliance must restart to pick up changes.
//!
//! Settings sources priority:
//! 1. `--config` command-line argument
//! 2. `RADIOBOX_CONFIG` environment variable
//! 3. `radiobox.toml` in the working directory

use crate::error::{Error, Result};
use crate::state::Channel;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default config file name looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "radiobox.toml";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Ordered channel list; the channel index wraps around within it
    pub channels: Vec<Channel>,

    /// Unix socket path for the command listener
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// HTTP port for the state snapshot (SSE) endpoint
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds between reconnect attempts after a stream disconnect
    #[serde(default = "default_reconnect_interval_secs")]
    pub reconnect_interval_secs: u64,

    /// OS mixer mute/unmute commands
    #[serde(default)]
    pub volume_control: VolumeControlConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Shell commands used to mute/unmute the OS mixer
#[derive(Debug, Clone, Deserialize)]
pub struct VolumeControlConfig {
    #[serde(default = "default_mute_cmd")]
    pub mute: String,
    #[serde(default = "default_unmute_cmd")]
    pub unmute: String,
}

impl Default for VolumeControlConfig {
    fn default() -> Self {
        Self {
            mute: default_mute_cmd(),
            unmute: default_unmute_cmd(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

fn default_socket_path() -> PathBuf {
    PathBuf::from("/tmp/radiobox.sock")
}

fn default_port() -> u16 {
    5780
}

fn default_reconnect_interval_secs() -> u64 {
    1
}

fn default_mute_cmd() -> String {
    "amixer set Master mute".to_string()
}

fn default_unmute_cmd() -> String {
    "amixer set Master unmute".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid TOML in {}: {}", path.display(), e)))?;

        if config.channels.is_empty() {
            return Err(Error::Config("at least one channel must be configured".into()));
        }

        debug!(
            "loaded {} ({} channel(s))",
            path.display(),
            config.channels.len()
        );
        Ok(config)
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: CLI argument, `RADIOBOX_CONFIG` env var, working directory.
    pub fn resolve_path(cli_arg: Option<&Path>) -> PathBuf {
        if let Some(path) = cli_arg {
            return path.to_path_buf();
        }
        if let Ok(path) = std::env::var("RADIOBOX_CONFIG") {
            return PathBuf::from(path);
        }
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_minimal_config_with_defaults() {
        let file = write_config(
            r#"
            [[channels]]
            title = "Jazz FM"
            url = "http://example.com/jazz"
            img = "jazz.png"
            "#,
        );

        let config = TomlConfig::load(file.path()).unwrap();
        assert_eq!(config.channels.len(), 1);
        assert_eq!(config.channels[0].title, "Jazz FM");
        assert_eq!(config.port, 5780);
        assert_eq!(config.reconnect_interval_secs, 1);
        assert_eq!(config.socket_path, PathBuf::from("/tmp/radiobox.sock"));
        assert_eq!(config.logging.level, "info");
        assert!(config.volume_control.mute.contains("mute"));
    }

    #[test]
    fn loads_full_config() {
        let file = write_config(
            r#"
            socket_path = "/run/radiobox.sock"
            port = 8080
            reconnect_interval_secs = 5

            [[channels]]
            title = "A"
            url = "http://a"
            img = "a.png"

            [[channels]]
            title = "B"
            url = "http://b"
            img = "b.png"

            [volume_control]
            mute = "pactl set-sink-mute 0 1"
            unmute = "pactl set-sink-mute 0 0"

            [logging]
            level = "debug"
            "#,
        );

        let config = TomlConfig::load(file.path()).unwrap();
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.port, 8080);
        assert_eq!(config.reconnect_interval_secs, 5);
        assert_eq!(config.volume_control.mute, "pactl set-sink-mute 0 1");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn rejects_empty_channel_list() {
        let file = write_config("channels = []\n");
        assert!(TomlConfig::load(file.path()).is_err());
    }

    #[test]
    fn missing_file_surfaces_as_io_error() {
        let err = TomlConfig::load(Path::new("/nonexistent/radiobox.toml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
