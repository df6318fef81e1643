//! Typed configuration document.
//!
//! Every section is `#[serde(default)]`, so a partial document read from disk
//! is merged field by field with the defaults.

use cloudpull_core::TransferMode;
use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_LOG_LEVEL, DEFAULT_POLL_INTERVAL_MS, DEFAULT_PROFILE_NAME, DEFAULT_RC_ADDR,
    DEFAULT_RCLONE_BINARY, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SOURCE, DEFAULT_SUBFOLDER,
};

/// Root of the persisted configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Remote-control endpoint settings.
    pub network: NetworkConfig,
    /// Pre-filled transfer parameters.
    pub download: DownloadDefaults,
    /// rclone binary settings.
    pub rclone: RcloneConfig,
    /// Logging output settings.
    pub logging: LoggingSection,
}

/// Settings for reaching the rclone remote-control daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// `host:port` the daemon listens on.
    pub rc_addr: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Interval between job status polls in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rc_addr: DEFAULT_RC_ADDR.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

/// Values the transfer parameters start from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadDefaults {
    /// Source folder id or share URL.
    pub source: String,
    /// Last used destination directory.
    pub destination: Option<String>,
    /// Profile selected when the session starts.
    pub profile: String,
    /// Nest downloads in `subfolder_name`.
    pub create_subfolder: bool,
    /// Nested folder name.
    pub subfolder_name: String,
    /// Preserve overwritten or deleted files in a timestamped backup folder.
    pub create_backup: bool,
    /// Sync or copy.
    pub mode: TransferMode,
    /// Delete destination files excluded by the selection filter.
    pub delete_excluded: bool,
    /// Detect renamed files.
    pub track_renames: bool,
    /// Bandwidth limit such as `10M`; absent means unlimited.
    pub bandwidth_limit: Option<String>,
    /// Hold a sleep inhibitor while a transfer runs.
    pub prevent_sleep: bool,
}

impl Default for DownloadDefaults {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            destination: None,
            profile: DEFAULT_PROFILE_NAME.to_string(),
            create_subfolder: true,
            subfolder_name: DEFAULT_SUBFOLDER.to_string(),
            create_backup: true,
            mode: TransferMode::Sync,
            delete_excluded: false,
            track_renames: false,
            bandwidth_limit: None,
            prevent_sleep: true,
        }
    }
}

/// rclone binary settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RcloneConfig {
    /// Binary path or name resolved on `PATH`.
    pub binary: String,
    /// Launch a private `rclone rcd` instead of using an already running one.
    pub spawn_daemon: bool,
}

impl Default for RcloneConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_RCLONE_BINARY.to_string(),
            spawn_daemon: true,
        }
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormatSetting {
    /// Human readable output.
    #[default]
    Pretty,
    /// Structured JSON output.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormatSetting,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormatSetting::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_merges_with_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"download": {"destination": "/music", "create_backup": false}, "logging": {"format": "json"}}"#,
        )
        .expect("parse partial config");

        assert_eq!(config.download.destination.as_deref(), Some("/music"));
        assert!(!config.download.create_backup);
        assert_eq!(config.download.source, DEFAULT_SOURCE);
        assert_eq!(config.download.profile, DEFAULT_PROFILE_NAME);
        assert!(config.download.create_subfolder);
        assert!(config.download.prevent_sleep);
        assert_eq!(config.logging.format, LogFormatSetting::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.network, NetworkConfig::default());
        assert_eq!(config.rclone, RcloneConfig::default());
    }

    #[test]
    fn empty_document_is_default() {
        let config: AppConfig = serde_json::from_str("{}").expect("parse empty config");
        assert_eq!(config, AppConfig::default());
    }
}
