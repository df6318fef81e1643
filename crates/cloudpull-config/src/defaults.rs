//! Default values for a freshly created configuration document.
//!
//! # Design
//! - Centralize defaults so the model, the loader and the CLI agree.

/// Name given to profiles created through interactive authorization.
pub const DEFAULT_PROFILE_NAME: &str = "gdrive_unofficial_neuro_kar";
/// Folder id pre-filled as the download source.
pub const DEFAULT_SOURCE: &str = "1B1VaWp-mCKk15_7XpFnImsTdBJPOGx7a";
/// Folder nested under the destination when subfolder creation is enabled.
pub const DEFAULT_SUBFOLDER: &str = "Unofficial-Neuro-Karaoke-Archive";
/// Listen address of the rclone remote-control daemon.
pub const DEFAULT_RC_ADDR: &str = "127.0.0.1:5572";
/// rclone binary looked up on `PATH`.
pub const DEFAULT_RCLONE_BINARY: &str = "rclone";
/// Timeout applied to each RC request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
/// Interval between job status polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
/// Default log level directive.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// File name of the persisted configuration document.
pub const CONFIG_FILE_NAME: &str = "app-config.json";
/// Directory created under the platform config root.
pub const CONFIG_DIR_NAME: &str = "cloudpull";
/// Environment variable overriding the configuration path.
pub const CONFIG_PATH_ENV: &str = "CLOUDPULL_CONFIG";
