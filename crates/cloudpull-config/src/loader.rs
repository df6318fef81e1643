//! JSON file-backed configuration store.
//!
//! # Design
//! - Missing files are created with defaults on first open.
//! - Writes go to a sibling temp file that is renamed over the target.

use std::env;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::defaults::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, CONFIG_PATH_ENV};
use crate::error::{ConfigError, ConfigResult};
use crate::model::AppConfig;
use crate::validate::validate;

/// Resolve the configuration path from `CLOUDPULL_CONFIG`, `XDG_CONFIG_HOME` or `HOME`.
///
/// # Errors
///
/// Returns `ConfigError::NoConfigDir` when none of the variables are set.
pub fn default_path() -> ConfigResult<PathBuf> {
    resolve_path(
        env::var_os(CONFIG_PATH_ENV).map(PathBuf::from),
        env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        env::var_os("HOME").map(PathBuf::from),
    )
}

fn resolve_path(
    explicit: Option<PathBuf>,
    xdg_config: Option<PathBuf>,
    home: Option<PathBuf>,
) -> ConfigResult<PathBuf> {
    if let Some(path) = explicit.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(path);
    }
    let root = xdg_config
        .filter(|path| !path.as_os_str().is_empty())
        .or_else(|| home.map(|home| home.join(".config")))
        .ok_or(ConfigError::NoConfigDir)?;
    Ok(root.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Loaded configuration together with the file it came from.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    current: AppConfig,
}

impl ConfigStore {
    /// Load `path`, merging missing fields with defaults. A missing file is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, validated or created.
    pub async fn open(path: impl Into<PathBuf>) -> ConfigResult<Self> {
        let path = path.into();
        let current = match fs::read(&path).await {
            Ok(bytes) => {
                let config: AppConfig =
                    serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
                        path: path.clone(),
                        source,
                    })?;
                debug!(path = %path.display(), "loaded configuration");
                config
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let config = AppConfig::default();
                write_atomic(&path, &config).await?;
                info!(path = %path.display(), "created default configuration");
                config
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    operation: "read",
                    path,
                    source,
                });
            }
        };
        validate(&current)?;
        Ok(Self { path, current })
    }

    /// Current configuration.
    #[must_use]
    pub const fn config(&self) -> &AppConfig {
        &self.current
    }

    /// File backing the store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the configuration, validate it and persist it.
    ///
    /// The in-memory value is replaced only after the write succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the changed document is invalid or cannot be written.
    pub async fn update<F>(&mut self, change: F) -> ConfigResult<&AppConfig>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut next = self.current.clone();
        change(&mut next);
        self.replace(next).await
    }

    /// Validate and persist a complete replacement document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is invalid or cannot be written.
    pub async fn replace(&mut self, next: AppConfig) -> ConfigResult<&AppConfig> {
        validate(&next)?;
        write_atomic(&self.path, &next).await?;
        self.current = next;
        Ok(&self.current)
    }
}

async fn write_atomic(path: &Path, config: &AppConfig) -> ConfigResult<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| ConfigError::Io {
                operation: "create_dir",
                path: parent.to_path_buf(),
                source,
            })?;
    }
    let bytes =
        serde_json::to_vec_pretty(config).map_err(|source| ConfigError::Serialize { source })?;
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);
    fs::write(&temp, bytes)
        .await
        .map_err(|source| ConfigError::Io {
            operation: "write",
            path: temp.clone(),
            source,
        })?;
    fs::rename(&temp, path)
        .await
        .map_err(|source| ConfigError::Io {
            operation: "rename",
            path: path.to_path_buf(),
            source,
        })
}
