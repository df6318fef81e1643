//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the configuration file failed.
    #[error("configuration file IO failure")]
    Io {
        /// Operation that failed.
        operation: &'static str,
        /// File involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The configuration document could not be parsed.
    #[error("configuration file is not valid JSON")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The configuration could not be converted to or from its JSON form.
    #[error("configuration could not be serialized")]
    Serialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: String,
        /// Field that failed validation.
        field: String,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// A dotted key did not name a known setting.
    #[error("unknown configuration field")]
    UnknownField {
        /// Key provided by the caller.
        key: String,
    },
    /// No configuration directory could be derived from the environment.
    #[error("configuration directory unavailable")]
    NoConfigDir,
}

impl ConfigError {
    /// Short human readable detail including the offending context.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => format!("{self}: {operation} {}", path.display()),
            Self::Parse { path, source } => format!("{self}: {} ({source})", path.display()),
            Self::Serialize { source } => format!("{self}: {source}"),
            Self::InvalidField {
                section,
                field,
                value,
                reason,
            } => match value {
                Some(value) => format!("{self}: {section}.{field} = '{value}' {reason}"),
                None => format!("{self}: {section}.{field} {reason}"),
            },
            Self::UnknownField { key } => format!("{self}: {key}"),
            Self::NoConfigDir => format!("{self}: set CLOUDPULL_CONFIG or HOME"),
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
