//! # Design
//!
//! - Centralize application-level errors for bootstrap and backend wiring.
//! - Keep error messages constant while carrying context fields for debugging.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration operations failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: cloudpull_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: cloudpull_telemetry::TelemetryError,
    },
    /// rclone backend operations failed.
    #[error("rclone backend operation failed")]
    Rclone {
        /// Operation identifier.
        operation: &'static str,
        /// Source adapter error.
        source: cloudpull_rclone::RcloneError,
    },
}

impl AppError {
    /// Wrap a configuration failure.
    #[must_use]
    pub const fn config(operation: &'static str, source: cloudpull_config::ConfigError) -> Self {
        Self::Config { operation, source }
    }

    /// Wrap a telemetry failure.
    #[must_use]
    pub const fn telemetry(
        operation: &'static str,
        source: cloudpull_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn rclone(
        operation: &'static str,
        source: cloudpull_rclone::RcloneError,
    ) -> Self {
        Self::Rclone { operation, source }
    }
}
