//! Command context and error types shared by the handlers.

use std::fmt::{self, Display, Formatter};

use anyhow::anyhow;
use cloudpull_app::{Backend, DownloadSession, SessionError};
use cloudpull_config::ConfigStore;
use cloudpull_core::SyncError;
use cloudpull_events::EventBus;

use crate::cli::OutputFormat;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
    Interrupted,
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
            Self::Interrupted => 130,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
            Self::Interrupted => "interrupted".to_string(),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<SessionError> for CliError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Invalid(reason) | SessionError::Sync(SyncError::Validation(reason)) => {
                Self::validation(reason.to_string())
            }
            other => Self::failure(anyhow!(other.to_string())),
        }
    }
}

/// Context passed to command handlers.
pub(crate) struct AppContext {
    pub(crate) store: ConfigStore,
    pub(crate) output: OutputFormat,
}

impl AppContext {
    /// Reach the configured rclone backend.
    pub(crate) async fn connect(&self) -> CliResult<Backend> {
        Backend::connect(self.store.config())
            .await
            .map_err(CliError::failure)
    }

    /// Fresh session over `backend` with its own event bus.
    pub(crate) fn session(&self, backend: &Backend) -> DownloadSession {
        backend.session(self.store.config(), EventBus::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpull_core::ValidationError;

    #[test]
    fn exit_codes_distinguish_validation() {
        let validation = CliError::from(SessionError::Invalid(ValidationError::MissingSource));
        assert_eq!(validation.exit_code(), 2);
        assert_eq!(validation.display_message(), "a source folder is required");

        let failure = CliError::from(SessionError::Sync(SyncError::Service {
            message: "Cannot reach the transfer service. Make sure rclone is running.".into(),
        }));
        assert_eq!(failure.exit_code(), 3);
        assert_eq!(
            failure.display_message(),
            "Cannot reach the transfer service. Make sure rclone is running."
        );

        let busy = CliError::from(SessionError::Sync(SyncError::Validation(
            ValidationError::TransferInProgress,
        )));
        assert_eq!(busy.exit_code(), 2);
        assert_eq!(CliError::Interrupted.exit_code(), 130);
    }
}
