//! Error taxonomy for the download/sync flow.

use thiserror::Error;

/// Reason a transfer job was refused before anything started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No source folder was provided.
    #[error("a source folder is required")]
    MissingSource,
    /// No destination path was provided.
    #[error("a destination folder is required")]
    MissingDestination,
    /// No remote profile is selected.
    #[error("a remote profile must be selected")]
    MissingProfile,
    /// Another transfer is still running.
    #[error("a transfer is already in progress")]
    TransferInProgress,
}

/// Failures surfaced by the orchestration core, each carrying a classified message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Listing profiles or folders failed.
    #[error("{message}")]
    Service {
        /// Listing-classified message.
        message: String,
    },
    /// Interactive profile authorization failed.
    #[error("{message}")]
    Auth {
        /// Authorization-classified message.
        message: String,
    },
    /// The transfer engine reported a failure.
    #[error("{message}")]
    Transfer {
        /// Transfer-classified message.
        message: String,
    },
    /// The stop request could not be delivered.
    #[error("{message}")]
    Stop {
        /// Transfer-classified message.
        message: String,
    },
    /// The job parameters were rejected locally.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Convenience alias for orchestration results.
pub type SyncResult<T> = Result<T, SyncError>;
