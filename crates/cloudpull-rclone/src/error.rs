//! # Design
//!
//! - Keep adapter error context in fields; messages stay constant except where
//!   rclone itself supplies the user-relevant text.
//! - Transport failures keep their `reqwest` source so the full chain can be
//!   classified upstream.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Errors raised by the rclone adapter.
#[derive(Debug)]
pub enum RcloneError {
    /// The RC endpoint could not be reached or answered with an unreadable body.
    Transport {
        /// RC method being invoked.
        method: String,
        /// Underlying HTTP failure.
        source: reqwest::Error,
    },
    /// The RC endpoint answered with a non-success status.
    Rejected {
        /// RC method being invoked.
        method: String,
        /// HTTP status code.
        status: u16,
        /// Error text reported by rclone.
        message: String,
    },
    /// A response did not carry a field the adapter depends on.
    MissingField {
        /// RC method being invoked.
        method: &'static str,
        /// Missing field name.
        field: &'static str,
    },
    /// A job request carried a value that cannot be turned into an rclone call.
    InvalidInput {
        /// Field with the invalid value.
        field: &'static str,
        /// Static reason describing the problem.
        reason: &'static str,
    },
    /// A finished job reported an error.
    JobFailed {
        /// Job error text.
        message: String,
    },
    /// The job disappeared or the daemon went away after a stop request.
    Cancelled {
        /// Whether the daemon itself stopped answering.
        server_stopped: bool,
    },
    /// A stop was requested while no job is active.
    NoActiveJob,
    /// The rclone binary could not be launched.
    Spawn {
        /// Operation that needed the binary.
        operation: &'static str,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// An rclone subprocess exited unsuccessfully.
    ProcessFailed {
        /// Operation that ran the process.
        operation: &'static str,
        /// Captured standard error.
        stderr: String,
    },
    /// Authorization output did not contain a JSON token.
    InvalidAuthorization,
    /// The daemon did not answer `rc/noop` in time.
    DaemonUnavailable {
        /// Address that was polled.
        addr: String,
    },
}

impl Display for RcloneError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { method, .. } => {
                write!(formatter, "rclone request '{method}' could not be sent")
            }
            Self::Rejected {
                method,
                status,
                message,
            } => {
                let _ = (method, status);
                formatter.write_str(message)
            }
            Self::MissingField { method, field } => {
                let _ = method;
                write!(formatter, "rclone response missing field '{field}'")
            }
            Self::InvalidInput { field, reason } => {
                write!(formatter, "invalid transfer input '{field}': {reason}")
            }
            Self::JobFailed { message } => write!(formatter, "Job failed: {message}"),
            Self::Cancelled {
                server_stopped: false,
            } => formatter.write_str("Download cancelled"),
            Self::Cancelled {
                server_stopped: true,
            } => formatter.write_str("Download cancelled (server stopped)"),
            Self::NoActiveJob => formatter.write_str("no active transfer to stop"),
            Self::Spawn { operation, .. } => {
                let _ = operation;
                formatter.write_str("failed to launch rclone")
            }
            Self::ProcessFailed { operation, stderr } => {
                write!(formatter, "rclone {operation} exited unsuccessfully: {stderr}")
            }
            Self::InvalidAuthorization => {
                formatter.write_str("invalid authorization output: no token found")
            }
            Self::DaemonUnavailable { addr } => {
                let _ = addr;
                formatter.write_str("rclone daemon did not become ready")
            }
        }
    }
}

impl Error for RcloneError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport { source, .. } => Some(source),
            Self::Spawn { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl RcloneError {
    /// Whether the error means the RC endpoint could not be reached at all.
    #[must_use]
    pub fn is_connection_failure(&self) -> bool {
        match self {
            Self::Transport { source, .. } => source.is_connect() || source.is_request(),
            _ => false,
        }
    }

    /// Whether rclone reported that the job id is unknown.
    #[must_use]
    pub fn is_job_not_found(&self) -> bool {
        matches!(self, Self::Rejected { message, .. } if message.contains("job not found"))
    }
}
