//! Event payload types carried between the orchestration core and front-ends.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Identifier assigned to each event emitted by the session.
pub type EventId = u64;

/// Default buffer size for the in-memory replay ring.
pub const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Lifecycle states of a transfer run as seen by subscribers.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// No transfer has been started yet.
    Idle,
    /// The transfer engine is working on the job.
    Running,
    /// A stop request was sent; the engine decides when to stop.
    CancelRequested,
    /// The engine reported success.
    Completed,
    /// The engine or the stop request reported a failure.
    Failed,
}

impl RunState {
    /// Whether the run can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Typed domain events surfaced by a download session.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new transfer run was created.
    RunStarted {
        /// Identifier of the new run.
        run_id: Uuid,
        /// Remote profile the run uses.
        profile: String,
        /// Local destination of the run.
        destination: String,
    },
    /// A line was appended to the run log.
    LogAppended {
        /// Run the line belongs to.
        run_id: Uuid,
        /// Zero-based position of the line in the log.
        index: usize,
        /// Appended text.
        line: String,
    },
    /// The run moved to another lifecycle state.
    StatusChanged {
        /// Run whose status changed.
        run_id: Uuid,
        /// New lifecycle state.
        state: RunState,
        /// Human readable status text.
        message: String,
    },
    /// Periodic progress reported by the transfer engine.
    Progress {
        /// Run being tracked.
        run_id: Uuid,
        /// Bytes transferred so far.
        bytes: u64,
        /// Bytes expected in total, zero when unknown.
        total_bytes: u64,
        /// Files fully transferred so far.
        transfers: u64,
    },
    /// The run reached a terminal state.
    RunFinished {
        /// Run that finished.
        run_id: Uuid,
        /// Terminal state.
        state: RunState,
    },
    /// The remote profile list was refreshed.
    ProfilesRefreshed {
        /// Profile identifiers in display order.
        profiles: Vec<String>,
    },
    /// The selected remote profile changed.
    ProfileSelected {
        /// Selected profile, `None` for the explicit "create new" choice.
        profile: Option<String>,
    },
    /// The safety gate paused the submission pending user confirmation.
    ConfirmationRequested {
        /// Whether a dry run confirmed that files would be deleted.
        deletions_detected: bool,
        /// Number of destination paths the dry run would delete.
        deleted_count: usize,
    },
}

impl Event {
    /// Machine-friendly discriminator for stream consumers.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::LogAppended { .. } => "log_appended",
            Self::StatusChanged { .. } => "status_changed",
            Self::Progress { .. } => "progress",
            Self::RunFinished { .. } => "run_finished",
            Self::ProfilesRefreshed { .. } => "profiles_refreshed",
            Self::ProfileSelected { .. } => "profile_selected",
            Self::ConfirmationRequested { .. } => "confirmation_requested",
        }
    }

    /// Run identifier carried by run-scoped events.
    #[must_use]
    pub const fn run_id(&self) -> Option<Uuid> {
        match self {
            Self::RunStarted { run_id, .. }
            | Self::LogAppended { run_id, .. }
            | Self::StatusChanged { run_id, .. }
            | Self::Progress { run_id, .. }
            | Self::RunFinished { run_id, .. } => Some(*run_id),
            Self::ProfilesRefreshed { .. }
            | Self::ProfileSelected { .. }
            | Self::ConfirmationRequested { .. } => None,
        }
    }
}

/// Metadata wrapper around events. Each envelope tracks the event id and emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EventEnvelope {
    /// Monotonic identifier assigned to the wrapped event.
    pub id: EventId,
    /// Timestamp recording when the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Wrapped event payload.
    pub event: Event,
}
