//! One interactive download session: profiles, parameters, gate and runs.

use std::sync::Arc;

use cloudpull_config::DownloadDefaults;
use cloudpull_core::{
    ErrorKind, Notifier, ProfileSelection, ProfileService, RemoteEntry, RemoteProfile, SyncError,
    TransferEngine, TransferJobSpec, TransferRun, ValidationError, WakeLock, classify,
};
use cloudpull_events::{Event, EventBus};
use thiserror::Error;
use tracing::info;

use crate::gate::{ConfirmationPrompt, GateDecision, GateState, SafetyGate};
use crate::orchestrator::TransferOrchestrator;
use crate::params::TransferParams;
use crate::profiles::ProfileManager;

const AUTHORIZATION_NOTICE: &str = "Starting authorization flow... check your browser.";

/// Failures of session-level operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The operation is unavailable while a transfer runs.
    #[error("a transfer is in progress")]
    Busy,
    /// `confirm` was called without a pending submission.
    #[error("no download is awaiting confirmation")]
    NothingToConfirm,
    /// Parameters or selection were rejected locally.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// A listing, authorization or orchestration failure with its classified message.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// What happened to a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The parameters were rejected; a notice was appended to the log.
    Invalid(ValidationError),
    /// The user must confirm before anything runs.
    ConfirmationRequired(ConfirmationPrompt),
    /// The run reached a terminal state.
    Finished(TransferRun),
}

/// Collaborators wired into a session.
pub struct SessionDeps {
    /// Profile backend.
    pub profiles: Arc<dyn ProfileService>,
    /// Transfer backend.
    pub engine: Arc<dyn TransferEngine>,
    /// Notification sink.
    pub notifier: Arc<dyn Notifier>,
    /// Sleep inhibitor.
    pub wake_lock: Arc<dyn WakeLock>,
    /// Shared event bus.
    pub events: EventBus,
}

/// Session state shared by every front-end operation.
pub struct DownloadSession {
    profiles: ProfileManager,
    params: TransferParams,
    gate: SafetyGate,
    orchestrator: Arc<TransferOrchestrator>,
    engine: Arc<dyn TransferEngine>,
    events: EventBus,
}

impl DownloadSession {
    /// Build a session seeded from the persisted download defaults.
    #[must_use]
    pub fn new(deps: SessionDeps, defaults: &DownloadDefaults) -> Self {
        let orchestrator = TransferOrchestrator::new(
            Arc::clone(&deps.engine),
            deps.notifier,
            deps.wake_lock,
            deps.events.clone(),
        );
        Self {
            profiles: ProfileManager::new(deps.profiles, deps.events.clone(), &defaults.profile),
            params: TransferParams::from_defaults(defaults),
            gate: SafetyGate::new(),
            orchestrator: Arc::new(orchestrator),
            engine: deps.engine,
            events: deps.events,
        }
    }

    /// Re-list remote profiles.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Service` with a classified message; it is also logged as a notice.
    pub async fn refresh_profiles(&mut self) -> Result<Vec<RemoteProfile>, SessionError> {
        self.profiles.refresh().await.map_err(|err| {
            self.orchestrator.append_notice(err.to_string());
            SessionError::Sync(err)
        })
    }

    /// Change the profile selection. A pending confirmation is dropped.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Busy` while a transfer runs.
    pub fn select_profile(&mut self, selection: ProfileSelection) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.discard_pending();
        self.profiles.select(selection);
        Ok(())
    }

    /// Run the interactive authorization flow and select the new profile.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Busy` while a transfer runs, or `SyncError::Auth`
    /// when authorization fails.
    pub async fn create_profile(&mut self) -> Result<RemoteProfile, SessionError> {
        self.ensure_idle()?;
        self.discard_pending();
        self.orchestrator.append_notice(AUTHORIZATION_NOTICE);
        match self.profiles.create_profile().await {
            Ok(profile) => {
                self.orchestrator
                    .append_notice(format!("Remote profile '{}' created.", profile.id));
                Ok(profile)
            }
            Err(err) => {
                self.orchestrator.append_notice(err.to_string());
                Err(err.into())
            }
        }
    }

    /// Editable parameters. A pending confirmation is dropped, since it
    /// described the parameters as they were.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Busy` while a transfer runs.
    pub fn params_mut(&mut self) -> Result<&mut TransferParams, SessionError> {
        self.ensure_idle()?;
        self.discard_pending();
        Ok(&mut self.params)
    }

    /// Submit the current parameters.
    ///
    /// Unprotected syncs stop at the gate with a dry-run refined prompt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Busy` while a transfer runs.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, SessionError> {
        self.ensure_idle()?;
        if let Err(reason) = self.params.validate(self.profiles.is_valid()) {
            self.orchestrator.append_notice(capitalize(&reason.to_string()));
            return Ok(SubmitOutcome::Invalid(reason));
        }
        let spec = self
            .params
            .to_spec(self.profiles.selected_id().unwrap_or_default());
        self.dispatch(&spec).await
    }

    /// Approve the pending submission and run the job the prompt described.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NothingToConfirm` when no submission is pending,
    /// or `SessionError::Busy` while a transfer runs.
    pub async fn confirm(&mut self) -> Result<SubmitOutcome, SessionError> {
        self.ensure_idle()?;
        let spec = self.gate.confirm().ok_or(SessionError::NothingToConfirm)?;
        info!("unprotected download confirmed");
        self.dispatch(&spec).await
    }

    async fn dispatch(&mut self, spec: &TransferJobSpec) -> Result<SubmitOutcome, SessionError> {
        if let GateDecision::ConfirmationRequired(initial) = self.gate.submit(spec) {
            let prompt = self
                .gate
                .probe(self.engine.as_ref())
                .await
                .unwrap_or(initial);
            let _ = self.events.publish(Event::ConfirmationRequested {
                deletions_detected: prompt.deleted_count() > 0,
                deleted_count: prompt.deleted_count(),
            });
            return Ok(SubmitOutcome::ConfirmationRequired(prompt));
        }

        match self.orchestrator.start(spec).await {
            Ok(run) => Ok(SubmitOutcome::Finished(run)),
            Err(SyncError::Validation(reason)) => Ok(SubmitOutcome::Invalid(reason)),
            Err(err) => Err(err.into()),
        }
    }

    /// Drop the pending submission. Returns `false` when nothing was pending.
    pub fn dismiss_confirmation(&mut self) -> bool {
        let dismissed = self.gate.cancel();
        if dismissed {
            info!("unprotected download dismissed");
        }
        dismissed
    }

    /// List a folder of the current source with the selected profile.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Invalid` without a profile or source, or
    /// `SyncError::Service` with a classified message.
    pub async fn list_files(&self, path: &str) -> Result<Vec<RemoteEntry>, SessionError> {
        let profile = self
            .profiles
            .selected_id()
            .filter(|_| self.profiles.is_valid())
            .ok_or(ValidationError::MissingProfile)?;
        let source = self.params.source().trim();
        if source.is_empty() {
            return Err(ValidationError::MissingSource.into());
        }
        self.engine
            .list_files(profile, source, path)
            .await
            .map_err(|err| {
                SessionError::Sync(SyncError::Service {
                    message: classify(ErrorKind::Listing, &format!("{err:#}")),
                })
            })
    }

    /// Orchestrator handle usable from another task to request cancellation.
    #[must_use]
    pub fn cancel_handle(&self) -> Arc<TransferOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    /// Whether a run is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.orchestrator.is_busy()
    }

    /// Snapshot of the latest run.
    #[must_use]
    pub fn run(&self) -> TransferRun {
        self.orchestrator.run()
    }

    /// Profile state.
    #[must_use]
    pub const fn profiles(&self) -> &ProfileManager {
        &self.profiles
    }

    /// Current parameters.
    #[must_use]
    pub const fn params(&self) -> &TransferParams {
        &self.params
    }

    /// Current gate state.
    #[must_use]
    pub const fn gate_state(&self) -> &GateState {
        self.gate.state()
    }

    /// Bus carrying every session event.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    fn discard_pending(&mut self) {
        if self.gate.cancel() {
            info!("pending confirmation dropped after an edit");
        }
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.is_busy() {
            Err(SessionError::Busy)
        } else {
            Ok(())
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect::<String>() + "."
    })
}
