//! Confirmation gate guarding unprotected syncs.
//!
//! A submission without backup protection pauses in `AwaitingConfirmation`
//! until the user confirms or dismisses. A best-effort dry run refines the
//! prompt; the gate works the same when the engine cannot simulate.

use cloudpull_core::{DryRunOutcome, TransferEngine, TransferJobSpec};
use tracing::{debug, info};

/// Warning attached to every prompt while backups are disabled.
pub const UNPROTECTED_WARNING: &str =
    "Backups are disabled: files deleted or overwritten in the destination cannot be recovered.";

/// What the dry run revealed, if anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    /// The dry run reported files that would be deleted.
    DeletionsDetected {
        /// Every destination path that would be deleted.
        paths: Vec<String>,
        /// Dry-run summary.
        stats: String,
    },
    /// The dry run completed without reporting deletions.
    NoDeletionsDetected {
        /// Dry-run summary.
        stats: String,
    },
    /// No dry-run information is available.
    Inconclusive,
}

/// Prompt shown while the gate waits for a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationPrompt {
    /// Dry-run derived content.
    pub kind: PromptKind,
    /// Whether the data-loss warning applies.
    pub unprotected: bool,
}

impl ConfirmationPrompt {
    /// Generic prompt used before or without a dry run.
    #[must_use]
    pub const fn inconclusive(unprotected: bool) -> Self {
        Self {
            kind: PromptKind::Inconclusive,
            unprotected,
        }
    }

    /// Prompt derived from a dry-run outcome.
    #[must_use]
    pub fn from_outcome(outcome: DryRunOutcome, unprotected: bool) -> Self {
        let kind = if outcome.would_delete {
            PromptKind::DeletionsDetected {
                paths: outcome.deleted_paths,
                stats: outcome.stats_summary,
            }
        } else {
            PromptKind::NoDeletionsDetected {
                stats: outcome.stats_summary,
            }
        };
        Self { kind, unprotected }
    }

    /// Number of paths the dry run would delete.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        match &self.kind {
            PromptKind::DeletionsDetected { paths, .. } => paths.len(),
            PromptKind::NoDeletionsDetected { .. } | PromptKind::Inconclusive => 0,
        }
    }

    /// Prompt text, one entry per displayed line.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match &self.kind {
            PromptKind::DeletionsDetected { paths, stats } => {
                lines.push(format!(
                    "The following {} file(s) in the destination will be deleted:",
                    paths.len()
                ));
                lines.extend(paths.iter().map(|path| format!("  {path}")));
                lines.push(stats.clone());
            }
            PromptKind::NoDeletionsDetected { stats } => {
                lines.push("A dry run found no files to delete.".to_string());
                lines.push(stats.clone());
            }
            PromptKind::Inconclusive => lines.push(
                "Syncing may delete or overwrite files in the destination that are not in the source."
                    .to_string(),
            ),
        }
        if self.unprotected {
            lines.push(UNPROTECTED_WARNING.to_string());
        }
        lines
    }
}

/// Gate state machine.
///
/// The job a prompt was built for travels with the state, so a confirmation
/// can only ever start the job the user was shown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GateState {
    /// Nothing pending.
    #[default]
    Idle,
    /// Waiting for the user to confirm or dismiss.
    AwaitingConfirmation {
        /// Prompt shown to the user.
        prompt: ConfirmationPrompt,
        /// Job the prompt describes.
        spec: Box<TransferJobSpec>,
    },
    /// Confirmed; a submission of exactly this job proceeds once.
    Approved(Box<TransferJobSpec>),
}

/// Outcome of a submission through the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Start the transfer.
    Proceed,
    /// Hold until the user decides.
    ConfirmationRequired(ConfirmationPrompt),
}

/// Decides whether a submission needs explicit confirmation.
#[derive(Debug, Default)]
pub struct SafetyGate {
    state: GateState,
}

impl SafetyGate {
    /// Gate in the `Idle` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &GateState {
        &self.state
    }

    /// Route a submission of `spec`.
    ///
    /// Any pending approval is consumed here, whether or not it matches;
    /// it only lets `spec` through when it was granted for the same job.
    pub fn submit(&mut self, spec: &TransferJobSpec) -> GateDecision {
        let previous = std::mem::take(&mut self.state);
        if let GateState::Approved(approved) = previous
            && *approved == *spec
        {
            return GateDecision::Proceed;
        }
        if spec.create_backup {
            return GateDecision::Proceed;
        }
        let prompt = ConfirmationPrompt::inconclusive(true);
        self.state = GateState::AwaitingConfirmation {
            prompt: prompt.clone(),
            spec: Box::new(spec.clone()),
        };
        GateDecision::ConfirmationRequired(prompt)
    }

    /// Refine the pending prompt with a dry run of the pending job.
    /// Failures keep the generic prompt.
    pub async fn probe(&mut self, engine: &dyn TransferEngine) -> Option<ConfirmationPrompt> {
        let GateState::AwaitingConfirmation { prompt, spec } = &mut self.state else {
            return None;
        };
        let unprotected = !spec.create_backup;
        *prompt = match engine.probe_dry_run(spec).await {
            Ok(outcome) => {
                info!(
                    would_delete = outcome.would_delete,
                    deleted = outcome.deleted_paths.len(),
                    "dry run finished"
                );
                ConfirmationPrompt::from_outcome(outcome, unprotected)
            }
            Err(err) => {
                debug!(error = %err, "dry run unavailable; keeping generic prompt");
                ConfirmationPrompt::inconclusive(unprotected)
            }
        };
        Some(prompt.clone())
    }

    /// Approve the pending submission and return the job it covers.
    /// Returns `None` when nothing is pending.
    pub fn confirm(&mut self) -> Option<TransferJobSpec> {
        match std::mem::take(&mut self.state) {
            GateState::AwaitingConfirmation { spec, .. } => {
                let approved = (*spec).clone();
                self.state = GateState::Approved(spec);
                Some(approved)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Drop whatever is pending or approved. Returns `false` when the gate was idle.
    pub fn cancel(&mut self) -> bool {
        !matches!(std::mem::take(&mut self.state), GateState::Idle)
    }
}
