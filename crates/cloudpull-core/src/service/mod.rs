//! Traits implemented by the collaborators of the orchestration core.

use crate::model::{DryRunOutcome, EngineUpdate, RemoteEntry, TransferJobSpec};
use anyhow::bail;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Auth/profile backend able to list and create remote profiles.
#[async_trait]
pub trait ProfileService: Send + Sync {
    /// Return the identifiers of every known profile.
    async fn list_profiles(&self) -> anyhow::Result<Vec<String>>;

    /// Run the interactive authorization flow and persist a new profile.
    async fn create_profile(&self) -> anyhow::Result<String>;
}

/// Engine that performs transfers on behalf of the orchestrator.
#[async_trait]
pub trait TransferEngine: Send + Sync {
    /// Simulate the job without mutating anything; default implementation reports lack of support.
    async fn probe_dry_run(&self, spec: &TransferJobSpec) -> anyhow::Result<DryRunOutcome> {
        let _ = spec;
        bail!("dry run not supported by this engine");
    }

    /// Execute the job, streaming log lines and progress through `updates`.
    ///
    /// Resolves with the engine's final textual output.
    async fn run_transfer(
        &self,
        spec: &TransferJobSpec,
        updates: EngineUpdates,
    ) -> anyhow::Result<String>;

    /// Ask the engine to stop the active transfer. The request is cooperative.
    async fn request_stop(&self) -> anyhow::Result<()>;

    /// List a folder of the remote source; default implementation reports lack of support.
    async fn list_files(
        &self,
        profile: &str,
        source_ref: &str,
        path: &str,
    ) -> anyhow::Result<Vec<RemoteEntry>> {
        let _ = (profile, source_ref, path);
        bail!("remote listing not supported by this engine");
    }
}

/// User-facing notification sink. Implementations swallow their own failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A transfer started.
    async fn started(&self);
    /// Progress percentage, already clamped to `0..=100`.
    async fn progress(&self, percent: u8);
    /// The transfer completed.
    async fn completed(&self);
    /// The transfer failed with a user-facing message.
    async fn failed(&self, message: &str);
}

/// Platform facility that keeps the device awake while a transfer runs.
#[async_trait]
pub trait WakeLock: Send + Sync {
    /// Prevent the device from sleeping.
    async fn acquire(&self) -> anyhow::Result<()>;
    /// Allow the device to sleep again.
    async fn release(&self) -> anyhow::Result<()>;
}

/// Sending half handed to engines for incremental output.
#[derive(Clone, Debug)]
pub struct EngineUpdates {
    sender: mpsc::UnboundedSender<EngineUpdate>,
}

impl EngineUpdates {
    /// Create a connected sender/receiver pair.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineUpdate>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Forward a log line. Dropped silently once the receiver is gone.
    pub fn log(&self, line: impl Into<String>) {
        let _ = self.sender.send(EngineUpdate::Log(line.into()));
    }

    /// Forward progress counters.
    pub fn progress(&self, bytes: u64, total_bytes: u64, transfers: u64) {
        let _ = self.sender.send(EngineUpdate::Progress {
            bytes,
            total_bytes,
            transfers,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MinimalEngine;

    #[async_trait]
    impl TransferEngine for MinimalEngine {
        async fn run_transfer(
            &self,
            _spec: &TransferJobSpec,
            updates: EngineUpdates,
        ) -> anyhow::Result<String> {
            updates.log("copied");
            Ok("done".into())
        }

        async fn request_stop(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn spec() -> TransferJobSpec {
        TransferJobSpec {
            source_ref: "id".into(),
            destination_path: "/tmp".into(),
            remote_profile_id: "p".into(),
            create_subfolder: false,
            subfolder_name: String::new(),
            create_backup: true,
            explicit_file_selection: None,
            mode: crate::model::TransferMode::Sync,
            delete_excluded: false,
            track_renames: false,
            bandwidth_limit: None,
        }
    }

    #[tokio::test]
    async fn default_methods_report_unsupported() {
        let engine = MinimalEngine;
        let err = engine
            .probe_dry_run(&spec())
            .await
            .expect_err("dry run should be unsupported");
        assert!(err.to_string().contains("not supported"));
        let err = engine
            .list_files("p", "id", "")
            .await
            .expect_err("listing should be unsupported");
        assert!(err.to_string().contains("not supported"));
    }

    #[tokio::test]
    async fn updates_reach_the_receiver() {
        let (updates, mut receiver) = EngineUpdates::channel();
        let output = MinimalEngine
            .run_transfer(&spec(), updates.clone())
            .await
            .expect("transfer");
        updates.progress(5, 10, 1);
        drop(updates);
        assert_eq!(output, "done");
        assert_eq!(receiver.recv().await, Some(EngineUpdate::Log("copied".into())));
        assert_eq!(
            receiver.recv().await,
            Some(EngineUpdate::Progress {
                bytes: 5,
                total_bytes: 10,
                transfers: 1
            })
        );
        assert_eq!(receiver.recv().await, None);
    }
}
