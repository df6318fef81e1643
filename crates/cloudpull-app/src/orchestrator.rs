//! Runs one transfer at a time and owns its live log.
//!
//! The run snapshot lives behind a `std::sync::Mutex` that is never held
//! across an `.await`. Every log append and status change is mirrored onto
//! the event bus after the lock is released.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use cloudpull_core::{
    EngineUpdate, EngineUpdates, ErrorKind, Notifier, SyncError, SyncResult, TransferEngine,
    TransferJobSpec, TransferRun, TransferStatus, ValidationError, WakeLock, classify, percent,
};
use cloudpull_events::{Event, EventBus};
use cloudpull_telemetry::with_run_context;
use tracing::{info, warn};
use uuid::Uuid;

const RUNNING_MESSAGE: &str = "Downloading...";
const CANCELLING_MESSAGE: &str = "Cancelling...";
const COMPLETED_MESSAGE: &str = "Download completed successfully.";
const FAILED_MESSAGE: &str = "Download failed.";

/// Result of a cancellation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// No run is active.
    NotRunning,
    /// A stop request is already outstanding.
    AlreadyCancelling,
    /// The engine accepted the stop request; the run decides its final state.
    Requested,
    /// The stop request failed with `SyncError::Stop`; the run keeps going.
    StopFailed(SyncError),
}

/// Drives transfers through the engine and records their progress.
pub struct TransferOrchestrator {
    engine: Arc<dyn TransferEngine>,
    notifier: Arc<dyn Notifier>,
    wake_lock: Arc<dyn WakeLock>,
    events: EventBus,
    run: Mutex<TransferRun>,
}

impl TransferOrchestrator {
    /// Construct an idle orchestrator.
    #[must_use]
    pub fn new(
        engine: Arc<dyn TransferEngine>,
        notifier: Arc<dyn Notifier>,
        wake_lock: Arc<dyn WakeLock>,
        events: EventBus,
    ) -> Self {
        Self {
            engine,
            notifier,
            wake_lock,
            events,
            run: Mutex::new(TransferRun::new()),
        }
    }

    /// Execute `spec` to completion and return the final run snapshot.
    ///
    /// Engine failures are classified into the run log rather than returned.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Validation` when `spec` is incomplete or another run is active.
    pub async fn start(&self, spec: &TransferJobSpec) -> SyncResult<TransferRun> {
        spec.validate()?;
        let run_id = self.update(|run, pending| {
            if run.loading {
                return Err(ValidationError::TransferInProgress);
            }
            *run = TransferRun::new();
            run.loading = true;
            pending.push(Event::RunStarted {
                run_id: run.id,
                profile: spec.remote_profile_id.clone(),
                destination: spec.destination_path.clone(),
            });
            set_status(run, pending, TransferStatus::Running, RUNNING_MESSAGE);
            push_line(run, pending, "Starting download...");
            push_line(run, pending, format!("Source: {}", spec.source_ref));
            push_line(run, pending, format!("Destination: {}", spec.destination_path));
            push_line(run, pending, format!("Remote: {}", spec.remote_profile_id));
            let backup = if spec.create_backup { "Yes" } else { "No" };
            push_line(run, pending, format!("Backup: {backup}"));
            Ok(run.id)
        })?;
        info!(%run_id, profile = %spec.remote_profile_id, "transfer started");

        let mut guard = RunGuard {
            orchestrator: self,
            run_id,
            wake_lock_held: false,
        };
        with_run_context(run_id.to_string(), self.execute(spec, &mut guard)).await;
        drop(guard);
        Ok(self.run())
    }

    async fn execute(&self, spec: &TransferJobSpec, guard: &mut RunGuard<'_>) {
        if let Err(err) = self.wake_lock.acquire().await {
            warn!(error = %err, "failed to acquire wake lock");
        }
        guard.wake_lock_held = true;
        self.notifier.started().await;

        let (updates, mut receiver) = EngineUpdates::channel();
        let transfer = self.engine.run_transfer(spec, updates);
        tokio::pin!(transfer);
        let result = loop {
            tokio::select! {
                result = &mut transfer => break result,
                Some(update) = receiver.recv() => self.apply_update(guard.run_id, update).await,
            }
        };
        while let Ok(update) = receiver.try_recv() {
            self.apply_update(guard.run_id, update).await;
        }

        match result {
            Ok(output) => {
                self.update(|run, pending| {
                    for line in output.lines().filter(|line| !line.trim().is_empty()) {
                        push_line(run, pending, line);
                    }
                    finish(run, pending, TransferStatus::Completed, COMPLETED_MESSAGE);
                });
                info!("transfer completed");
                self.notifier.completed().await;
            }
            Err(err) => {
                let failure = SyncError::Transfer {
                    message: classify(ErrorKind::Transfer, &format!("{err:#}")),
                };
                self.update(|run, pending| {
                    push_line(run, pending, format!("Error: {failure}"));
                    finish(run, pending, TransferStatus::Failed, FAILED_MESSAGE);
                });
                warn!(error = %format!("{err:#}"), "transfer failed");
                self.notifier.failed(&failure.to_string()).await;
            }
        }

        if let Err(err) = self.wake_lock.release().await {
            warn!(error = %err, "failed to release wake lock");
        }
        guard.wake_lock_held = false;
    }

    async fn apply_update(&self, run_id: Uuid, update: EngineUpdate) {
        match update {
            EngineUpdate::Log(line) => self.append_notice(line),
            EngineUpdate::Progress {
                bytes,
                total_bytes,
                transfers,
            } => {
                let _ = self.events.publish(Event::Progress {
                    run_id,
                    bytes,
                    total_bytes,
                    transfers,
                });
                self.notifier.progress(percent(bytes, total_bytes)).await;
            }
        }
    }

    /// Ask the engine to stop the active run. At most one stop request is outstanding.
    pub async fn cancel(&self) -> CancelOutcome {
        let run_id = self.update(|run, pending| {
            if run.cancelling || run.status == TransferStatus::CancelRequested {
                return Err(CancelOutcome::AlreadyCancelling);
            }
            if run.status != TransferStatus::Running {
                return Err(CancelOutcome::NotRunning);
            }
            run.cancelling = true;
            set_status(
                run,
                pending,
                TransferStatus::CancelRequested,
                CANCELLING_MESSAGE,
            );
            push_line(run, pending, "Requesting cancellation...");
            Ok(run.id)
        });
        let run_id = match run_id {
            Ok(run_id) => run_id,
            Err(outcome) => return outcome,
        };

        match self.engine.request_stop().await {
            Ok(()) => {
                info!(%run_id, "stop requested");
                CancelOutcome::Requested
            }
            Err(err) => {
                let failure = SyncError::Stop {
                    message: classify(ErrorKind::Transfer, &format!("{err:#}")),
                };
                warn!(%run_id, error = %format!("{err:#}"), "stop request failed");
                self.update(|run, pending| {
                    if run.id != run_id {
                        return;
                    }
                    if !run.is_terminal() {
                        run.cancelling = false;
                        set_status(run, pending, TransferStatus::Running, RUNNING_MESSAGE);
                    }
                    push_line(run, pending, format!("Failed to stop transfer: {failure}"));
                });
                CancelOutcome::StopFailed(failure)
            }
        }
    }

    /// Append a local notice to the current log.
    pub fn append_notice(&self, line: impl Into<String>) {
        let line = line.into();
        self.update(|run, pending| push_line(run, pending, line));
    }

    /// Snapshot of the current run.
    #[must_use]
    pub fn run(&self) -> TransferRun {
        self.lock_run().clone()
    }

    /// Status of the current run.
    #[must_use]
    pub fn status(&self) -> TransferStatus {
        self.lock_run().status
    }

    /// Whether a run is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.lock_run().loading
    }

    /// Current log joined with newlines.
    #[must_use]
    pub fn log_text(&self) -> String {
        self.lock_run().log_text()
    }

    fn lock_run(&self) -> MutexGuard<'_, TransferRun> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<R>(&self, change: impl FnOnce(&mut TransferRun, &mut Vec<Event>) -> R) -> R {
        let mut pending = Vec::new();
        let result = {
            let mut run = self.lock_run();
            change(&mut run, &mut pending)
        };
        for event in pending {
            let _ = self.events.publish(event);
        }
        result
    }
}

fn push_line(run: &mut TransferRun, pending: &mut Vec<Event>, line: impl Into<String>) {
    let line = line.into();
    pending.push(Event::LogAppended {
        run_id: run.id,
        index: run.log_lines.len(),
        line: line.clone(),
    });
    run.log_lines.push(line);
}

fn set_status(
    run: &mut TransferRun,
    pending: &mut Vec<Event>,
    state: TransferStatus,
    message: &str,
) {
    run.status = state;
    run.status_message = message.to_string();
    pending.push(Event::StatusChanged {
        run_id: run.id,
        state,
        message: message.to_string(),
    });
}

fn finish(run: &mut TransferRun, pending: &mut Vec<Event>, state: TransferStatus, message: &str) {
    set_status(run, pending, state, message);
    run.loading = false;
    run.cancelling = false;
    run.finished_at = Some(Utc::now());
    pending.push(Event::RunFinished {
        run_id: run.id,
        state,
    });
}

/// Clears the run flags even when the `start` future is dropped mid-flight.
struct RunGuard<'a> {
    orchestrator: &'a TransferOrchestrator,
    run_id: Uuid,
    wake_lock_held: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let run_id = self.run_id;
        self.orchestrator.update(|run, pending| {
            if run.id != run_id {
                return;
            }
            if run.is_terminal() {
                run.loading = false;
                run.cancelling = false;
            } else {
                push_line(run, pending, "Error: Download was interrupted.");
                finish(run, pending, TransferStatus::Failed, FAILED_MESSAGE);
            }
        });
        if self.wake_lock_held
            && let Ok(handle) = tokio::runtime::Handle::try_current()
        {
            let wake_lock = Arc::clone(&self.orchestrator.wake_lock);
            handle.spawn(async move {
                if let Err(err) = wake_lock.release().await {
                    warn!(error = %err, "failed to release wake lock");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, bail};
    use async_trait::async_trait;
    use cloudpull_core::TransferMode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, call: impl Into<String>) {
            self.calls.lock().expect("lock").push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn started(&self) {
            self.push("started");
        }
        async fn progress(&self, percent: u8) {
            self.push(format!("progress {percent}"));
        }
        async fn completed(&self) {
            self.push("completed");
        }
        async fn failed(&self, message: &str) {
            self.push(format!("failed {message}"));
        }
    }

    #[async_trait]
    impl WakeLock for Recorder {
        async fn acquire(&self) -> anyhow::Result<()> {
            self.push("acquire");
            Ok(())
        }
        async fn release(&self) -> anyhow::Result<()> {
            self.push("release");
            bail!("inhibitor already gone")
        }
    }

    enum Script {
        Succeed(&'static str),
        Fail(&'static str),
        WaitForStop,
        FinishAfterStop(&'static str),
    }

    struct ScriptedEngine {
        script: Script,
        stop_fails: bool,
        stop_gate: Option<Arc<Notify>>,
        stops: AtomicUsize,
        running: Notify,
        stopped: Notify,
    }

    impl ScriptedEngine {
        fn new(script: Script) -> Self {
            Self {
                script,
                stop_fails: false,
                stop_gate: None,
                stops: AtomicUsize::new(0),
                running: Notify::new(),
                stopped: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl TransferEngine for ScriptedEngine {
        async fn run_transfer(
            &self,
            _spec: &TransferJobSpec,
            updates: EngineUpdates,
        ) -> anyhow::Result<String> {
            updates.log("Started rclone job 7");
            updates.progress(50, 200, 1);
            match self.script {
                Script::Succeed(output) => Ok(output.to_string()),
                Script::Fail(message) => Err(anyhow!(message)),
                Script::WaitForStop => {
                    self.running.notify_one();
                    self.stopped.notified().await;
                    Err(anyhow!("Download cancelled"))
                }
                Script::FinishAfterStop(output) => {
                    self.running.notify_one();
                    self.stopped.notified().await;
                    Ok(output.to_string())
                }
            }
        }

        async fn request_stop(&self) -> anyhow::Result<()> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.stop_gate {
                gate.notified().await;
            }
            if self.stop_fails {
                bail!("dial tcp 127.0.0.1:5572: connection refused");
            }
            self.stopped.notify_one();
            Ok(())
        }
    }

    fn spec() -> TransferJobSpec {
        TransferJobSpec {
            source_ref: "folder-id".into(),
            destination_path: "/music".into(),
            remote_profile_id: "gdrive".into(),
            create_subfolder: false,
            subfolder_name: String::new(),
            create_backup: true,
            explicit_file_selection: None,
            mode: TransferMode::Sync,
            delete_excluded: false,
            track_renames: false,
            bandwidth_limit: None,
        }
    }

    fn orchestrator(
        engine: Arc<ScriptedEngine>,
        recorder: Arc<Recorder>,
        events: EventBus,
    ) -> Arc<TransferOrchestrator> {
        Arc::new(TransferOrchestrator::new(
            engine,
            recorder.clone(),
            recorder,
            events,
        ))
    }

    #[tokio::test]
    async fn successful_run_records_header_and_output() {
        let recorder = Arc::new(Recorder::default());
        let engine = Arc::new(ScriptedEngine::new(Script::Succeed(
            "Transferred 42 files (1.5 MiB), deleted 0, in 3s",
        )));
        let orchestrator = orchestrator(engine, recorder.clone(), EventBus::new());

        let run = orchestrator.start(&spec()).await.expect("start");
        assert_eq!(run.status, TransferStatus::Completed);
        assert_eq!(run.status_message, "Download completed successfully.");
        assert!(!run.loading && !run.cancelling);
        assert!(run.finished_at.is_some());
        assert_eq!(
            run.log_lines,
            vec![
                "Starting download...",
                "Source: folder-id",
                "Destination: /music",
                "Remote: gdrive",
                "Backup: Yes",
                "Started rclone job 7",
                "Transferred 42 files (1.5 MiB), deleted 0, in 3s",
            ]
        );
        assert_eq!(
            recorder.calls(),
            vec!["acquire", "started", "progress 25", "completed", "release"]
        );
        assert!(!orchestrator.is_busy());
    }

    #[tokio::test]
    async fn engine_failure_is_classified() {
        let recorder = Arc::new(Recorder::default());
        let engine = Arc::new(ScriptedEngine::new(Script::Fail(
            "dial tcp: connection refused",
        )));
        let orchestrator = orchestrator(engine, recorder.clone(), EventBus::new());

        let run = orchestrator.start(&spec()).await.expect("start");
        let expected =
            "Network connection failed. Please check your internet connection and try again.";
        assert_eq!(run.status, TransferStatus::Failed);
        assert_eq!(run.status_message, "Download failed.");
        assert_eq!(
            run.log_lines.last().map(String::as_str),
            Some(format!("Error: {expected}").as_str())
        );
        assert!(recorder.calls().contains(&format!("failed {expected}")));
        assert_eq!(orchestrator.log_text(), run.log_text());
    }

    #[tokio::test]
    async fn invalid_spec_creates_no_run() {
        let engine = Arc::new(ScriptedEngine::new(Script::Succeed("")));
        let recorder = Arc::new(Recorder::default());
        let orchestrator = orchestrator(engine, recorder.clone(), EventBus::new());
        let before = orchestrator.run().id;

        let err = orchestrator
            .start(&TransferJobSpec {
                destination_path: String::new(),
                ..spec()
            })
            .await
            .expect_err("invalid");
        assert_eq!(
            err,
            SyncError::Validation(ValidationError::MissingDestination)
        );
        assert_eq!(orchestrator.run().id, before);
        assert_eq!(orchestrator.status(), TransferStatus::Idle);
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn cancel_when_idle_is_a_no_op() {
        let engine = Arc::new(ScriptedEngine::new(Script::Succeed("")));
        let orchestrator = orchestrator(
            engine.clone(),
            Arc::new(Recorder::default()),
            EventBus::new(),
        );
        assert_eq!(orchestrator.cancel().await, CancelOutcome::NotRunning);
        assert_eq!(engine.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn repeated_cancel_sends_one_stop() {
        let engine = Arc::new(ScriptedEngine::new(Script::WaitForStop));
        let orchestrator = orchestrator(
            engine.clone(),
            Arc::new(Recorder::default()),
            EventBus::new(),
        );
        let task = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.start(&spec()).await }
        });
        engine.running.notified().await;
        assert!(orchestrator.is_busy());

        let first = orchestrator.cancel().await;
        let second = orchestrator.cancel().await;
        assert_eq!(first, CancelOutcome::Requested);
        assert_eq!(second, CancelOutcome::AlreadyCancelling);

        let run = task.await.expect("join").expect("start");
        assert_eq!(engine.stops.load(Ordering::SeqCst), 1);
        assert_eq!(run.status, TransferStatus::Failed);
        assert!(run.log_lines.contains(&"Requesting cancellation...".to_string()));
        assert_eq!(
            run.log_lines.last().map(String::as_str),
            Some("Error: Download was cancelled.")
        );
        assert!(!run.cancelling && !run.loading);
    }

    #[tokio::test]
    async fn failed_stop_reverts_to_running() {
        let mut engine = ScriptedEngine::new(Script::WaitForStop);
        engine.stop_fails = true;
        let engine = Arc::new(engine);
        let orchestrator = orchestrator(
            engine.clone(),
            Arc::new(Recorder::default()),
            EventBus::new(),
        );
        let task = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.start(&spec()).await }
        });
        engine.running.notified().await;

        let outcome = orchestrator.cancel().await;
        let expected =
            "Network connection failed. Please check your internet connection and try again.";
        assert_eq!(
            outcome,
            CancelOutcome::StopFailed(SyncError::Stop {
                message: expected.to_string()
            })
        );
        let run = orchestrator.run();
        assert_eq!(run.status, TransferStatus::Running);
        assert!(!run.cancelling);
        assert_eq!(
            run.log_lines.last().map(String::as_str),
            Some(format!("Failed to stop transfer: {expected}").as_str())
        );

        engine.stopped.notify_one();
        let run = task.await.expect("join").expect("start");
        assert!(run.is_terminal());
    }

    #[tokio::test]
    async fn completion_after_cancel_request_wins() {
        let engine = Arc::new(ScriptedEngine::new(Script::FinishAfterStop(
            "Transferred 3 files (3 KiB), deleted 0, in 1s",
        )));
        let orchestrator = orchestrator(
            engine.clone(),
            Arc::new(Recorder::default()),
            EventBus::new(),
        );
        let task = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.start(&spec()).await }
        });
        engine.running.notified().await;

        assert_eq!(orchestrator.cancel().await, CancelOutcome::Requested);
        let run = task.await.expect("join").expect("start");
        assert_eq!(run.status, TransferStatus::Completed);
        assert_eq!(run.status_message, "Download completed successfully.");
        assert!(!run.cancelling && !run.loading);
        assert!(run.log_lines.contains(&"Requesting cancellation...".to_string()));
    }

    #[tokio::test]
    async fn late_stop_failure_stays_out_of_newer_run() {
        let stop_gate = Arc::new(Notify::new());
        let mut engine = ScriptedEngine::new(Script::WaitForStop);
        engine.stop_fails = true;
        engine.stop_gate = Some(Arc::clone(&stop_gate));
        let engine = Arc::new(engine);
        let orchestrator = orchestrator(
            engine.clone(),
            Arc::new(Recorder::default()),
            EventBus::new(),
        );
        let first = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.start(&spec()).await }
        });
        engine.running.notified().await;

        let cancel = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.cancel().await }
        });
        while engine.stops.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        // the first run ends before the stop request returns
        engine.stopped.notify_one();
        let first = first.await.expect("join").expect("start");
        assert!(first.is_terminal());

        let second = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.start(&spec()).await }
        });
        engine.running.notified().await;
        let second_id = orchestrator.run().id;
        assert_ne!(second_id, first.id);

        stop_gate.notify_one();
        assert!(matches!(
            cancel.await.expect("join"),
            CancelOutcome::StopFailed(SyncError::Stop { .. })
        ));
        let current = orchestrator.run();
        assert_eq!(current.id, second_id);
        assert_eq!(current.status, TransferStatus::Running);
        assert!(
            !current
                .log_lines
                .iter()
                .any(|line| line.starts_with("Failed to stop transfer"))
        );

        engine.stopped.notify_one();
        second.await.expect("join").expect("start");
    }

    #[tokio::test]
    async fn second_start_while_busy_is_refused() {
        let engine = Arc::new(ScriptedEngine::new(Script::WaitForStop));
        let orchestrator = orchestrator(
            engine.clone(),
            Arc::new(Recorder::default()),
            EventBus::new(),
        );
        let task = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.start(&spec()).await }
        });
        engine.running.notified().await;

        let err = orchestrator.start(&spec()).await.expect_err("busy");
        assert_eq!(
            err,
            SyncError::Validation(ValidationError::TransferInProgress)
        );
        engine.stopped.notify_one();
        task.await.expect("join").expect("start");
    }

    #[tokio::test]
    async fn dropped_start_clears_flags() {
        let engine = Arc::new(ScriptedEngine::new(Script::WaitForStop));
        let orchestrator = orchestrator(
            engine.clone(),
            Arc::new(Recorder::default()),
            EventBus::new(),
        );
        let task = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.start(&spec()).await }
        });
        engine.running.notified().await;
        task.abort();
        let _ = task.await;

        let run = orchestrator.run();
        assert_eq!(run.status, TransferStatus::Failed);
        assert!(!run.loading && !run.cancelling);
    }

    #[tokio::test]
    async fn log_and_status_changes_are_published() {
        let events = EventBus::new();
        let mut stream = events.subscribe(None);
        let engine = Arc::new(ScriptedEngine::new(Script::Succeed("done")));
        let orchestrator = orchestrator(engine, Arc::new(Recorder::default()), events);
        orchestrator.start(&spec()).await.expect("start");

        let kinds: Vec<&'static str> = stream
            .drain_ready()
            .iter()
            .map(|envelope| envelope.event.kind())
            .collect();
        assert_eq!(kinds.first(), Some(&"run_started"));
        assert_eq!(kinds.last(), Some(&"run_finished"));
        assert!(kinds.contains(&"progress"));
        assert_eq!(
            kinds.iter().filter(|kind| **kind == "log_appended").count(),
            7
        );
    }
}
