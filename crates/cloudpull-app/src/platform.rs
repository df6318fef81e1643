//! Host integrations: notifications and sleep inhibition.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use cloudpull_core::{Notifier, WakeLock};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};

/// Notifier that reports through the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn started(&self) {
        info!(target: "cloudpull::notify", "download started");
    }

    async fn progress(&self, percent: u8) {
        info!(target: "cloudpull::notify", percent, "download progress");
    }

    async fn completed(&self) {
        info!(target: "cloudpull::notify", "download completed");
    }

    async fn failed(&self, message: &str) {
        warn!(target: "cloudpull::notify", message, "download failed");
    }
}

const RELEASE_GRACE: Duration = Duration::from_secs(2);

/// Wake lock that holds a `systemd-inhibit` child for the duration of a run.
///
/// The inhibited command is `cat` reading a pipe we own, so closing stdin
/// lets the inhibitor exit on its own.
pub struct InhibitWakeLock {
    binary: PathBuf,
    child: Mutex<Option<Child>>,
}

impl InhibitWakeLock {
    /// Use `systemd-inhibit` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_binary("systemd-inhibit")
    }

    /// Use an explicit inhibitor binary.
    #[must_use]
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            child: Mutex::new(None),
        }
    }
}

impl Default for InhibitWakeLock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WakeLock for InhibitWakeLock {
    async fn acquire(&self) -> Result<()> {
        let mut slot = self.child.lock().await;
        if slot.is_some() {
            return Ok(());
        }
        let child = Command::new(&self.binary)
            .args([
                "--what=sleep:idle",
                "--who=cloudpull",
                "--why=Download in progress",
                "cat",
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to launch {}", self.binary.display()))?;
        *slot = Some(child);
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        let child = self.child.lock().await.take();
        if let Some(mut child) = child {
            drop(child.stdin.take());
            if timeout(RELEASE_GRACE, child.wait()).await.is_err() {
                child
                    .kill()
                    .await
                    .context("failed to stop sleep inhibitor")?;
            }
        }
        Ok(())
    }
}

/// Wake lock for hosts without an inhibitor.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWakeLock;

#[async_trait]
impl WakeLock for NoopWakeLock {
    async fn acquire(&self) -> Result<()> {
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        Ok(())
    }
}
