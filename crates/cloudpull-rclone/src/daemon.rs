//! Lifecycle of a locally spawned `rclone rcd` process.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::json;
use tokio::process::{Child, Command};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::RcloneError;
use crate::transport::{HttpTransport, RcTransport};

const READY_ATTEMPTS: u32 = 50;
const READY_DELAY: Duration = Duration::from_millis(100);

/// Running RC daemon; the process is killed when the handle is dropped.
pub struct RcDaemon {
    child: Child,
    transport: HttpTransport,
}

impl RcDaemon {
    /// Launch `rclone rcd` on `addr` and wait until it answers `rc/noop`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started or never becomes ready.
    pub async fn spawn(binary: &Path, addr: &str, timeout: Duration) -> Result<Self, RcloneError> {
        info!(binary = %binary.display(), addr, "starting rclone daemon");
        let mut child = Command::new(binary)
            .args(["rcd", "--rc-no-auth", "--rc-addr", addr])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RcloneError::Spawn {
                operation: "rcd",
                source,
            })?;

        let transport = HttpTransport::new(format!("http://{addr}"), timeout)?;
        for attempt in 0..READY_ATTEMPTS {
            match transport.call("rc/noop", json!({})).await {
                Ok(_) => {
                    debug!(attempt, "rclone daemon ready");
                    return Ok(Self { child, transport });
                }
                Err(err) if err.is_connection_failure() => sleep(READY_DELAY).await,
                Err(err) => {
                    warn!(error = %err, "rclone daemon answered with an error");
                    sleep(READY_DELAY).await;
                }
            }
            if let Ok(Some(status)) = child.try_wait() {
                warn!(%status, "rclone daemon exited during startup");
                break;
            }
        }

        let _ = child.start_kill();
        Err(RcloneError::DaemonUnavailable {
            addr: addr.to_string(),
        })
    }

    /// Transport bound to the daemon.
    #[must_use]
    pub fn transport(&self) -> HttpTransport {
        self.transport.clone()
    }

    /// Terminate the daemon and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Err(err) = self.child.kill().await {
            warn!(error = %err, "failed to stop rclone daemon");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let result = RcDaemon::spawn(
            Path::new("/nonexistent/rclone-binary"),
            "127.0.0.1:5999",
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(RcloneError::Spawn { .. })));
    }
}
