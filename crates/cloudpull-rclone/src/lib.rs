#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! rclone adapter driving the remote-control API and the rclone binary.

/// Interactive authorization round-trip.
pub mod authorize;
/// Spawned `rclone rcd` lifecycle.
pub mod daemon;
/// Dry-run JSON log parsing.
pub mod dryrun;
pub mod error;
/// Job spec to RC request translation.
pub mod request;
pub mod transport;

pub use daemon::RcDaemon;
pub use error::RcloneError;
pub use transport::{HttpTransport, RcTransport};

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Local;
use cloudpull_core::{
    DryRunOutcome, EngineUpdates, ProfileService, RemoteEntry, TransferEngine, TransferJobSpec,
};
use serde_json::{Value, json};
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::request::{JobRequest, dry_run_args, source_fs};

/// Static settings of the adapter.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Path of the rclone binary used for authorization and dry runs.
    pub binary: PathBuf,
    /// Name given to profiles created through authorization.
    pub default_profile_name: String,
    /// Interval between `job/status` polls.
    pub poll_interval: Duration,
}

/// Transfer engine and profile service backed by rclone.
#[derive(Clone)]
pub struct RcloneEngine {
    transport: Arc<dyn RcTransport>,
    settings: EngineSettings,
    active_job: Arc<Mutex<Option<i64>>>,
    stop_requested: Arc<AtomicBool>,
}

impl RcloneEngine {
    /// Construct an engine over the provided transport.
    #[must_use]
    pub fn new(transport: Arc<dyn RcTransport>, settings: EngineSettings) -> Self {
        Self {
            transport,
            settings,
            active_job: Arc::new(Mutex::new(None)),
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Identifier of the job currently being polled, if any.
    #[must_use]
    pub fn active_job(&self) -> Option<i64> {
        *self.lock_job()
    }

    fn lock_job(&self) -> MutexGuard<'_, Option<i64>> {
        self.active_job.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn wait_for_job(&self, jobid: i64, updates: &EngineUpdates) -> Result<(), RcloneError> {
        loop {
            let status = match self.transport.call("job/status", json!({ "jobid": jobid })).await
            {
                Ok(status) => status,
                Err(err) if err.is_job_not_found() => {
                    return Err(RcloneError::Cancelled {
                        server_stopped: false,
                    });
                }
                Err(err) if err.is_connection_failure() => {
                    return Err(RcloneError::Cancelled {
                        server_stopped: true,
                    });
                }
                Err(err) => return Err(err),
            };

            self.forward_progress(jobid, updates).await;

            if status.get("finished").and_then(Value::as_bool) == Some(true) {
                let error = status.get("error").and_then(Value::as_str).unwrap_or("");
                if error.is_empty() {
                    return Ok(());
                }
                if self.stop_requested.load(Ordering::SeqCst) || error.contains("context canceled")
                {
                    return Err(RcloneError::Cancelled {
                        server_stopped: false,
                    });
                }
                return Err(RcloneError::JobFailed {
                    message: error.to_string(),
                });
            }

            sleep(self.settings.poll_interval).await;
        }
    }

    async fn job_stats(&self, jobid: i64) -> Option<Value> {
        match self
            .transport
            .call("core/stats", json!({ "group": format!("job/{jobid}") }))
            .await
        {
            Ok(stats) => Some(stats),
            Err(err) => {
                debug!(error = %err, jobid, "core/stats unavailable");
                None
            }
        }
    }

    async fn forward_progress(&self, jobid: i64, updates: &EngineUpdates) {
        if let Some(stats) = self.job_stats(jobid).await {
            updates.progress(
                counter(&stats, "bytes"),
                counter(&stats, "totalBytes"),
                counter(&stats, "transfers"),
            );
        }
    }

    async fn summary(&self, jobid: i64) -> String {
        let Some(stats) = self.job_stats(jobid).await else {
            return "Transfer finished".to_string();
        };
        let elapsed = stats
            .get("elapsedTime")
            .and_then(Value::as_f64)
            .unwrap_or_default();
        format!(
            "Transferred {} files ({}), deleted {}, in {elapsed:.0}s",
            counter(&stats, "transfers"),
            format_bytes(counter(&stats, "bytes")),
            counter(&stats, "deletes"),
        )
    }
}

fn counter(stats: &Value, field: &str) -> u64 {
    stats.get(field).and_then(Value::as_u64).unwrap_or_default()
}

/// Human readable binary size, e.g. `1.5 MiB`.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut unit = 0;
    let mut whole = bytes;
    let mut remainder = 0;
    while whole >= 1024 && unit < UNITS.len() - 1 {
        remainder = whole % 1024;
        whole /= 1024;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{whole}.{} {}", remainder * 10 / 1024, UNITS[unit])
    }
}

#[async_trait]
impl ProfileService for RcloneEngine {
    async fn list_profiles(&self) -> Result<Vec<String>> {
        let dump = self.transport.call("config/dump", json!({})).await?;
        let mut remotes: Vec<String> = dump
            .as_object()
            .map(|remotes| {
                remotes
                    .iter()
                    .filter(|(_, remote)| {
                        remote.get("type").and_then(Value::as_str) == Some("drive")
                    })
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default();
        remotes.sort();
        Ok(remotes)
    }

    async fn create_profile(&self) -> Result<String> {
        let token = authorize::authorize_drive(&self.settings.binary).await?;
        let name = self.settings.default_profile_name.clone();
        self.transport
            .call(
                "config/create",
                json!({
                    "name": name,
                    "type": "drive",
                    "parameters": { "token": token },
                    "opt": { "nonInteractive": true },
                }),
            )
            .await?;
        info!(profile = %name, "created rclone profile");
        Ok(name)
    }
}

#[async_trait]
impl TransferEngine for RcloneEngine {
    async fn probe_dry_run(&self, spec: &TransferJobSpec) -> Result<DryRunOutcome> {
        let output = Command::new(&self.settings.binary)
            .args(dry_run_args(spec))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| RcloneError::Spawn {
                operation: "dry run",
                source,
            })?;
        if !output.status.success() {
            return Err(RcloneError::ProcessFailed {
                operation: "dry run",
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        // rclone writes its log to stderr.
        let mut log = String::from_utf8_lossy(&output.stderr).into_owned();
        log.push('\n');
        log.push_str(&String::from_utf8_lossy(&output.stdout));
        Ok(dryrun::parse_dry_run_log(&log))
    }

    async fn run_transfer(&self, spec: &TransferJobSpec, updates: EngineUpdates) -> Result<String> {
        let request = JobRequest::build(spec, Local::now())?;
        self.stop_requested.store(false, Ordering::SeqCst);

        let started = self.transport.call(request.method, request.body).await?;
        let jobid = started
            .get("jobid")
            .and_then(Value::as_i64)
            .ok_or(RcloneError::MissingField {
                method: request.method,
                field: "jobid",
            })?;
        *self.lock_job() = Some(jobid);
        info!(jobid, method = request.method, "rclone job started");
        updates.log(format!("Started rclone job {jobid}"));

        let outcome = self.wait_for_job(jobid, &updates).await;
        let result = match outcome {
            Ok(()) => Ok(self.summary(jobid).await),
            Err(err) => {
                warn!(jobid, error = %err, "rclone job did not complete");
                Err(err.into())
            }
        };
        *self.lock_job() = None;
        result
    }

    async fn request_stop(&self) -> Result<()> {
        let jobid = self.active_job().ok_or(RcloneError::NoActiveJob)?;
        self.stop_requested.store(true, Ordering::SeqCst);
        self.transport
            .call("job/stop", json!({ "jobid": jobid }))
            .await?;
        info!(jobid, "rclone job stop requested");
        Ok(())
    }

    async fn list_files(
        &self,
        profile: &str,
        source_ref: &str,
        path: &str,
    ) -> Result<Vec<RemoteEntry>> {
        let response = self
            .transport
            .call(
                "operations/list",
                json!({ "fs": source_fs(profile, source_ref), "remote": path }),
            )
            .await?;
        let entries = response
            .get("list")
            .and_then(Value::as_array)
            .ok_or(RcloneError::MissingField {
                method: "operations/list",
                field: "list",
            })?;
        Ok(entries
            .iter()
            .map(|entry| {
                let is_dir = entry.get("IsDir").and_then(Value::as_bool).unwrap_or(false);
                RemoteEntry {
                    name: text(entry, "Name"),
                    path: text(entry, "Path"),
                    is_dir,
                    size: if is_dir {
                        None
                    } else {
                        entry.get("Size").and_then(Value::as_u64)
                    },
                }
            })
            .collect())
    }
}

fn text(entry: &Value, field: &str) -> String {
    entry
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
