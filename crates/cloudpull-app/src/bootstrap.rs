//! Wiring from a loaded configuration to a ready download session.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cloudpull_config::{AppConfig, LogFormatSetting, LoggingSection};
use cloudpull_core::WakeLock;
use cloudpull_events::EventBus;
use cloudpull_rclone::{EngineSettings, HttpTransport, RcDaemon, RcTransport, RcloneEngine};
use cloudpull_telemetry::{LogFormat, LoggingConfig, build_sha};
use serde_json::json;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::platform::{InhibitWakeLock, NoopWakeLock, TracingNotifier};
use crate::session::{DownloadSession, SessionDeps};

/// Translate the persisted logging section into subscriber settings.
#[must_use]
pub fn logging_config(section: &LoggingSection) -> LoggingConfig<'_> {
    LoggingConfig {
        level: &section.level,
        format: match section.format {
            LogFormatSetting::Pretty => LogFormat::Pretty,
            LogFormatSetting::Json => LogFormat::Json,
        },
        build_sha: build_sha(),
    }
}

fn wake_lock(config: &AppConfig) -> Arc<dyn WakeLock> {
    if config.download.prevent_sleep {
        Arc::new(InhibitWakeLock::new())
    } else {
        Arc::new(NoopWakeLock)
    }
}

/// Connected rclone backend; owns the spawned daemon, if any.
pub struct Backend {
    engine: Arc<RcloneEngine>,
    daemon: Option<RcDaemon>,
}

impl Backend {
    /// Reach the RC server described by `config`, spawning one when allowed
    /// and nothing answers on the configured address.
    ///
    /// # Errors
    ///
    /// Returns an error when the transport cannot be built or the daemon never becomes ready.
    pub async fn connect(config: &AppConfig) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.network.request_timeout_secs);
        let addr = config.network.rc_addr.as_str();
        let binary = PathBuf::from(&config.rclone.binary);

        let existing = HttpTransport::new(format!("http://{addr}"), timeout)
            .map_err(|err| AppError::rclone("rclone.transport", err))?;
        let (transport, daemon) = if existing.call("rc/noop", json!({})).await.is_ok() {
            info!(addr, "using running rclone rc server");
            (existing, None)
        } else if config.rclone.spawn_daemon {
            let daemon = RcDaemon::spawn(&binary, addr, timeout)
                .await
                .map_err(|err| AppError::rclone("rclone.daemon", err))?;
            (daemon.transport(), Some(daemon))
        } else {
            info!(addr, "rclone rc server not answering; continuing without spawning");
            (existing, None)
        };

        let settings = EngineSettings {
            binary,
            default_profile_name: config.download.profile.clone(),
            poll_interval: Duration::from_millis(config.network.poll_interval_ms),
        };
        let engine = RcloneEngine::new(Arc::new(transport), settings);
        Ok(Self {
            engine: Arc::new(engine),
            daemon,
        })
    }

    /// Build a session over this backend.
    #[must_use]
    pub fn session(&self, config: &AppConfig, events: EventBus) -> DownloadSession {
        DownloadSession::new(
            SessionDeps {
                profiles: self.engine.clone(),
                engine: self.engine.clone(),
                notifier: Arc::new(TracingNotifier),
                wake_lock: wake_lock(config),
                events,
            },
            &config.download,
        )
    }

    /// Stop the owned daemon, if any.
    pub async fn shutdown(self) {
        if let Some(daemon) = self.daemon {
            daemon.shutdown().await;
        }
    }
}
