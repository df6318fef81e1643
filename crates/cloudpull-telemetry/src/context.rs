//! Span helpers for the process and for individual transfer runs.
//!
//! # Design
//! - Provides an application-level span guard so top-level spans carry command/build info.
//! - Keeps the active run identifier in task-local storage for nested log records.

use std::future::Future;
use std::sync::Arc;

use tracing::{Instrument, Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    #[must_use]
    /// Enter the application-level tracing span for the lifetime of the guard.
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("app", command = %command, build_sha = %build_sha()),
        ));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

tokio::task_local! {
    static ACTIVE_RUN: Arc<str>;
}

/// Execute `fut` inside a `run` span, exposing `run_id` to [`current_run_id`].
pub async fn with_run_context<Fut, T>(run_id: impl Into<String>, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    let run_id: Arc<str> = Arc::from(run_id.into());
    let span = tracing::info_span!("run", run_id = %run_id);
    ACTIVE_RUN.scope(run_id, fut.instrument(span)).await
}

/// Identifier of the run executing on the current task, if any.
#[must_use]
pub fn current_run_id() -> Option<String> {
    ACTIVE_RUN.try_with(ToString::to_string).ok()
}
