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

//! Download session wiring on top of the transfer core.
//!
//! Layout: `profiles.rs` (profile set and selection), `params.rs` (editable
//! job parameters), `gate.rs` (confirmation for unprotected syncs),
//! `orchestrator.rs` (run lifecycle and live log), `session.rs` (the
//! front-end facade), `platform.rs` (notifier and wake lock),
//! `bootstrap.rs` (config to backend wiring).

/// Config to backend wiring.
pub mod bootstrap;
pub mod error;
/// Confirmation gate for unprotected syncs.
pub mod gate;
/// Run lifecycle and live log.
pub mod orchestrator;
/// Editable job parameters.
pub mod params;
/// Host notifier and wake lock.
pub mod platform;
/// Remote profile set and selection.
pub mod profiles;
/// Front-end facade.
pub mod session;

pub use bootstrap::{Backend, logging_config};
pub use error::{AppError, AppResult};
pub use gate::{ConfirmationPrompt, GateDecision, GateState, PromptKind, SafetyGate};
pub use orchestrator::{CancelOutcome, TransferOrchestrator};
pub use params::TransferParams;
pub use platform::{InhibitWakeLock, NoopWakeLock, TracingNotifier};
pub use profiles::ProfileManager;
pub use session::{DownloadSession, SessionDeps, SessionError, SubmitOutcome};
