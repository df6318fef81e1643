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

//! Engine-agnostic transfer interfaces, DTOs and error classification.
//!
//! Layout: `model/` (profiles, jobs, runs), `service/` (collaborator traits),
//! `classify.rs` (raw failure text to user-facing messages), `error.rs`.

pub mod classify;
pub mod error;
pub mod model;
pub mod service;

pub use classify::{ErrorKind, classify};
pub use error::{SyncError, SyncResult, ValidationError};
pub use model::{
    BandwidthLimit, BandwidthUnit, DryRunOutcome, EngineUpdate, ProfileSelection, RemoteEntry,
    RemoteProfile, TransferJobSpec, TransferMode, TransferRun, TransferStatus, percent,
};
pub use service::{EngineUpdates, Notifier, ProfileService, TransferEngine, WakeLock};
