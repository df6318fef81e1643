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

//! File-backed application configuration.
//!
//! Layout: `model.rs` (typed document with per-section defaults), `validate.rs`
//! (validation and dotted-key editing), `loader.rs` (`ConfigStore`).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigStore, default_path};
pub use model::{
    AppConfig, DownloadDefaults, LogFormatSetting, LoggingSection, NetworkConfig, RcloneConfig,
};
pub use validate::{apply_setting, validate};
