//! Data transfer objects shared by the orchestration core and engine adapters.

use std::fmt;

use chrono::{DateTime, Utc};
use cloudpull_events::RunState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Lifecycle status of a transfer run.
pub type TransferStatus = RunState;

/// Named, reusable credential/configuration bundle for reaching a remote store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RemoteProfile {
    /// Unique, stable identifier of the profile.
    pub id: String,
}

impl RemoteProfile {
    /// Construct a profile from its identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Current choice in the profile selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ProfileSelection {
    /// An existing profile identifier.
    Selected(String),
    /// Explicit "no profile / create new" choice.
    CreateNew,
}

impl ProfileSelection {
    /// Identifier of the selected profile, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Selected(id) => Some(id.as_str()),
            Self::CreateNew => None,
        }
    }
}

/// How the destination is reconciled with the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    /// Mirror the source, deleting destination files that no longer exist remotely.
    #[default]
    Sync,
    /// Copy new and changed files only.
    Copy,
}

/// Unit applied to a bandwidth limit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BandwidthUnit {
    /// Kibibytes per second.
    #[serde(rename = "K")]
    Kilo,
    /// Mebibytes per second.
    #[default]
    #[serde(rename = "M")]
    Mega,
}

impl BandwidthUnit {
    /// Suffix understood by the transfer engine.
    #[must_use]
    pub const fn suffix(self) -> char {
        match self {
            Self::Kilo => 'K',
            Self::Mega => 'M',
        }
    }
}

/// Bandwidth cap applied to a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandwidthLimit {
    /// Numeric limit, always positive.
    pub value: u32,
    /// Unit of `value`.
    pub unit: BandwidthUnit,
}

impl BandwidthLimit {
    /// Parse a limit such as `10M` or `512K`. A bare number is read as mebibytes.
    ///
    /// Returns `None` for zero, empty, or malformed input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (digits, unit) = match raw.chars().last()? {
            'k' | 'K' => (&raw[..raw.len() - 1], BandwidthUnit::Kilo),
            'm' | 'M' => (&raw[..raw.len() - 1], BandwidthUnit::Mega),
            _ => (raw, BandwidthUnit::Mega),
        };
        let value = digits.trim().parse::<u32>().ok()?;
        (value > 0).then_some(Self { value, unit })
    }
}

impl fmt::Display for BandwidthLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

/// Parameters of one download/sync job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferJobSpec {
    /// Remote folder identifier or share URL.
    pub source_ref: String,
    /// Local destination directory.
    pub destination_path: String,
    /// Remote profile used to reach the source.
    pub remote_profile_id: String,
    /// Whether to nest the files inside `subfolder_name`.
    pub create_subfolder: bool,
    /// Name of the nested folder used when `create_subfolder` is set.
    pub subfolder_name: String,
    /// Whether files that would be overwritten or deleted are preserved first.
    pub create_backup: bool,
    /// Restrict the transfer to these top-level entries; `None` transfers everything.
    pub explicit_file_selection: Option<Vec<String>>,
    /// Sync or copy semantics.
    pub mode: TransferMode,
    /// Delete destination files excluded by the selection filter.
    pub delete_excluded: bool,
    /// Detect renamed files instead of re-downloading them.
    pub track_renames: bool,
    /// Optional bandwidth cap.
    pub bandwidth_limit: Option<BandwidthLimit>,
}

impl TransferJobSpec {
    /// A job is valid only when source, destination and profile are all non-empty.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Report the first missing field.
    ///
    /// # Errors
    ///
    /// Returns the `ValidationError` naming the missing source, destination or profile.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.remote_profile_id.trim().is_empty() {
            return Err(ValidationError::MissingProfile);
        }
        if self.source_ref.trim().is_empty() {
            return Err(ValidationError::MissingSource);
        }
        if self.destination_path.trim().is_empty() {
            return Err(ValidationError::MissingDestination);
        }
        Ok(())
    }
}

/// Result of a non-mutating simulation of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DryRunOutcome {
    /// Whether the simulated run would delete any destination file.
    pub would_delete: bool,
    /// Destination paths the simulated run would delete, in reported order.
    pub deleted_paths: Vec<String>,
    /// Short human readable summary of the simulated run.
    pub stats_summary: String,
}

/// One execution of a transfer job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRun {
    /// Identifier of the run.
    pub id: Uuid,
    /// Current lifecycle status.
    pub status: TransferStatus,
    /// Append-only log of the run.
    pub log_lines: Vec<String>,
    /// Latest human readable status text.
    pub status_message: String,
    /// Set while the engine is working on the job.
    pub loading: bool,
    /// Set while a stop request is outstanding.
    pub cancelling: bool,
    /// Creation timestamp.
    pub started_at: DateTime<Utc>,
    /// Timestamp of the terminal transition.
    pub finished_at: Option<DateTime<Utc>>,
}

impl TransferRun {
    /// Construct an idle run with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: TransferStatus::Idle,
            log_lines: Vec::new(),
            status_message: String::new(),
            loading: false,
            cancelling: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Whether the run has reached `Completed` or `Failed`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The log joined with newlines.
    #[must_use]
    pub fn log_text(&self) -> String {
        self.log_lines.join("\n")
    }
}

impl Default for TransferRun {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry of a remote folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Entry name.
    pub name: String,
    /// Path relative to the listed folder.
    pub path: String,
    /// Whether the entry is a folder.
    pub is_dir: bool,
    /// Size in bytes, `None` for folders.
    pub size: Option<u64>,
}

/// Incremental output emitted by an engine while a transfer runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineUpdate {
    /// A textual line to append to the run log.
    Log(String),
    /// Progress counters.
    Progress {
        /// Bytes transferred so far.
        bytes: u64,
        /// Expected total in bytes, zero when unknown.
        total_bytes: u64,
        /// Files fully transferred so far.
        transfers: u64,
    },
}

/// Integer percentage, clamped to `0..=100`.
#[must_use]
pub fn percent(bytes: u64, total_bytes: u64) -> u8 {
    if total_bytes == 0 {
        return 0;
    }
    let scaled = u128::from(bytes) * 100 / u128::from(total_bytes);
    u8::try_from(scaled.min(100)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> TransferJobSpec {
        TransferJobSpec {
            source_ref: "abc".into(),
            destination_path: "/data".into(),
            remote_profile_id: "gdrive".into(),
            create_subfolder: true,
            subfolder_name: "Archive".into(),
            create_backup: true,
            explicit_file_selection: None,
            mode: TransferMode::Sync,
            delete_excluded: false,
            track_renames: false,
            bandwidth_limit: None,
        }
    }

    #[test]
    fn job_validity_requires_all_three_fields() {
        assert!(spec().is_valid());
        assert!(
            !TransferJobSpec {
                source_ref: String::new(),
                ..spec()
            }
            .is_valid()
        );
        assert!(
            !TransferJobSpec {
                destination_path: "  ".into(),
                ..spec()
            }
            .is_valid()
        );
        assert!(
            !TransferJobSpec {
                remote_profile_id: String::new(),
                ..spec()
            }
            .is_valid()
        );
    }

    #[test]
    fn validate_names_missing_field() {
        assert_eq!(
            TransferJobSpec {
                remote_profile_id: String::new(),
                source_ref: String::new(),
                ..spec()
            }
            .validate(),
            Err(ValidationError::MissingProfile)
        );
        assert_eq!(
            TransferJobSpec {
                destination_path: String::new(),
                ..spec()
            }
            .validate(),
            Err(ValidationError::MissingDestination)
        );
    }

    #[test]
    fn bandwidth_limit_parsing() {
        assert_eq!(
            BandwidthLimit::parse("10M"),
            Some(BandwidthLimit {
                value: 10,
                unit: BandwidthUnit::Mega
            })
        );
        assert_eq!(
            BandwidthLimit::parse("512k").map(|limit| limit.to_string()),
            Some("512K".to_string())
        );
        assert_eq!(BandwidthLimit::parse("7").map(|l| l.unit), Some(BandwidthUnit::Mega));
        assert_eq!(BandwidthLimit::parse("0M"), None);
        assert_eq!(BandwidthLimit::parse(""), None);
        assert_eq!(BandwidthLimit::parse("fastM"), None);
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(50, 200), 25);
        assert_eq!(percent(500, 200), 100);
    }

    #[test]
    fn selection_id_projection() {
        assert_eq!(ProfileSelection::Selected("x".into()).id(), Some("x"));
        assert_eq!(ProfileSelection::CreateNew.id(), None);
    }

    #[test]
    fn new_run_is_idle() {
        let run = TransferRun::new();
        assert_eq!(run.status, TransferStatus::Idle);
        assert!(!run.loading && !run.cancelling);
        assert!(run.log_text().is_empty());
    }
}
