//! Editable transfer parameters.

use cloudpull_config::DownloadDefaults;
use cloudpull_core::{BandwidthLimit, TransferJobSpec, TransferMode, ValidationError};

/// Job parameters as edited by the user, before a profile is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferParams {
    source: String,
    destination: String,
    create_subfolder: bool,
    subfolder_name: String,
    create_backup: bool,
    selection: Option<Vec<String>>,
    mode: TransferMode,
    delete_excluded: bool,
    track_renames: bool,
    bandwidth_limit: Option<BandwidthLimit>,
}

impl TransferParams {
    /// Seed the parameters from persisted defaults.
    #[must_use]
    pub fn from_defaults(defaults: &DownloadDefaults) -> Self {
        Self {
            source: defaults.source.clone(),
            destination: defaults.destination.clone().unwrap_or_default(),
            create_subfolder: defaults.create_subfolder,
            subfolder_name: defaults.subfolder_name.clone(),
            create_backup: defaults.create_backup,
            selection: None,
            mode: defaults.mode,
            delete_excluded: defaults.delete_excluded,
            track_renames: defaults.track_renames,
            bandwidth_limit: defaults
                .bandwidth_limit
                .as_deref()
                .and_then(BandwidthLimit::parse),
        }
    }

    /// Remote folder id or share URL.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = source.into();
    }

    /// Local destination directory.
    pub fn set_destination(&mut self, destination: impl Into<String>) {
        self.destination = destination.into();
    }

    /// Toggle nesting into the subfolder.
    pub const fn set_create_subfolder(&mut self, enabled: bool) {
        self.create_subfolder = enabled;
    }

    /// Rename the nested subfolder.
    pub fn set_subfolder_name(&mut self, name: impl Into<String>) {
        self.subfolder_name = name.into();
    }

    /// Toggle backup protection.
    pub const fn set_create_backup(&mut self, enabled: bool) {
        self.create_backup = enabled;
    }

    /// Restrict the transfer to top-level entries; `None` transfers everything.
    pub fn set_selection(&mut self, selection: Option<Vec<String>>) {
        self.selection = selection;
    }

    /// Sync or copy.
    pub const fn set_mode(&mut self, mode: TransferMode) {
        self.mode = mode;
    }

    /// Toggle deletion of excluded destination files.
    pub const fn set_delete_excluded(&mut self, enabled: bool) {
        self.delete_excluded = enabled;
    }

    /// Toggle rename tracking.
    pub const fn set_track_renames(&mut self, enabled: bool) {
        self.track_renames = enabled;
    }

    /// Cap bandwidth; `None` is unlimited.
    pub const fn set_bandwidth_limit(&mut self, limit: Option<BandwidthLimit>) {
        self.bandwidth_limit = limit;
    }

    /// Current source.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Current destination.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Whether backups are enabled.
    #[must_use]
    pub const fn create_backup(&self) -> bool {
        self.create_backup
    }

    /// Whether the parameters can be submitted given the profile selection validity.
    #[must_use]
    pub fn is_valid(&self, profile_valid: bool) -> bool {
        self.validate(profile_valid).is_ok()
    }

    /// First reason the parameters cannot be submitted.
    ///
    /// # Errors
    ///
    /// Returns the `ValidationError` for the missing profile, source or destination.
    pub fn validate(&self, profile_valid: bool) -> Result<(), ValidationError> {
        if !profile_valid {
            return Err(ValidationError::MissingProfile);
        }
        if self.source.trim().is_empty() {
            return Err(ValidationError::MissingSource);
        }
        if self.destination.trim().is_empty() {
            return Err(ValidationError::MissingDestination);
        }
        Ok(())
    }

    /// Snapshot the parameters as a job for `profile_id`.
    #[must_use]
    pub fn to_spec(&self, profile_id: &str) -> TransferJobSpec {
        TransferJobSpec {
            source_ref: self.source.trim().to_string(),
            destination_path: self.destination.trim().to_string(),
            remote_profile_id: profile_id.to_string(),
            create_subfolder: self.create_subfolder,
            subfolder_name: self.subfolder_name.clone(),
            create_backup: self.create_backup,
            explicit_file_selection: self.selection.clone(),
            mode: self.mode,
            delete_excluded: self.delete_excluded,
            track_renames: self.track_renames,
            bandwidth_limit: self.bandwidth_limit,
        }
    }
}
