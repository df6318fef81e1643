//! Translation of a [`TransferJobSpec`] into rclone RC requests and CLI arguments.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use cloudpull_core::{TransferJobSpec, TransferMode};
use serde_json::{Map, Value, json};

use crate::error::RcloneError;

/// Include rule that matches nothing, used when the selection is explicitly empty.
pub const EMPTY_SELECTION_MARKER: &str = "non_existent_file_marker";

/// Prefix of the backup directory created next to the destination.
pub const BACKUP_PREFIX: &str = "Backup-";

/// Extract a folder id from a share URL (`…/folders/<id>?…`), an `id=` query or a raw id.
#[must_use]
pub fn parse_source_id(source: &str) -> String {
    let source = source.trim();
    if let Some((_, rest)) = source.split_once("/folders/") {
        let end = rest.find(['/', '?']).unwrap_or(rest.len());
        return rest[..end].to_string();
    }
    if let Some((_, rest)) = source.split_once("id=") {
        let end = rest.find('&').unwrap_or(rest.len());
        return rest[..end].to_string();
    }
    source.to_string()
}

/// Remote fs string rooted at the source folder.
#[must_use]
pub fn source_fs(profile: &str, source_ref: &str) -> String {
    format!("{profile},root_folder_id={}:", parse_source_id(source_ref))
}

/// Effective local destination, nesting the subfolder unless the path already ends with it.
#[must_use]
pub fn destination_path(spec: &TransferJobSpec) -> PathBuf {
    let mut path = PathBuf::from(spec.destination_path.trim());
    let subfolder = spec.subfolder_name.trim();
    if spec.create_subfolder && !subfolder.is_empty() {
        let already_nested = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name == subfolder);
        if !already_nested {
            path.push(subfolder);
        }
    }
    path
}

/// Timestamped backup directory placed beside `destination`.
///
/// # Errors
///
/// Returns an error when the destination has no parent directory.
pub fn backup_dir(destination: &Path, now: DateTime<Local>) -> Result<PathBuf, RcloneError> {
    let parent = destination
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .ok_or(RcloneError::InvalidInput {
            field: "destination_path",
            reason: "destination has no parent directory for backups",
        })?;
    Ok(parent.join(format!(
        "{BACKUP_PREFIX}{}",
        now.format("%Y%m%d_%H%M%S")
    )))
}

/// Include rules for an explicit selection; `None` when everything is transferred.
#[must_use]
pub fn include_rules(selection: Option<&[String]>) -> Option<Vec<String>> {
    let selection = selection?;
    if selection.is_empty() {
        return Some(vec![EMPTY_SELECTION_MARKER.to_string()]);
    }
    Some(
        selection
            .iter()
            .flat_map(|entry| {
                let entry = entry.trim_start_matches('/');
                [format!("/{entry}"), format!("/{entry}/**")]
            })
            .collect(),
    )
}

/// RC method and body that start an asynchronous transfer job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    /// RC method, `sync/sync` or `sync/copy`.
    pub method: &'static str,
    /// JSON body posted to the method.
    pub body: Value,
}

impl JobRequest {
    /// Build the request for `spec`, stamping the backup directory with `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if a backup is requested for a destination without a parent.
    pub fn build(spec: &TransferJobSpec, now: DateTime<Local>) -> Result<Self, RcloneError> {
        let destination = destination_path(spec);
        let mut body = json!({
            "_async": true,
            "srcFs": source_fs(&spec.remote_profile_id, &spec.source_ref),
            "dstFs": destination.to_string_lossy(),
        });

        let mut config = Map::new();
        if spec.create_backup {
            let backup = backup_dir(&destination, now)?;
            config.insert(
                "BackupDir".into(),
                Value::String(backup.to_string_lossy().into_owned()),
            );
        }
        if let Some(limit) = spec.bandwidth_limit {
            config.insert("BwLimit".into(), Value::String(limit.to_string()));
        }
        if spec.track_renames {
            config.insert("TrackRenames".into(), Value::Bool(true));
        }
        if !config.is_empty() {
            body["_config"] = Value::Object(config);
        }

        let mut filter = Map::new();
        if let Some(rules) = include_rules(spec.explicit_file_selection.as_deref()) {
            filter.insert("IncludeRule".into(), json!(rules));
        }
        if spec.delete_excluded {
            filter.insert("DeleteExcluded".into(), Value::Bool(true));
        }
        if !filter.is_empty() {
            body["_filter"] = Value::Object(filter);
        }

        Ok(Self {
            method: rc_method(spec.mode),
            body,
        })
    }
}

const fn rc_method(mode: TransferMode) -> &'static str {
    match mode {
        TransferMode::Sync => "sync/sync",
        TransferMode::Copy => "sync/copy",
    }
}

/// Arguments for `rclone <mode> --dry-run` reporting through the JSON log.
#[must_use]
pub fn dry_run_args(spec: &TransferJobSpec) -> Vec<String> {
    let mode = match spec.mode {
        TransferMode::Sync => "sync",
        TransferMode::Copy => "copy",
    };
    let mut args = vec![
        mode.to_string(),
        source_fs(&spec.remote_profile_id, &spec.source_ref),
        destination_path(spec).to_string_lossy().into_owned(),
        "--dry-run".to_string(),
        "--use-json-log".to_string(),
        "--log-level".to_string(),
        "NOTICE".to_string(),
    ];
    if let Some(rules) = include_rules(spec.explicit_file_selection.as_deref()) {
        for rule in rules {
            args.push("--include".to_string());
            args.push(rule);
        }
    }
    if spec.delete_excluded {
        args.push("--delete-excluded".to_string());
    }
    if spec.track_renames {
        args.push("--track-renames".to_string());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cloudpull_core::{BandwidthLimit, BandwidthUnit};

    fn spec() -> TransferJobSpec {
        TransferJobSpec {
            source_ref: "https://drive.google.com/drive/folders/abc123?usp=sharing".into(),
            destination_path: "/music".into(),
            remote_profile_id: "gdrive".into(),
            create_subfolder: true,
            subfolder_name: "Archive".into(),
            create_backup: false,
            explicit_file_selection: None,
            mode: TransferMode::Sync,
            delete_excluded: false,
            track_renames: false,
            bandwidth_limit: None,
        }
    }

    fn fixed_now() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .single()
            .expect("unambiguous local time")
    }

    #[test]
    fn source_id_forms() {
        assert_eq!(
            parse_source_id("https://drive.google.com/drive/folders/abc123?usp=sharing"),
            "abc123"
        );
        assert_eq!(
            parse_source_id("https://drive.google.com/drive/u/0/folders/xyz/view"),
            "xyz"
        );
        assert_eq!(
            parse_source_id("https://drive.google.com/open?id=q1w2&authuser=0"),
            "q1w2"
        );
        assert_eq!(parse_source_id("  1B1VaWp-raw  "), "1B1VaWp-raw");
        assert_eq!(source_fs("gdrive", "id=zz"), "gdrive,root_folder_id=zz:");
    }

    #[test]
    fn destination_nests_subfolder_once() {
        assert_eq!(destination_path(&spec()), PathBuf::from("/music/Archive"));
        let nested = TransferJobSpec {
            destination_path: "/music/Archive/".into(),
            ..spec()
        };
        assert_eq!(destination_path(&nested), PathBuf::from("/music/Archive/"));
        let flat = TransferJobSpec {
            create_subfolder: false,
            ..spec()
        };
        assert_eq!(destination_path(&flat), PathBuf::from("/music"));
    }

    #[test]
    fn backup_dir_is_timestamped_sibling() {
        let dir = backup_dir(Path::new("/music/Archive"), fixed_now()).expect("backup dir");
        assert_eq!(dir, PathBuf::from("/music/Backup-20240309_140507"));
        assert!(backup_dir(Path::new("Archive"), fixed_now()).is_err());
    }

    #[test]
    fn include_rules_cover_selection() {
        assert_eq!(include_rules(None), None);
        assert_eq!(
            include_rules(Some(&[])),
            Some(vec![EMPTY_SELECTION_MARKER.to_string()])
        );
        assert_eq!(
            include_rules(Some(&["/Album".to_string(), "b.mp3".to_string()])),
            Some(vec![
                "/Album".to_string(),
                "/Album/**".to_string(),
                "/b.mp3".to_string(),
                "/b.mp3/**".to_string(),
            ])
        );
    }

    #[test]
    fn minimal_request_body() {
        let request = JobRequest::build(&spec(), fixed_now()).expect("request");
        assert_eq!(request.method, "sync/sync");
        assert_eq!(
            request.body,
            json!({
                "_async": true,
                "srcFs": "gdrive,root_folder_id=abc123:",
                "dstFs": "/music/Archive",
            })
        );
    }

    #[test]
    fn full_request_body() {
        let full = TransferJobSpec {
            create_backup: true,
            explicit_file_selection: Some(vec!["Album".into()]),
            mode: TransferMode::Copy,
            delete_excluded: true,
            track_renames: true,
            bandwidth_limit: Some(BandwidthLimit {
                value: 512,
                unit: BandwidthUnit::Kilo,
            }),
            ..spec()
        };
        let request = JobRequest::build(&full, fixed_now()).expect("request");
        assert_eq!(request.method, "sync/copy");
        assert_eq!(
            request.body["_config"],
            json!({
                "BackupDir": "/music/Backup-20240309_140507",
                "BwLimit": "512K",
                "TrackRenames": true,
            })
        );
        assert_eq!(
            request.body["_filter"],
            json!({
                "IncludeRule": ["/Album", "/Album/**"],
                "DeleteExcluded": true,
            })
        );
    }

    #[test]
    fn dry_run_arguments() {
        let job = TransferJobSpec {
            explicit_file_selection: Some(vec![]),
            track_renames: true,
            ..spec()
        };
        let args = dry_run_args(&job);
        assert_eq!(
            args,
            vec![
                "sync",
                "gdrive,root_folder_id=abc123:",
                "/music/Archive",
                "--dry-run",
                "--use-json-log",
                "--log-level",
                "NOTICE",
                "--include",
                EMPTY_SELECTION_MARKER,
                "--track-renames",
            ]
        );
    }
}
