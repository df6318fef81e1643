//! Parser for the JSON log emitted by `rclone sync --dry-run --use-json-log`.

use cloudpull_core::DryRunOutcome;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct LogRecord {
    #[serde(default)]
    msg: String,
    #[serde(default)]
    object: Option<String>,
}

/// Collect the simulated deletions and copies reported in `log`.
///
/// Lines that are not JSON records are ignored.
#[must_use]
pub fn parse_dry_run_log(log: &str) -> DryRunOutcome {
    let mut deleted_paths = Vec::new();
    let mut copies = 0_usize;

    for line in log.lines() {
        let Ok(record) = serde_json::from_str::<LogRecord>(line.trim()) else {
            continue;
        };
        let msg = record.msg.as_str();
        if msg.starts_with("Skipped delete") || msg.starts_with("Skipped remove directory") {
            if let Some(object) = record.object.filter(|object| !object.is_empty()) {
                deleted_paths.push(object);
            }
        } else if msg.starts_with("Skipped copy") || msg.starts_with("Skipped update") {
            copies += 1;
        }
    }

    let stats_summary = format!(
        "{copies} file(s) would be transferred, {} would be deleted",
        deleted_paths.len()
    );
    DryRunOutcome {
        would_delete: !deleted_paths.is_empty(),
        deleted_paths,
        stats_summary,
    }
}
