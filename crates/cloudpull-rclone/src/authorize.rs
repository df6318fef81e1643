//! Interactive `rclone authorize drive` round-trip.

use std::path::Path;

use tokio::process::Command;
use tracing::info;

use crate::error::RcloneError;

/// Slice between the first `{` and the last `}` of `text`, if both exist in that order.
#[must_use]
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start <= end).then(|| &text[start..=end])
}

/// Run the browser-based authorization and return the token JSON.
///
/// # Errors
///
/// Returns an error if rclone cannot be launched, exits unsuccessfully, or
/// prints no token.
pub async fn authorize_drive(binary: &Path) -> Result<String, RcloneError> {
    info!(binary = %binary.display(), "starting rclone authorization");
    let output = Command::new(binary)
        .args(["authorize", "drive"])
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| RcloneError::Spawn {
            operation: "authorize",
            source,
        })?;

    if !output.status.success() {
        return Err(RcloneError::ProcessFailed {
            operation: "authorize",
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    extract_json(&stdout)
        .map(str::to_string)
        .ok_or(RcloneError::InvalidAuthorization)
}
