//! Maps raw failure text from the engine or auth tooling to actionable messages.

/// Which boundary produced the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Download/sync execution or stop requests.
    Transfer,
    /// Interactive profile authorization.
    Authorization,
    /// Profile or folder listing.
    Listing,
}

/// Trigger row: any keyword matches, or all keywords when `require_all` is set.
struct Rule {
    keywords: &'static [&'static str],
    require_all: bool,
    message: &'static str,
}

const fn any(keywords: &'static [&'static str], message: &'static str) -> Rule {
    Rule {
        keywords,
        require_all: false,
        message,
    }
}

const fn all(keywords: &'static [&'static str], message: &'static str) -> Rule {
    Rule {
        keywords,
        require_all: true,
        message,
    }
}

const TRANSFER_RULES: &[Rule] = &[
    any(
        &["connection refused", "error sending request"],
        "Network connection failed. Please check your internet connection and try again.",
    ),
    any(
        &["timeout", "timed out"],
        "Connection timed out. Your network may be slow or unstable.",
    ),
    any(
        &["no such host", "dns"],
        "Cannot reach Google Drive servers. Check your internet connection.",
    ),
    any(
        &["permission denied", "access denied"],
        "Access denied. Try regenerating your remote configuration in the settings.",
    ),
    any(
        &["unauthorized", "401"],
        "Authentication failed. Please re-authorize your Google Drive access.",
    ),
    any(
        &["forbidden", "403"],
        "Access forbidden. You may not have permission to access this folder.",
    ),
    any(
        &["no such file", "not found", "404"],
        "Source folder not found. Please verify the Google Drive folder ID or URL.",
    ),
    any(
        &["no space left", "disk full"],
        "Not enough disk space. Free up space on your device and try again.",
    ),
    any(
        &["read-only"],
        "Cannot write to destination. The folder may be read-only.",
    ),
    any(
        &["directory not empty"],
        "Destination folder is not empty and cannot be overwritten.",
    ),
    any(
        &["rate limit", "too many requests", "429"],
        "Google Drive rate limit reached. Please wait a few minutes and try again.",
    ),
    any(
        &["quota exceeded"],
        "Google Drive quota exceeded. You may have reached your daily download limit.",
    ),
    any(
        &["remote configuration", "no remotes found"],
        "Remote configuration is missing or invalid. Please set up Google Drive access first.",
    ),
    any(&["cancelled"], "Download was cancelled."),
    all(
        &["invalid", "config"],
        "Invalid configuration. Try deleting and recreating your remote.",
    ),
];

const AUTHORIZATION_RULES: &[Rule] = &[
    any(&["timeout"], "Authorization timed out. Please try again."),
    any(&["cancelled"], "Authorization was cancelled."),
    any(
        &["invalid", "malformed"],
        "Invalid authorization response. Please try again.",
    ),
    any(
        &["network", "connection"],
        "Network error during authorization. Check your connection.",
    ),
];

const LISTING_RULES: &[Rule] = &[
    any(
        &["connection refused", "error sending request"],
        "Cannot reach the transfer service. Make sure rclone is running.",
    ),
    any(&["not found", "404"], "Folder not found. Please check the folder ID."),
    any(
        &["permission", "forbidden"],
        "Cannot access folder. Check your permissions.",
    ),
    any(&["timeout"], "Loading files timed out. Folder may be too large."),
];

impl Rule {
    fn matches(&self, haystack: &str) -> bool {
        if self.require_all {
            self.keywords.iter().all(|keyword| haystack.contains(keyword))
        } else {
            self.keywords.iter().any(|keyword| haystack.contains(keyword))
        }
    }
}

/// Classify `raw` for the given boundary. Total: always yields a message.
#[must_use]
pub fn classify(kind: ErrorKind, raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let rules = match kind {
        ErrorKind::Transfer => TRANSFER_RULES,
        ErrorKind::Authorization => AUTHORIZATION_RULES,
        ErrorKind::Listing => LISTING_RULES,
    };
    if let Some(rule) = rules.iter().find(|rule| rule.matches(&lowered)) {
        return rule.message.to_string();
    }
    match kind {
        ErrorKind::Transfer if lowered.contains("failed to") => {
            format!("Operation failed: {raw}")
        }
        ErrorKind::Transfer => format!("An error occurred: {raw}"),
        ErrorKind::Authorization => format!("Authorization failed: {raw}"),
        ErrorKind::Listing => format!("Failed to load files: {raw}"),
    }
}
