//! Validation helpers and dotted-key editing for configuration documents.

use std::net::SocketAddr;

use cloudpull_core::BandwidthLimit;
use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};
use crate::model::AppConfig;

/// Check cross-field constraints that serde cannot express.
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` naming the first offending field.
pub fn validate(config: &AppConfig) -> ConfigResult<()> {
    if config.network.rc_addr.parse::<SocketAddr>().is_err() {
        return Err(invalid(
            "network",
            "rc_addr",
            Some(&config.network.rc_addr),
            "must be a host:port socket address",
        ));
    }
    if config.network.request_timeout_secs == 0 {
        return Err(invalid(
            "network",
            "request_timeout_secs",
            None,
            "must be positive",
        ));
    }
    if config.network.poll_interval_ms == 0 {
        return Err(invalid("network", "poll_interval_ms", None, "must be positive"));
    }
    if let Some(limit) = config.download.bandwidth_limit.as_deref()
        && BandwidthLimit::parse(limit).is_none()
    {
        return Err(invalid(
            "download",
            "bandwidth_limit",
            Some(limit),
            "must be a positive number followed by K or M",
        ));
    }
    if config.download.create_subfolder && config.download.subfolder_name.trim().is_empty() {
        return Err(invalid(
            "download",
            "subfolder_name",
            None,
            "must not be empty while create_subfolder is set",
        ));
    }
    if config.rclone.binary.trim().is_empty() {
        return Err(invalid("rclone", "binary", None, "must not be empty"));
    }
    Ok(())
}

fn invalid(section: &str, field: &str, value: Option<&str>, reason: &'static str) -> ConfigError {
    ConfigError::InvalidField {
        section: section.to_string(),
        field: field.to_string(),
        value: value.map(str::to_string),
        reason,
    }
}

/// Set `section.field` to `raw`, coercing the text to the type of the current value.
///
/// `null` clears optional fields. The result is validated before being returned.
///
/// # Errors
///
/// Returns an error for unknown keys, values of the wrong type, or a document
/// that no longer validates.
pub fn apply_setting(config: &AppConfig, key: &str, raw: &str) -> ConfigResult<AppConfig> {
    let mut document =
        serde_json::to_value(config).map_err(|source| ConfigError::Serialize { source })?;
    let (section, field) = key
        .split_once('.')
        .ok_or_else(|| ConfigError::UnknownField {
            key: key.to_string(),
        })?;
    let slot = document
        .get_mut(section)
        .and_then(|section| section.get_mut(field))
        .ok_or_else(|| ConfigError::UnknownField {
            key: key.to_string(),
        })?;

    *slot = coerce(slot, raw)
        .ok_or_else(|| invalid(section, field, Some(raw), "has the wrong type"))?;

    let updated: AppConfig = serde_json::from_value(document)
        .map_err(|_| invalid(section, field, Some(raw), "is not an accepted value"))?;
    validate(&updated)?;
    Ok(updated)
}

fn coerce(current: &Value, raw: &str) -> Option<Value> {
    let raw = raw.trim();
    match current {
        Value::Bool(_) => raw.parse::<bool>().ok().map(Value::Bool),
        Value::Number(_) => raw.parse::<u64>().ok().map(Value::from),
        Value::Null if raw == "null" => Some(Value::Null),
        Value::String(_) | Value::Null => Some(Value::String(raw.to_string())),
        Value::Array(_) | Value::Object(_) => None,
    }
}
