//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use cloudpull_app::ConfirmationPrompt;
use cloudpull_config::AppConfig;
use cloudpull_core::{RemoteEntry, RemoteProfile};
use cloudpull_events::{Event, EventEnvelope};
use cloudpull_rclone::format_bytes;
use serde::Serialize;
use serde_json::{Value, json};

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

pub(crate) fn render_profiles(
    profiles: &[RemoteProfile],
    selected: Option<&str>,
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let rows: Vec<Value> = profiles
                .iter()
                .map(|profile| {
                    json!({
                        "id": profile.id,
                        "selected": Some(profile.id.as_str()) == selected,
                    })
                })
                .collect();
            print_json(&Value::Array(rows))?;
        }
        OutputFormat::Table => {
            for line in profile_lines(profiles, selected) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

pub(crate) fn profile_lines(profiles: &[RemoteProfile], selected: Option<&str>) -> Vec<String> {
    if profiles.is_empty() {
        return vec!["No remotes found. Run `cloudpull remotes create` to add one.".to_string()];
    }
    profiles
        .iter()
        .map(|profile| {
            let marker = if Some(profile.id.as_str()) == selected {
                '*'
            } else {
                ' '
            };
            format!("{marker} {}", profile.id)
        })
        .collect()
}

pub(crate) fn render_entries(entries: &[RemoteEntry], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(entries)?,
        OutputFormat::Table => {
            println!("{:<4} {:>10} PATH", "KIND", "SIZE");
            for line in entry_lines(entries) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

pub(crate) fn entry_lines(entries: &[RemoteEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let kind = if entry.is_dir { "dir" } else { "file" };
            let size = entry.size.map(format_bytes).unwrap_or_default();
            let path = if entry.is_dir {
                format!("{}/", entry.path)
            } else {
                entry.path.clone()
            };
            format!("{kind:<4} {size:>10} {path}")
        })
        .collect()
}

pub(crate) fn render_config(config: &AppConfig, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(config)?,
        OutputFormat::Table => {
            for line in config_lines(config)? {
                println!("{line}");
            }
        }
    }
    Ok(())
}

/// One `section.field = value` line per setting, the same keys `config set` accepts.
pub(crate) fn config_lines(config: &AppConfig) -> CliResult<Vec<String>> {
    let document = serde_json::to_value(config)
        .map_err(|err| CliError::failure(anyhow!("failed to format configuration: {err}")))?;
    let mut lines = Vec::new();
    if let Value::Object(sections) = document {
        for (section, fields) in sections {
            if let Value::Object(fields) = fields {
                for (field, value) in fields {
                    lines.push(format!("{section}.{field} = {value}"));
                }
            }
        }
    }
    Ok(lines)
}

pub(crate) fn render_prompt(prompt: &ConfirmationPrompt) {
    for line in prompt.lines() {
        println!("{line}");
    }
}

/// Print log lines as they are appended to the run.
pub(crate) fn print_event(envelope: &EventEnvelope) {
    if let Event::LogAppended { line, .. } = &envelope.event {
        println!("{line}");
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}
