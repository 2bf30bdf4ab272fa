//! Action logging for `bk` commands.
//!
//! Every CLI invocation is appended as one JSON line to
//! `<data-dir>/action.log`. Contact details and secrets are redacted before
//! anything is written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::Result;

pub const ACTION_LOG_FILE: &str = "action.log";

const REDACTED: &str = "[REDACTED]";

/// Represents a single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// Command name (e.g., "property create", "transaction status")
    pub command: String,

    /// Command arguments as JSON
    pub args: Value,

    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,

    /// User who executed the command
    pub user: String,
}

pub fn log_path(data_dir: &Path) -> PathBuf {
    data_dir.join(ACTION_LOG_FILE)
}

/// Append an entry for one command.
///
/// Never fails: write errors are reported through `tracing` so logging can
/// never break a command.
pub fn log_action(
    data_dir: &Path,
    command: &str,
    args: &Value,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) {
    let entry = ActionLog {
        timestamp: Utc::now(),
        command: command.to_string(),
        args: sanitize_args(args),
        success,
        error,
        duration_ms,
        user: current_user(),
    };

    if let Err(e) = write_log_entry(&log_path(data_dir), &entry) {
        tracing::warn!(error = %e, "failed to write action log");
    }
}

/// Read every entry back, oldest first. Unparseable lines are skipped.
pub fn read_entries(data_dir: &Path) -> Result<Vec<ActionLog>> {
    let path = log_path(data_dir);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}

fn write_log_entry(path: &Path, entry: &ActionLog) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;
    Ok(())
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_lowercase();
    ["email", "phone", "password", "token", "secret"]
        .iter()
        .any(|word| key.contains(word))
}

/// Remove contact details and secrets, shorten paths and long values.
pub fn sanitize_args(args: &Value) -> Value {
    match args {
        Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, value) in map {
                if is_sensitive(key) && !value.is_null() {
                    sanitized.insert(key.clone(), Value::String(REDACTED.to_string()));
                } else {
                    sanitized.insert(key.clone(), sanitize_args(value));
                }
            }
            Value::Object(sanitized)
        }
        Value::Array(arr) => {
            if arr.len() > 10 {
                Value::String(format!("[Array with {} items]", arr.len()))
            } else {
                Value::Array(arr.iter().map(sanitize_args).collect())
            }
        }
        Value::String(s) => {
            let sanitized = if s.contains('/') || s.contains('\\') {
                s.rsplit(['/', '\\']).next().unwrap_or(s).to_string()
            } else {
                s.clone()
            };

            let length = sanitized.chars().count();
            if length > 100 {
                let head: String = sanitized.chars().take(97).collect();
                Value::String(format!("{}... ({} chars)", head, length))
            } else {
                Value::String(sanitized)
            }
        }
        _ => args.clone(),
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_simple_string() {
        assert_eq!(sanitize_args(&json!("hello")), json!("hello"));
    }

    #[test]
    fn test_sanitize_file_path() {
        assert_eq!(
            sanitize_args(&json!("/very/long/path/to/photo.jpg")),
            json!("photo.jpg")
        );
    }

    #[test]
    fn test_sanitize_redacts_contact_details() {
        let args = json!({
            "first_name": "Ana",
            "email": "ana@example.com",
            "phone": "555-0100",
            "budget_max": 900000
        });
        let sanitized = sanitize_args(&args);
        assert_eq!(sanitized["first_name"], "Ana");
        assert_eq!(sanitized["email"], REDACTED);
        assert_eq!(sanitized["phone"], REDACTED);
        assert_eq!(sanitized["budget_max"], 900000);
    }

    #[test]
    fn test_sanitize_keeps_absent_contact_fields_null() {
        let sanitized = sanitize_args(&json!({"email": null}));
        assert_eq!(sanitized["email"], Value::Null);
    }

    #[test]
    fn test_sanitize_nested_and_long_values() {
        let long = "x".repeat(150);
        let args = json!({"patch": {"contact_email": "a@b.c", "description": long}});
        let sanitized = sanitize_args(&args);
        assert_eq!(sanitized["patch"]["contact_email"], REDACTED);
        let description = sanitized["patch"]["description"].as_str().unwrap();
        assert!(description.ends_with("(150 chars)"));
    }

    #[test]
    fn test_sanitize_large_array() {
        let args = json!({"features": (0..20).collect::<Vec<i32>>()});
        assert_eq!(
            sanitize_args(&args)["features"],
            json!("[Array with 20 items]")
        );
    }

    #[test]
    fn test_log_action_appends_lines() {
        let temp = TempDir::new().unwrap();
        log_action(temp.path(), "property create", &json!({"title": "Loft"}), true, None, 3);
        log_action(
            temp.path(),
            "client create",
            &json!({"email": "ana@example.com"}),
            false,
            Some("Validation failed".to_string()),
            1,
        );

        let entries = read_entries(temp.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].command, "property create");
        assert!(entries[0].success);
        assert_eq!(entries[1].args["email"], REDACTED);
        assert_eq!(entries[1].error.as_deref(), Some("Validation failed"));
    }
}
