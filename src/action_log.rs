//! Action logging for Waypoint commands.
//!
//! Every `wp` invocation is appended to a structured JSONL log so a
//! learner's activity timeline can be reconstructed. Logging never fails a
//! command: all errors degrade to a warning on stderr.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::store;

/// Environment variable that disables action logging when set to "0".
pub const ACTION_LOG_ENV: &str = "WP_ACTION_LOG";

/// Represents a single action log entry.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionLog {
    /// ISO 8601 timestamp when the action occurred
    pub timestamp: DateTime<Utc>,

    /// Profile the command ran against
    pub profile: String,

    /// Command name (e.g., "toggle", "sync push")
    pub command: String,

    /// Command arguments as JSON
    pub args: serde_json::Value,

    /// Whether the command succeeded
    pub success: bool,

    /// Error message if the command failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Command execution duration in milliseconds
    pub duration_ms: u64,

    /// User who executed the command
    pub user: String,
}

/// Log an action to the action log file.
///
/// This function never fails - it silently falls back on errors to avoid
/// breaking commands due to logging issues.
pub fn log_action(
    profile: &str,
    command: &str,
    args: serde_json::Value,
    success: bool,
    error: Option<String>,
    duration_ms: u64,
) {
    if std::env::var(ACTION_LOG_ENV).as_deref() == Ok("0") {
        return;
    }

    let log_path = match log_path() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Warning: failed to get action log path: {}", e);
            return;
        }
    };

    let entry = ActionLog {
        timestamp: Utc::now(),
        profile: profile.to_string(),
        command: command.to_string(),
        args: sanitize_args(&args),
        success,
        error,
        duration_ms,
        user: current_user(),
    };

    if let Err(e) = write_log_entry(&log_path, &entry) {
        eprintln!("Warning: failed to write action log: {}", e);
    }
}

/// Default path: `~/.local/share/waypoint/action.log` (or under
/// `WP_DATA_DIR` when overridden).
fn log_path() -> crate::Result<PathBuf> {
    Ok(store::data_base_dir()?.join("action.log"))
}

/// Write a log entry to the log file.
fn write_log_entry(path: &Path, entry: &ActionLog) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(entry)?;

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;

    Ok(())
}

/// Sanitize arguments to remove sensitive data.
///
/// Token-ish keys are redacted, long strings truncated, large arrays
/// summarized, and file paths reduced to their basename.
fn sanitize_args(args: &serde_json::Value) -> serde_json::Value {
    match args {
        serde_json::Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, value) in map {
                let key_lower = key.to_lowercase();
                if key_lower.contains("password")
                    || key_lower.contains("token")
                    || key_lower.contains("secret")
                {
                    sanitized.insert(
                        key.clone(),
                        serde_json::Value::String("[REDACTED]".to_string()),
                    );
                } else {
                    sanitized.insert(key.clone(), sanitize_args(value));
                }
            }
            serde_json::Value::Object(sanitized)
        }
        serde_json::Value::Array(arr) => {
            if arr.len() > 10 {
                serde_json::Value::String(format!("[Array with {} items]", arr.len()))
            } else {
                serde_json::Value::Array(arr.iter().map(sanitize_args).collect())
            }
        }
        serde_json::Value::String(s) => {
            // Reduce file paths to their basename
            let sanitized = if s.contains('/') || s.contains('\\') {
                s.rsplit(['/', '\\']).next().unwrap_or(s).to_string()
            } else {
                s.clone()
            };

            if sanitized.len() > 100 {
                serde_json::Value::String(format!(
                    "{}... ({} chars)",
                    &sanitized[..97],
                    sanitized.len()
                ))
            } else {
                serde_json::Value::String(sanitized)
            }
        }
        _ => args.clone(),
    }
}

/// Get the current user's username.
fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
