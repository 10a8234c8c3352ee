//! Data model for Waypoint records.
//!
//! Every persisted record is a plain JSON document addressed by a
//! [`RecordKey`]. This module declares the known keys, their on-disk file
//! names, default values, and shape validation, plus the typed snapshot and
//! export envelope used by the progress facade.

pub mod catalog;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current schema version stamped into the `version` record.
pub const SCHEMA_VERSION: &str = "2.0";

/// Highest module ID accepted by validation.
///
/// The embedded catalog currently defines fewer modules; the validation
/// ceiling is higher so the catalog can grow without a schema migration.
pub const MAX_MODULE_ID: u32 = 20;

/// Maximum stored note length in characters.
pub const MAX_NOTE_LEN: usize = 5000;

/// The named records managed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKey {
    /// Module completion map: module ID -> completed
    Progress,
    /// Subtask completion map: "moduleId-taskIndex" -> completed
    Subtasks,
    /// Per-module free-text notes
    Notes,
    /// Unlocked badge names, in unlock order
    Badges,
    /// Cumulative experience points
    Xp,
    /// Schema version token
    Version,
    /// Timestamp of the last successful remote write
    LastSync,
}

impl RecordKey {
    /// All known keys, in a stable order.
    pub const ALL: [RecordKey; 7] = [
        RecordKey::Progress,
        RecordKey::Subtasks,
        RecordKey::Notes,
        RecordKey::Badges,
        RecordKey::Xp,
        RecordKey::Version,
        RecordKey::LastSync,
    ];

    /// The keys included in export/import and reset.
    pub const DATA: [RecordKey; 5] = [
        RecordKey::Progress,
        RecordKey::Subtasks,
        RecordKey::Notes,
        RecordKey::Badges,
        RecordKey::Xp,
    ];

    /// Stable string name used in JSON output and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKey::Progress => "progress",
            RecordKey::Subtasks => "subtasks",
            RecordKey::Notes => "notes",
            RecordKey::Badges => "badges",
            RecordKey::Xp => "xp",
            RecordKey::Version => "version",
            RecordKey::LastSync => "lastSync",
        }
    }

    /// On-disk file name under the data directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            RecordKey::Progress => "progress.json",
            RecordKey::Subtasks => "subtasks.json",
            RecordKey::Notes => "notes.json",
            RecordKey::Badges => "badges.json",
            RecordKey::Xp => "xp.json",
            RecordKey::Version => "version.json",
            RecordKey::LastSync => "last-sync.json",
        }
    }

    /// Type-appropriate default returned when the record is absent or
    /// unreadable.
    pub fn default_value(&self) -> Value {
        match self {
            RecordKey::Progress | RecordKey::Subtasks | RecordKey::Notes => {
                Value::Object(serde_json::Map::new())
            }
            RecordKey::Badges => Value::Array(Vec::new()),
            RecordKey::Xp => Value::from(0u64),
            RecordKey::Version => Value::from(SCHEMA_VERSION),
            RecordKey::LastSync => Value::Null,
        }
    }

    /// Critical keys get a timestamped backup before every overwrite.
    pub fn is_critical(&self) -> bool {
        matches!(self, RecordKey::Progress | RecordKey::Subtasks)
    }

    /// Check that `value` matches the declared shape for this key.
    pub fn validate(&self, value: &Value) -> bool {
        match self {
            RecordKey::Progress | RecordKey::Subtasks => match value.as_object() {
                Some(map) => map.values().all(Value::is_boolean),
                None => false,
            },
            RecordKey::Notes => match value.as_object() {
                Some(map) => map.values().all(Value::is_string),
                None => false,
            },
            RecordKey::Badges => match value.as_array() {
                Some(items) => items.iter().all(Value::is_string),
                None => false,
            },
            RecordKey::Xp => value.as_u64().is_some(),
            RecordKey::Version => value.is_string(),
            RecordKey::LastSync => value.is_null() || value.is_string(),
        }
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Check that `id` is a valid module ID (1..=MAX_MODULE_ID).
pub fn is_valid_module_id(id: u32) -> bool {
    (1..=MAX_MODULE_ID).contains(&id)
}

/// Build the composite subtask key `"<moduleId>-<taskIndex>"`.
pub fn subtask_key(module_id: u32, task_index: u32) -> String {
    format!("{}-{}", module_id, task_index)
}

/// Parse a composite subtask key back into `(moduleId, taskIndex)`.
///
/// Returns `None` when the key does not match the `moduleId-taskIndex`
/// format or the module ID is out of range.
pub fn parse_subtask_key(key: &str) -> Option<(u32, u32)> {
    let (module, task) = key.split_once('-')?;
    let module_id: u32 = module.parse().ok()?;
    let task_index: u32 = task.parse().ok()?;
    if !is_valid_module_id(module_id) {
        return None;
    }
    Some((module_id, task_index))
}

/// Sanitize note text for storage: trim surrounding whitespace and truncate
/// to [`MAX_NOTE_LEN`] characters.
pub fn sanitize_note(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_NOTE_LEN {
        trimmed.to_string()
    } else {
        trimmed.chars().take(MAX_NOTE_LEN).collect()
    }
}

/// Typed view of all data records at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Module completion map
    pub progress: BTreeMap<String, bool>,
    /// Subtask completion map
    pub subtasks: BTreeMap<String, bool>,
    /// Per-module notes
    pub notes: BTreeMap<String, String>,
    /// Unlocked badges in unlock order
    pub badges: Vec<String>,
    /// Cumulative XP counter
    pub xp: u64,
}

/// User-facing backup envelope produced by `wp export`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportEnvelope {
    /// Schema version at export time
    pub version: String,
    /// Export timestamp
    pub timestamp: DateTime<Utc>,
    /// Last successful remote sync, if any
    #[serde(rename = "lastSync")]
    pub last_sync: Option<String>,
    /// The exported records
    pub data: Snapshot,
}
