//! KDL schema definitions for config.kdl and state.kdl.
//!
//! This module provides:
//! - Rust structs representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Default values and merge semantics

use chrono::{DateTime, Utc};
use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Backing mode for the progress facade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Local records only (default)
    #[default]
    Local,
    /// Local records plus best-effort remote mirror
    Remote,
}

impl SyncMode {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "local" => Some(SyncMode::Local),
            "remote" => Some(SyncMode::Remote),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Local => "local",
            SyncMode::Remote => "remote",
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User preferences stored in config.kdl.
///
/// These settings are safe to sync across machines (e.g., via dotfiles).
/// File permissions: 0644 (rw-r--r--)
///
/// # KDL Schema
///
/// ```kdl
/// // User preferences - safe to sync across machines
/// output-format "human"  // or "json"
/// backend-url "https://progress.example.com/api"
/// sync "remote"  // or "local"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaypointConfig {
    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,

    /// Base URL of the remote progress API
    pub backend_url: Option<String>,

    /// Whether mutations are mirrored to the remote API
    pub sync_mode: Option<SyncMode>,
}

impl WaypointConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref url) = self.backend_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("backend-url must be an http(s) URL, got {}", url));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(s) = string_value(doc, "output-format") {
            config.output_format = OutputFormat::parse(&s);
        }

        if let Some(s) = string_value(doc, "backend-url") {
            config.backend_url = Some(s);
        }

        if let Some(s) = string_value(doc, "sync") {
            config.sync_mode = SyncMode::parse(&s);
        }

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref format) = self.output_format {
            push_string_node(&mut doc, "output-format", format.as_str());
        }

        if let Some(ref url) = self.backend_url {
            push_string_node(&mut doc, "backend-url", url);
        }

        if let Some(ref mode) = self.sync_mode {
            push_string_node(&mut doc, "sync", mode.as_str());
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &WaypointConfig) {
        if other.output_format.is_some() {
            self.output_format = other.output_format.clone();
        }
        if other.backend_url.is_some() {
            self.backend_url = other.backend_url.clone();
        }
        if other.sync_mode.is_some() {
            self.sync_mode = other.sync_mode.clone();
        }
    }
}

/// Runtime state stored in state.kdl.
///
/// This file contains machine-specific state and secrets.
/// **MUST be created with 0600 permissions (owner read/write only)**.
///
/// # KDL Schema
///
/// ```kdl
/// // Machine-specific state - never sync
/// api-token "wpt_xxxxxxxxxxxxxxxxxxxx"
/// token-saved-at "2026-01-31T09:00:00Z"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaypointState {
    /// Bearer token for the progress API (sensitive!)
    pub api_token: Option<String>,

    /// Timestamp when the token was stored
    pub token_saved_at: Option<DateTime<Utc>>,
}

impl WaypointState {
    /// Create an empty state with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if this state contains any secrets.
    pub fn has_secrets(&self) -> bool {
        self.api_token.is_some()
    }

    /// Mask the API token for display purposes.
    ///
    /// Shows only the first 4 and last 4 characters.
    pub fn masked_token(&self) -> Option<String> {
        self.api_token.as_ref().map(|token| mask_token(token))
    }

    /// Parse state from a KDL document.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut state = Self::new();

        if let Some(s) = string_value(doc, "api-token") {
            state.api_token = Some(s);
        }

        if let Some(s) = string_value(doc, "token-saved-at") {
            if let Ok(dt) = s.parse::<DateTime<Utc>>() {
                state.token_saved_at = Some(dt);
            }
        }

        state
    }

    /// Convert state to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref token) = self.api_token {
            push_string_node(&mut doc, "api-token", token);
        }

        if let Some(ref saved_at) = self.token_saved_at {
            push_string_node(&mut doc, "token-saved-at", &saved_at.to_rfc3339());
        }

        doc
    }

    /// Merge another state into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &WaypointState) {
        if other.api_token.is_some() {
            self.api_token = other.api_token.clone();
        }
        if other.token_saved_at.is_some() {
            self.token_saved_at = other.token_saved_at;
        }
    }
}

/// Mask a token for display, keeping the first 4 and last 4 characters.
pub fn mask_token(token: &str) -> String {
    if token.len() <= 12 {
        format!("{}...", &token[..4.min(token.len())])
    } else {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    }
}

/// Required permissions for state.kdl (Unix: 0600, owner read/write only).
#[cfg(unix)]
pub const STATE_FILE_MODE: u32 = 0o600;

/// Required permissions for config.kdl (Unix: 0644, readable by all).
#[cfg(unix)]
pub const CONFIG_FILE_MODE: u32 = 0o644;

/// First string entry of a named node, if present.
fn string_value(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)?
        .entries()
        .first()?
        .value()
        .as_string()
        .map(str::to_string)
}

fn push_string_node(doc: &mut KdlDocument, name: &str, value: &str) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    doc.nodes_mut().push(node);
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== OutputFormat / SyncMode Tests ====================

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("human"), Some(OutputFormat::Human));
        assert_eq!(OutputFormat::parse("invalid"), None);
    }

    #[test]
    fn test_sync_mode_parse() {
        assert_eq!(SyncMode::parse("local"), Some(SyncMode::Local));
        assert_eq!(SyncMode::parse("REMOTE"), Some(SyncMode::Remote));
        assert_eq!(SyncMode::parse("firebase"), None);
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(format!("{}", OutputFormat::Human), "human");
        assert_eq!(format!("{}", SyncMode::Remote), "remote");
    }

    // ==================== WaypointConfig Tests ====================

    #[test]
    fn test_config_default() {
        let config = WaypointConfig::default();
        assert_eq!(config.output_format, None);
        assert_eq!(config.backend_url, None);
        assert_eq!(config.sync_mode, None);
    }

    #[test]
    fn test_config_validate_rejects_non_http_url() {
        let config = WaypointConfig {
            backend_url: Some("ftp://example.com".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_accepts_https_url() {
        let config = WaypointConfig {
            backend_url: Some("https://progress.example.com/api".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_kdl_full() {
        let kdl = r#"
            output-format "human"
            backend-url "https://progress.example.com/api"
            sync "remote"
        "#;
        let doc: KdlDocument = kdl.parse().unwrap();
        let config = WaypointConfig::from_kdl(&doc);

        assert_eq!(config.output_format, Some(OutputFormat::Human));
        assert_eq!(
            config.backend_url,
            Some("https://progress.example.com/api".to_string())
        );
        assert_eq!(config.sync_mode, Some(SyncMode::Remote));
    }

    #[test]
    fn test_config_from_kdl_empty() {
        let doc = KdlDocument::new();
        let config = WaypointConfig::from_kdl(&doc);
        assert_eq!(config, WaypointConfig::default());
    }

    #[test]
    fn test_config_to_kdl_roundtrip() {
        let config = WaypointConfig {
            output_format: Some(OutputFormat::Json),
            backend_url: Some("http://localhost:8000".to_string()),
            sync_mode: Some(SyncMode::Local),
        };

        let doc = config.to_kdl();
        let parsed = WaypointConfig::from_kdl(&doc);

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_config_merge() {
        let mut base = WaypointConfig {
            output_format: Some(OutputFormat::Json),
            backend_url: Some("http://old.example.com".to_string()),
            sync_mode: Some(SyncMode::Local),
        };

        let override_config = WaypointConfig {
            output_format: None,
            backend_url: Some("http://new.example.com".to_string()),
            sync_mode: None,
        };

        base.merge(&override_config);

        assert_eq!(base.output_format, Some(OutputFormat::Json)); // Not overridden
        assert_eq!(
            base.backend_url,
            Some("http://new.example.com".to_string()) // Overridden
        );
        assert_eq!(base.sync_mode, Some(SyncMode::Local)); // Not overridden
    }

    // ==================== WaypointState Tests ====================

    #[test]
    fn test_state_default_has_no_secrets() {
        let state = WaypointState::default();
        assert!(!state.has_secrets());
        assert!(state.masked_token().is_none());
    }

    #[test]
    fn test_state_masked_token() {
        let state = WaypointState {
            api_token: Some("wpt_xxxxxxxxxxxxxxxxxxxx".to_string()),
            ..Default::default()
        };
        assert_eq!(state.masked_token().unwrap(), "wpt_...xxxx");
    }

    #[test]
    fn test_state_masked_token_short() {
        let state = WaypointState {
            api_token: Some("short".to_string()),
            ..Default::default()
        };
        let masked = state.masked_token().unwrap();
        assert!(masked.starts_with("shor"));
        assert!(!masked.contains("short"));
    }

    #[test]
    fn test_state_from_kdl_full() {
        let kdl = r#"
            api-token "wpt_test123"
            token-saved-at "2026-01-31T09:00:00Z"
        "#;
        let doc: KdlDocument = kdl.parse().unwrap();
        let state = WaypointState::from_kdl(&doc);

        assert_eq!(state.api_token, Some("wpt_test123".to_string()));
        assert!(state.token_saved_at.is_some());
    }

    #[test]
    fn test_state_to_kdl_roundtrip() {
        let state = WaypointState {
            api_token: Some("wpt_test".to_string()),
            token_saved_at: Some(Utc::now()),
        };

        let doc = state.to_kdl();
        let parsed = WaypointState::from_kdl(&doc);

        assert_eq!(state.api_token, parsed.api_token);
        assert!(parsed.token_saved_at.is_some());
    }

    #[test]
    fn test_state_merge() {
        let mut base = WaypointState {
            api_token: Some("old_token".to_string()),
            token_saved_at: None,
        };

        let override_state = WaypointState {
            api_token: Some("new_token".to_string()),
            token_saved_at: Some(Utc::now()),
        };

        base.merge(&override_state);

        assert_eq!(base.api_token, Some("new_token".to_string()));
        assert!(base.token_saved_at.is_some());
    }

    // ==================== Permission Constant Tests ====================

    #[cfg(unix)]
    #[test]
    fn test_file_mode_constants() {
        assert_eq!(STATE_FILE_MODE, 0o600);
        assert_eq!(CONFIG_FILE_MODE, 0o644);
    }
}
