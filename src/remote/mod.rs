//! Remote progress API client.
//!
//! Translates local mutations into authenticated HTTP calls against the
//! progress API at `<base-url>/progress`. The remote is never the source of
//! truth: every operation makes at most one attempt, and all transport,
//! status, and parse failures are normalized into [`SyncError`] so callers
//! can log and move on.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::models::Snapshot;

/// User-Agent header sent with every request
const USER_AGENT: &str = "waypoint-cli";

/// Errors that can occur talking to the progress API.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No API token is available; no request was made
    #[error("Not authenticated: no API token available")]
    Unauthenticated,

    /// The server answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Error detail extracted from the response body
        message: String,
    },

    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// The response body was not the expected JSON
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// Full remote progress snapshot from `GET /progress`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteProgress {
    /// Module completion map
    #[serde(default)]
    pub modules: BTreeMap<String, bool>,
    /// Subtask completion map
    #[serde(default)]
    pub subtasks: BTreeMap<String, bool>,
    /// Per-module notes
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
    /// Unlocked badges
    #[serde(default)]
    pub badges: Vec<String>,
    /// Cumulative XP
    #[serde(default)]
    pub xp: u64,
    /// Server-side last sync timestamp
    #[serde(default)]
    pub last_sync: Option<String>,
}

/// Response envelope from `GET /progress`.
#[derive(Debug, Deserialize)]
struct ProgressEnvelope {
    #[serde(default)]
    progress: RemoteProgress,
}

/// Acknowledgement from `POST /progress/sync`.
#[derive(Debug, Deserialize)]
struct SyncAck {
    #[serde(default)]
    synced_at: Option<String>,
}

/// Fields of a JSON error body we extract a message from.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
    message: Option<String>,
}

/// Client for the remote progress API.
pub struct RemoteClient {
    base_url: String,
    token: Option<String>,
}

impl RemoteClient {
    /// Create a client for the given base URL.
    ///
    /// The token is optional at construction time; calls without one fail
    /// fast with [`SyncError::Unauthenticated`] and issue no request.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url, token }
    }

    /// Whether a token is available for authenticated calls.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/progress{}", self.base_url, endpoint)
    }

    fn authorized(&self, req: ureq::Request) -> Result<ureq::Request, SyncError> {
        let token = self.token.as_deref().ok_or(SyncError::Unauthenticated)?;
        Ok(req
            .set("Authorization", &format!("Bearer {}", token))
            .set("User-Agent", USER_AGENT)
            .set("Accept", "application/json"))
    }

    fn send(
        &self,
        method: &str,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> Result<ureq::Response, SyncError> {
        let req = self.authorized(ureq::request(method, &self.url(endpoint)))?;

        let response = match body {
            Some(body) => req.send_json(body),
            None => req.call(),
        };

        match response {
            Ok(resp) => Ok(resp),
            Err(ureq::Error::Status(status, resp)) => {
                let raw = resp.into_string().unwrap_or_default();
                Err(SyncError::Status {
                    status,
                    message: extract_error_message(&raw, status),
                })
            }
            Err(e) => Err(SyncError::Network(e.to_string())),
        }
    }

    // === Operations (1:1 with local mutation types) ===

    /// `GET /progress` - fetch the full remote snapshot.
    pub fn fetch_snapshot(&self) -> Result<RemoteProgress, SyncError> {
        let resp = self.send("GET", "", None)?;
        let envelope: ProgressEnvelope = resp
            .into_json()
            .map_err(|e| SyncError::Parse(e.to_string()))?;
        Ok(envelope.progress)
    }

    /// `PUT /progress/module` - set one module's completion state.
    pub fn put_module(&self, module_id: u32, is_completed: bool) -> Result<(), SyncError> {
        self.send(
            "PUT",
            "/module",
            Some(json!({
                "module_id": module_id.to_string(),
                "is_completed": is_completed,
            })),
        )?;
        Ok(())
    }

    /// `PUT /progress/subtask` - set one subtask's completion state.
    pub fn put_subtask(
        &self,
        module_id: u32,
        task_index: u32,
        is_completed: bool,
    ) -> Result<(), SyncError> {
        self.send(
            "PUT",
            "/subtask",
            Some(json!({
                "moduleId": module_id.to_string(),
                "taskIndex": task_index.to_string(),
                "isCompleted": is_completed,
            })),
        )?;
        Ok(())
    }

    /// `PUT /progress/note` - store one module's note.
    pub fn put_note(&self, module_id: u32, note_text: &str) -> Result<(), SyncError> {
        self.send(
            "PUT",
            "/note",
            Some(json!({
                "module_id": module_id.to_string(),
                "note_text": note_text,
            })),
        )?;
        Ok(())
    }

    /// `POST /progress/badge` - record an unlocked badge.
    pub fn post_badge(&self, badge_name: &str) -> Result<(), SyncError> {
        self.send("POST", "/badge", Some(json!({"badge_name": badge_name})))?;
        Ok(())
    }

    /// `POST /progress/xp` - add to the remote XP counter.
    pub fn post_xp(&self, amount: u64) -> Result<(), SyncError> {
        self.send("POST", "/xp", Some(json!({"amount": amount})))?;
        Ok(())
    }

    /// `POST /progress/sync` - push the full local snapshot.
    ///
    /// Returns the server's sync timestamp when it provides one.
    pub fn push_snapshot(&self, snapshot: &Snapshot) -> Result<Option<String>, SyncError> {
        let resp = self.send(
            "POST",
            "/sync",
            Some(json!({
                "modules": snapshot.progress,
                "subtasks": snapshot.subtasks,
                "notes": snapshot.notes,
                "badges": snapshot.badges,
                "xp": snapshot.xp,
            })),
        )?;
        let ack: SyncAck = resp
            .into_json()
            .map_err(|e| SyncError::Parse(e.to_string()))?;
        Ok(ack.synced_at)
    }

    /// `DELETE /progress` - clear all remote state.
    pub fn delete_all(&self) -> Result<(), SyncError> {
        self.send("DELETE", "", None)?;
        Ok(())
    }
}

/// Pull the `detail` (or `message`) field out of a JSON error body, falling
/// back to the raw body or the bare status.
fn extract_error_message(raw: &str, status: u16) -> String {
    if let Ok(body) = serde_json::from_str::<ErrorBody>(raw) {
        if let Some(detail) = body.detail {
            return detail;
        }
        if let Some(message) = body.message {
            return message;
        }
    }
    if raw.trim().is_empty() {
        format!("status {}", status)
    } else {
        raw.trim().to_string()
    }
}
