//! Configuration and state management for Waypoint.
//!
//! This module defines KDL schemas for two distinct files:
//!
//! ## config.kdl - User preferences (safe to sync across machines)
//!
//! Located at:
//! - System: `~/.config/waypoint/config.kdl`
//! - Profile: `~/.local/share/waypoint/<profile-hash>/config.kdl`
//!
//! Contains:
//! - `output-format` - "json" or "human"
//! - `backend-url` - Base URL of the remote progress API
//! - `sync` - "local" or "remote"
//!
//! ## state.kdl - Runtime state (machine-specific, contains secrets)
//!
//! Located at:
//! - System: `~/.local/share/waypoint/state.kdl`
//! - Profile: `~/.local/share/waypoint/<profile-hash>/state.kdl`
//!
//! Contains:
//! - `api-token` - Bearer token for the progress API
//! - `token-saved-at` - ISO 8601 timestamp of when the token was stored
//!
//! ## Security
//!
//! `state.kdl` MUST be created with 0600 permissions (owner read/write
//! only) because it contains the API token.
//!
//! ## Precedence
//!
//! For tokens: env var > profile state > system state
//! For preferences: CLI flag > profile config > system config > defaults
//!
//! Use the [`resolver`] module for unified precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    API_TOKEN_ENV, ConfigOverrides, Resolved, ResolvedConfig, ResolvedState, ValueSource,
    resolve_config, resolve_state,
};
pub use schema::{OutputFormat, SyncMode, WaypointConfig, WaypointState};
#[cfg(unix)]
pub use schema::{CONFIG_FILE_MODE, STATE_FILE_MODE};
