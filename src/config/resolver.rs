//! Unified precedence resolution for configuration and state.
//!
//! This module provides a single entry point for resolving both
//! configuration preferences and runtime state (including the API token)
//! with proper precedence.
//!
//! ## Token Precedence (highest to lowest)
//!
//! 1. `WP_API_TOKEN` environment variable
//! 2. Profile state.kdl (`~/.local/share/waypoint/<profile-hash>/state.kdl`)
//! 3. System state.kdl (`~/.local/share/waypoint/state.kdl`)
//!
//! ## Config Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Profile config.kdl
//! 3. System config.kdl (`~/.config/waypoint/config.kdl`)
//! 4. Built-in defaults

use crate::Result;
use crate::config::schema::mask_token;
use crate::config::{OutputFormat, SyncMode};
use crate::store::Store;

/// Environment variable name for the API token override.
pub const API_TOKEN_ENV: &str = "WP_API_TOKEN";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from profile-level config/state
    Profile,
    /// Value from system-level config/state
    System,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::Profile => write!(f, "profile"),
            ValueSource::System => write!(f, "system"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Output format preference
    pub output_format: Resolved<OutputFormat>,
    /// Base URL of the remote progress API
    pub backend_url: Option<Resolved<String>>,
    /// Backing mode for the progress facade
    pub sync_mode: Resolved<SyncMode>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            backend_url: None,
            sync_mode: Resolved::new(SyncMode::Local, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    /// Get the output format value.
    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format.value
    }

    /// Get the backend URL, if set.
    pub fn backend_url(&self) -> Option<&str> {
        self.backend_url.as_ref().map(|r| r.value.as_str())
    }

    /// Get the sync mode value.
    pub fn sync_mode(&self) -> &SyncMode {
        &self.sync_mode.value
    }
}

/// Fully resolved state with source tracking.
#[derive(Debug, Clone, Default)]
pub struct ResolvedState {
    /// API token for the progress API
    pub api_token: Option<Resolved<String>>,
    /// Whether the token came from an environment variable
    pub token_from_env: bool,
}

impl ResolvedState {
    /// Get the token value, if set.
    pub fn token(&self) -> Option<&str> {
        self.api_token.as_ref().map(|r| r.value.as_str())
    }

    /// Get the masked token for display purposes.
    pub fn masked_token(&self) -> Option<String> {
        self.api_token.as_ref().map(|r| mask_token(&r.value))
    }

    /// Check if a token is available.
    pub fn has_token(&self) -> bool {
        self.api_token.is_some()
    }

    /// Get the source of the token, if set.
    pub fn token_source(&self) -> Option<&ValueSource> {
        self.api_token.as_ref().map(|r| &r.source)
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Output format override from CLI flag
    pub output_format: Option<OutputFormat>,
    /// Backend URL override from CLI flag
    pub backend_url: Option<String>,
    /// Sync mode override from CLI flag
    pub sync_mode: Option<SyncMode>,
}

impl ConfigOverrides {
    /// Create empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set output format override.
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    /// Set backend URL override.
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = Some(url.into());
        self
    }

    /// Set sync mode override.
    pub fn with_sync_mode(mut self, mode: SyncMode) -> Self {
        self.sync_mode = Some(mode);
        self
    }
}

/// Resolve configuration with the full precedence chain.
///
/// Precedence (highest to lowest):
/// 1. CLI flags (from `overrides`)
/// 2. Profile config.kdl
/// 3. System config.kdl
/// 4. Built-in defaults
pub fn resolve_config(store: &Store, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let mut result = ResolvedConfig::default();

    let system_config = Store::read_system_config()?;
    let profile_config = store.read_config()?;

    // Resolve output_format
    if let Some(ref format) = overrides.output_format {
        result.output_format = Resolved::new(format.clone(), ValueSource::CliFlag);
    } else if let Some(ref format) = profile_config.output_format {
        result.output_format = Resolved::new(format.clone(), ValueSource::Profile);
    } else if let Some(ref format) = system_config.output_format {
        result.output_format = Resolved::new(format.clone(), ValueSource::System);
    }
    // else: remains Default (Json)

    // Resolve backend_url
    if let Some(ref url) = overrides.backend_url {
        result.backend_url = Some(Resolved::new(url.clone(), ValueSource::CliFlag));
    } else if let Some(ref url) = profile_config.backend_url {
        result.backend_url = Some(Resolved::new(url.clone(), ValueSource::Profile));
    } else if let Some(ref url) = system_config.backend_url {
        result.backend_url = Some(Resolved::new(url.clone(), ValueSource::System));
    }
    // else: remains None (no default backend)

    // Resolve sync_mode
    if let Some(ref mode) = overrides.sync_mode {
        result.sync_mode = Resolved::new(mode.clone(), ValueSource::CliFlag);
    } else if let Some(ref mode) = profile_config.sync_mode {
        result.sync_mode = Resolved::new(mode.clone(), ValueSource::Profile);
    } else if let Some(ref mode) = system_config.sync_mode {
        result.sync_mode = Resolved::new(mode.clone(), ValueSource::System);
    }
    // else: remains Default (Local)

    Ok(result)
}

/// Resolve state with the full precedence chain.
///
/// Token precedence (highest to lowest):
/// 1. `WP_API_TOKEN` environment variable
/// 2. Profile state.kdl
/// 3. System state.kdl
pub fn resolve_state(store: &Store) -> Result<ResolvedState> {
    let mut result = ResolvedState::default();

    // Check environment variable first (highest precedence)
    if let Ok(token) = std::env::var(API_TOKEN_ENV) {
        if !token.is_empty() {
            result.api_token = Some(Resolved::new(
                token,
                ValueSource::EnvVar(API_TOKEN_ENV.to_string()),
            ));
            result.token_from_env = true;
            return Ok(result);
        }
    }

    let profile_state = store.read_state()?;
    if let Some(ref token) = profile_state.api_token {
        result.api_token = Some(Resolved::new(token.clone(), ValueSource::Profile));
        return Ok(result);
    }

    let system_state = Store::read_system_state()?;
    if let Some(ref token) = system_state.api_token {
        result.api_token = Some(Resolved::new(token.clone(), ValueSource::System));
        return Ok(result);
    }

    // No token found anywhere
    Ok(result)
}
