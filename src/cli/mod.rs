//! CLI argument definitions for Waypoint.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Waypoint - a local-first learning progress tracker.
///
/// Start with `wp init`, then `wp status` to see where you are.
#[derive(Parser, Debug)]
#[command(name = "wp")]
#[command(author, version, about = "Track curriculum progress locally, mirror it remotely", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Profile to operate on. Each profile has its own data directory.
    /// Can also be set via the WP_PROFILE environment variable.
    #[arg(short = 'p', long = "profile", global = true, env = "WP_PROFILE", default_value = "default")]
    pub profile: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the profile's data directory (start here!)
    Init,

    /// Set a module's completion state
    Toggle {
        /// Module ID (1-based)
        module: u32,

        /// New state: "on" or "off"
        #[arg(value_parser = parse_on_off, action = clap::ArgAction::Set)]
        state: bool,
    },

    /// Flip one checklist item of a module
    Subtask {
        /// Module ID (1-based)
        module: u32,

        /// Task index within the module (0-based)
        task: u32,
    },

    /// Module note commands
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },

    /// Badge commands
    Badge {
        #[command(subcommand)]
        command: BadgeCommands,
    },

    /// XP counter commands
    Xp {
        #[command(subcommand)]
        command: XpCommands,
    },

    /// Show progress, XP, badges, and the active module
    Status,

    /// Bulk reconciliation with the remote progress API
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },

    /// Write a backup envelope of all records
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Restore records from a backup envelope
    Import {
        /// Envelope file produced by `wp export`
        file: PathBuf,
    },

    /// Reset every record to its default (keeps the schema version)
    Reset {
        /// Required confirmation flag
        #[arg(long)]
        force: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Remote API token management
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
}

/// Note subcommands
#[derive(Subcommand, Debug)]
pub enum NoteCommands {
    /// Store a note for a module (trimmed, capped at 5000 characters)
    Set {
        /// Module ID
        module: u32,

        /// Note text (words are joined with spaces)
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Show a module's note
    Show {
        /// Module ID
        module: u32,
    },
}

/// Badge subcommands
#[derive(Subcommand, Debug)]
pub enum BadgeCommands {
    /// Record an unlocked badge (duplicates are ignored)
    Add {
        /// Badge name
        name: String,
    },

    /// List unlocked badges in unlock order
    List,
}

/// XP subcommands
#[derive(Subcommand, Debug)]
pub enum XpCommands {
    /// Add to the XP counter
    Add {
        /// Amount to add
        amount: u64,
    },

    /// Show the current XP total
    Show,
}

/// Sync subcommands
#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Push the full local snapshot to the remote API
    Push,

    /// Pull the remote snapshot, overwriting local records (remote wins)
    Pull,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Get a configuration value (output-format, backend-url, sync)
    Get {
        /// Configuration key
        key: String,
    },

    /// Set a configuration value in the profile config
    Set {
        /// Configuration key
        key: String,

        /// New value
        value: String,
    },

    /// Show all resolved configuration values with their sources
    Show,
}

/// Token subcommands
#[derive(Subcommand, Debug)]
pub enum TokenCommands {
    /// Store the API token in the profile state file (0600)
    Set {
        /// Bearer token for the progress API
        token: String,
    },

    /// Show the stored token, masked, with its source
    Show,

    /// Remove the stored token from the profile state file
    Clear,
}

/// Parse an on/off toggle argument.
fn parse_on_off(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "on" | "true" | "done" => Ok(true),
        "off" | "false" | "todo" => Ok(false),
        _ => Err(format!("expected 'on' or 'off', got '{}'", s)),
    }
}
