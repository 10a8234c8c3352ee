//! Common test utilities for waypoint integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/waypoint/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// Each `TestEnv` creates a temporary directory that acts as the waypoint
/// data base (via the `WP_DATA_DIR` env var). The `wp()` method returns a
/// `Command` that sets the variable per-invocation, making tests
/// parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with an isolated data directory.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and initialize the default profile.
    pub fn init() -> Self {
        let env = Self::new();
        env.wp().arg("init").assert().success();
        env
    }

    /// Get a Command for the wp binary with an isolated data directory.
    ///
    /// Sets `WP_DATA_DIR` per-command for parallel safety.
    pub fn wp(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_wp"));
        cmd.env("WP_DATA_DIR", self.data_dir.path());
        // Keep the host's system config and credentials out of tests
        cmd.env("WP_CONFIG_DIR", self.data_dir.path().join("system-config"));
        cmd.env_remove("WP_API_TOKEN");
        cmd.env_remove("WP_PROFILE");
        cmd
    }

    /// Get the path to the base data directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    /// Get the path to the default profile's data directory.
    pub fn profile_path(&self) -> std::path::PathBuf {
        self.data_dir
            .path()
            .join(waypoint::store::profile_hash("default"))
    }

    /// Parse a command's stdout as JSON.
    pub fn json(output: &[u8]) -> serde_json::Value {
        serde_json::from_slice(output).expect("Failed to parse JSON output")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
