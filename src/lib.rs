//! Waypoint - a local-first learning progress tracker.
//!
//! This library provides the core functionality for the `wp` CLI tool:
//! a validated local record store, a best-effort remote sync client, and
//! the progress facade that composes the two.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod config;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod remote;
pub mod store;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;
    use tempfile::TempDir;

    use crate::store::Store;

    /// Test environment with an isolated data directory.
    ///
    /// Every unit test that touches the record store builds its own `TestEnv`
    /// and opens the store directly against the temp directory, so tests run
    /// in parallel without sharing state.
    pub struct TestEnv {
        /// Isolated data directory for this test
        pub data_dir: TempDir,
    }

    impl TestEnv {
        /// Create a new test environment with an isolated data directory.
        pub fn new() -> Self {
            Self {
                data_dir: TempDir::new().unwrap(),
            }
        }

        /// Get the path to the isolated data directory.
        pub fn data_path(&self) -> &Path {
            self.data_dir.path()
        }

        /// Initialize a store rooted at this test environment.
        pub fn init_store(&self) -> Store {
            Store::init(self.data_path()).unwrap()
        }

        /// Open a previously initialized store.
        pub fn open_store(&self) -> Store {
            Store::open(self.data_path()).unwrap()
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Library-level error type for Waypoint operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not initialized: run `wp init` first")]
    NotInitialized,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Waypoint operations.
pub type Result<T> = std::result::Result<T, Error>;
