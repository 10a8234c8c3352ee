//! Record store for Waypoint data.
//!
//! Persists the named JSON records (progress, subtasks, notes, badges, xp,
//! version, lastSync) as one file per record under a profile data directory
//! at `~/.local/share/waypoint/<profile-hash>/`.
//!
//! Guarantees:
//! - Reads never fail: a missing, corrupt, or wrong-shaped record resolves
//!   to the key's declared default (after a best-effort backup restore).
//! - Writes are validated against the key's declared shape and performed
//!   atomically (temp file + rename).
//! - The critical records (progress, subtasks) get a timestamped backup
//!   before every overwrite; the 3 most recent backups per key are kept and
//!   backups older than 7 days are purged on cleanup.
//!
//! The profile's `config.kdl` and `state.kdl` also live in this directory;
//! the read/write helpers for those are here because the store owns the
//! directory layout.

use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::{WaypointConfig, WaypointState};
use crate::models::RecordKey;
use crate::{Error, Result};

/// Environment variable overriding the base data directory (used by tests
/// and scripting).
pub const DATA_DIR_ENV: &str = "WP_DATA_DIR";

/// Environment variable overriding the system config directory.
pub const CONFIG_DIR_ENV: &str = "WP_CONFIG_DIR";

/// Number of backups kept per critical key.
const MAX_BACKUPS_PER_KEY: usize = 3;

/// Backups older than this many days are purged on cleanup.
const BACKUP_RETENTION_DAYS: i64 = 7;

/// Record store for a single profile.
pub struct Store {
    /// Root directory for this profile's data
    root: PathBuf,
}

impl Store {
    /// Open storage for an initialized profile directory.
    pub fn open(root: &Path) -> Result<Self> {
        if !root.join(RecordKey::Version.file_name()).exists() {
            return Err(Error::NotInitialized);
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Initialize storage for a new profile directory.
    ///
    /// Creates the directory and writes every record that does not yet
    /// exist with its default value. Safe to call on an existing profile.
    pub fn init(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;

        let store = Self {
            root: root.to_path_buf(),
        };
        for key in RecordKey::ALL {
            if !store.record_path(key).exists() {
                store.write_atomic(key, &key.default_value())?;
            }
        }

        Ok(store)
    }

    /// Check if storage exists for the given profile directory.
    pub fn exists(root: &Path) -> bool {
        root.join(RecordKey::Version.file_name()).exists()
    }

    /// Get the storage root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the main record file for a key.
    pub fn record_path(&self, key: RecordKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    // === Record Operations ===

    /// Read a record, falling back to the key's default.
    ///
    /// Never returns an error. A record that is missing yields the default;
    /// one that fails to parse triggers a backup restore attempt; one that
    /// parses but has the wrong shape is ignored with a warning.
    pub fn get(&self, key: RecordKey) -> Value {
        let path = self.record_path(key);

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return key.default_value();
            }
            Err(e) => {
                eprintln!("Warning: failed to read {}: {}", key, e);
                return key.default_value();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(value) if key.validate(&value) => value,
            Ok(_) => {
                eprintln!("Warning: record {} has unexpected shape, using default", key);
                key.default_value()
            }
            Err(e) => {
                eprintln!("Warning: record {} is corrupt ({}), trying backup", key, e);
                self.restore_from_backup(key)
                    .unwrap_or_else(|| key.default_value())
            }
        }
    }

    /// Write a record after shape validation.
    ///
    /// Returns `false` when the value fails validation or the write fails.
    /// A write that fails for lack of space evicts old backups and retries
    /// exactly once. Critical keys get a backup of the previous contents
    /// before the overwrite.
    pub fn save(&self, key: RecordKey, value: &Value) -> bool {
        if !key.validate(value) {
            eprintln!("Warning: rejected save of {}: value has wrong shape", key);
            return false;
        }

        if key.is_critical() {
            self.backup(key);
        }

        match self.write_atomic(key, value) {
            Ok(()) => true,
            Err(Error::Io(e)) if is_out_of_space(&e) => {
                eprintln!("Warning: out of space saving {}, evicting backups and retrying", key);
                self.evict_backups();
                match self.write_atomic(key, value) {
                    Ok(()) => true,
                    Err(e) => {
                        eprintln!("Warning: failed to save {} after cleanup: {}", key, e);
                        false
                    }
                }
            }
            Err(e) => {
                eprintln!("Warning: failed to save {}: {}", key, e);
                false
            }
        }
    }

    /// Serialize and atomically replace the record file.
    fn write_atomic(&self, key: RecordKey, value: &Value) -> Result<()> {
        let serialized = serde_json::to_string(value)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(serialized.as_bytes())?;
        tmp.persist(self.record_path(key))
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    // === Backups ===

    /// Explicitly back up a record (used before bulk overwrites like import).
    pub fn backup_record(&self, key: RecordKey) {
        self.backup(key);
    }

    /// Copy the current contents of a record to a timestamped backup file,
    /// then prune to the most recent [`MAX_BACKUPS_PER_KEY`].
    fn backup(&self, key: RecordKey) {
        let path = self.record_path(key);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            // Nothing to back up yet
            Err(_) => return,
        };

        let mut ts = Utc::now().timestamp_millis();
        let mut backup_path = self.backup_path(key, ts);
        while backup_path.exists() {
            ts += 1;
            backup_path = self.backup_path(key, ts);
        }

        if let Err(e) = fs::write(&backup_path, raw) {
            eprintln!("Warning: failed to back up {}: {}", key, e);
            return;
        }

        // Prune old backups for this key
        let backups = self.list_backups(key);
        for (path, _) in backups.iter().skip(MAX_BACKUPS_PER_KEY) {
            let _ = fs::remove_file(path);
        }
    }

    fn backup_path(&self, key: RecordKey, timestamp_millis: i64) -> PathBuf {
        let stem = key.file_name().trim_end_matches(".json");
        self.root
            .join(format!("{}.backup.{}.json", stem, timestamp_millis))
    }

    /// List backup files for a key, newest first.
    fn list_backups(&self, key: RecordKey) -> Vec<(PathBuf, i64)> {
        let stem = key.file_name().trim_end_matches(".json");
        let prefix = format!("{}.backup.", stem);

        let mut backups = Vec::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => return backups,
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(rest) = name.strip_prefix(&prefix) {
                if let Some(ts) = rest.strip_suffix(".json") {
                    if let Ok(ts) = ts.parse::<i64>() {
                        backups.push((entry.path(), ts));
                    }
                }
            }
        }
        backups.sort_by(|a, b| b.1.cmp(&a.1));
        backups
    }

    /// Restore the newest parseable backup over the main record.
    ///
    /// Returns the restored value, or `None` when no usable backup exists
    /// (the corrupt record is left in place for the next save to overwrite).
    fn restore_from_backup(&self, key: RecordKey) -> Option<Value> {
        for (path, _) in self.list_backups(key) {
            let raw = match fs::read_to_string(&path) {
                Ok(raw) => raw,
                Err(_) => continue,
            };
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) if key.validate(&value) => {
                    if self.write_atomic(key, &value).is_ok() {
                        eprintln!(
                            "Recovered {} from backup {}",
                            key,
                            path.file_name().unwrap_or_default().to_string_lossy()
                        );
                    }
                    return Some(value);
                }
                _ => continue,
            }
        }
        None
    }

    /// Remove all but the newest backup for each critical key.
    ///
    /// Called when a write fails for lack of space.
    fn evict_backups(&self) {
        for key in RecordKey::ALL {
            if !key.is_critical() {
                continue;
            }
            for (path, _) in self.list_backups(key).iter().skip(1) {
                let _ = fs::remove_file(path);
            }
        }
    }

    /// Purge backups older than [`BACKUP_RETENTION_DAYS`].
    pub fn cleanup(&self) {
        let cutoff = Utc::now().timestamp_millis() - BACKUP_RETENTION_DAYS * 24 * 60 * 60 * 1000;
        for key in RecordKey::ALL {
            for (path, ts) in self.list_backups(key) {
                if ts < cutoff {
                    let _ = fs::remove_file(&path);
                }
            }
        }
    }

    // === Config / State Files ===

    /// Path of the profile-level config.kdl.
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.kdl")
    }

    /// Path of the profile-level state.kdl (secrets, 0600).
    pub fn state_path(&self) -> PathBuf {
        self.root.join("state.kdl")
    }

    /// Read the profile-level config.kdl, or defaults when absent.
    pub fn read_config(&self) -> Result<WaypointConfig> {
        read_config_file(&self.config_path())
    }

    /// Write the profile-level config.kdl.
    pub fn write_config(&self, config: &WaypointConfig) -> Result<()> {
        write_config_file(&self.config_path(), config)
    }

    /// Read the profile-level state.kdl, or defaults when absent.
    pub fn read_state(&self) -> Result<WaypointState> {
        read_state_file(&self.state_path())
    }

    /// Write the profile-level state.kdl with 0600 permissions.
    pub fn write_state(&self, state: &WaypointState) -> Result<()> {
        write_state_file(&self.state_path(), state)
    }

    /// Path of the system config.kdl (`~/.config/waypoint/config.kdl`).
    pub fn system_config_path() -> Option<PathBuf> {
        let base = match env::var(CONFIG_DIR_ENV) {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()?.join("waypoint"),
        };
        Some(base.join("config.kdl"))
    }

    /// Path of the system state.kdl (`~/.local/share/waypoint/state.kdl`).
    pub fn system_state_path() -> Option<PathBuf> {
        Some(data_base_dir().ok()?.join("state.kdl"))
    }

    /// Read the system config.kdl, or defaults when absent.
    pub fn read_system_config() -> Result<WaypointConfig> {
        match Self::system_config_path() {
            Some(path) => read_config_file(&path),
            None => Ok(WaypointConfig::default()),
        }
    }

    /// Write the system config.kdl.
    pub fn write_system_config(config: &WaypointConfig) -> Result<()> {
        let path = Self::system_config_path()
            .ok_or_else(|| Error::Other("Could not determine config directory".to_string()))?;
        write_config_file(&path, config)
    }

    /// Read the system state.kdl, or defaults when absent.
    pub fn read_system_state() -> Result<WaypointState> {
        match Self::system_state_path() {
            Some(path) => read_state_file(&path),
            None => Ok(WaypointState::default()),
        }
    }

    /// Write the system state.kdl with 0600 permissions.
    pub fn write_system_state(state: &WaypointState) -> Result<()> {
        let path = Self::system_state_path()
            .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
        write_state_file(&path, state)
    }
}

fn read_config_file(path: &Path) -> Result<WaypointConfig> {
    match fs::read_to_string(path) {
        Ok(raw) => {
            let doc = raw
                .parse::<kdl::KdlDocument>()
                .map_err(|e| Error::Other(format!("Invalid KDL in {}: {}", path.display(), e)))?;
            Ok(WaypointConfig::from_kdl(&doc))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(WaypointConfig::default()),
        Err(e) => Err(Error::Io(e)),
    }
}

fn write_config_file(path: &Path, config: &WaypointConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, config.to_kdl().to_string())?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(
            path,
            fs::Permissions::from_mode(crate::config::CONFIG_FILE_MODE),
        )?;
    }
    Ok(())
}

fn read_state_file(path: &Path) -> Result<WaypointState> {
    match fs::read_to_string(path) {
        Ok(raw) => {
            let doc = raw
                .parse::<kdl::KdlDocument>()
                .map_err(|e| Error::Other(format!("Invalid KDL in {}: {}", path.display(), e)))?;
            Ok(WaypointState::from_kdl(&doc))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(WaypointState::default()),
        Err(e) => Err(Error::Io(e)),
    }
}

fn write_state_file(path: &Path, state: &WaypointState) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, state.to_kdl().to_string())?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(
            path,
            fs::Permissions::from_mode(crate::config::STATE_FILE_MODE),
        )?;
    }
    Ok(())
}

fn is_out_of_space(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::StorageFull | std::io::ErrorKind::QuotaExceeded
    )
}

/// Base directory holding all profile data directories.
///
/// `WP_DATA_DIR` overrides the default of `~/.local/share/waypoint/`.
pub fn data_base_dir() -> Result<PathBuf> {
    match env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => {
            let data_dir = dirs::data_dir()
                .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
            Ok(data_dir.join("waypoint"))
        }
    }
}

/// Get the data directory for a profile.
///
/// Uses a hash of the profile name to create a unique directory under the
/// base data directory.
pub fn data_root(profile: &str) -> Result<PathBuf> {
    Ok(data_base_dir()?.join(profile_hash(profile)))
}

/// First 12 hex characters of the SHA-256 of the profile name.
pub fn profile_hash(profile: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(profile.as_bytes());
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    hash_hex[..12].to_string()
}
