//! Unified progress facade.
//!
//! [`ProgressStore`] is the single entry point for all progress mutations.
//! Every write goes to the local record store first and always succeeds or
//! fails locally; when a remote client is attached, the matching API call is
//! fired afterwards on a best-effort basis. A remote failure is logged and
//! never rolls back the local write.
//!
//! The remote client is injected at construction: `None` is local-only mode,
//! `Some(client)` mirrors every mutation. Bulk reconciliation (`sync_all`,
//! `pull_remote`) is serialized through a single in-flight guard; a second
//! bulk call while one is running is rejected, not queued.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde_json::{Value, json};

use crate::migrate;
use crate::models::{
    self, ExportEnvelope, RecordKey, Snapshot, is_valid_module_id, sanitize_note, subtask_key,
};
use crate::Result;
use crate::remote::{RemoteClient, SyncError};
use crate::store::Store;

/// Facade over the record store and the optional remote mirror.
pub struct ProgressStore {
    store: Store,
    remote: Option<RemoteClient>,
    bulk_in_flight: AtomicBool,
}

impl ProgressStore {
    /// Open an initialized profile.
    ///
    /// Runs schema migration before anything else. Fails with
    /// [`Error::NotInitialized`] when the profile was never initialized -
    /// the one intentional hard failure, to catch integration bugs early.
    pub fn open(root: &Path, remote: Option<RemoteClient>) -> Result<Self> {
        let store = Store::open(root)?;
        migrate::run(&store)?;
        store.cleanup();

        Ok(Self {
            store,
            remote,
            bulk_in_flight: AtomicBool::new(false),
        })
    }

    /// Initialize a new profile and open it in local-only mode.
    pub fn init(root: &Path) -> Result<Self> {
        let store = Store::init(root)?;
        migrate::run(&store)?;

        Ok(Self {
            store,
            remote: None,
            bulk_in_flight: AtomicBool::new(false),
        })
    }

    /// Whether a remote client is attached.
    pub fn is_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Borrow the underlying record store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    // === Reads ===

    /// Typed snapshot of all data records.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            progress: serde_json::from_value(self.store.get(RecordKey::Progress))
                .unwrap_or_default(),
            subtasks: serde_json::from_value(self.store.get(RecordKey::Subtasks))
                .unwrap_or_default(),
            notes: serde_json::from_value(self.store.get(RecordKey::Notes)).unwrap_or_default(),
            badges: serde_json::from_value(self.store.get(RecordKey::Badges)).unwrap_or_default(),
            xp: self.xp(),
        }
    }

    /// Current XP total.
    pub fn xp(&self) -> u64 {
        self.store.get(RecordKey::Xp).as_u64().unwrap_or(0)
    }

    /// Note text for a module, or empty when none is stored.
    pub fn note(&self, module_id: u32) -> String {
        self.store
            .get(RecordKey::Notes)
            .get(module_id.to_string())
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Unlocked badges in unlock order.
    pub fn badges(&self) -> Vec<String> {
        serde_json::from_value(self.store.get(RecordKey::Badges)).unwrap_or_default()
    }

    /// Timestamp of the last successful remote write, if any.
    pub fn last_sync(&self) -> Option<String> {
        self.store
            .get(RecordKey::LastSync)
            .as_str()
            .map(str::to_string)
    }

    /// Stored schema version.
    pub fn version(&self) -> String {
        self.store
            .get(RecordKey::Version)
            .as_str()
            .unwrap_or(models::SCHEMA_VERSION)
            .to_string()
    }

    // === Mutations ===

    /// Set a module's completion state.
    ///
    /// Returns `false` for an invalid module ID or a failed local write.
    pub fn toggle_module(&self, module_id: u32, is_completed: bool) -> bool {
        if !is_valid_module_id(module_id) {
            eprintln!("Warning: invalid module ID {}", module_id);
            return false;
        }

        let mut progress = self.store.get(RecordKey::Progress);
        progress[module_id.to_string()] = Value::Bool(is_completed);
        if !self.store.save(RecordKey::Progress, &progress) {
            return false;
        }

        self.mirror("module progress", |client| {
            client.put_module(module_id, is_completed)
        });
        true
    }

    /// Flip a subtask's completion state and return the new value.
    ///
    /// Calling this twice in a row restores the original state. Returns
    /// `None` for an invalid module ID or a failed local write.
    pub fn toggle_subtask(&self, module_id: u32, task_index: u32) -> Option<bool> {
        if !is_valid_module_id(module_id) {
            eprintln!("Warning: invalid module ID {}", module_id);
            return None;
        }

        let key = subtask_key(module_id, task_index);
        let mut subtasks = self.store.get(RecordKey::Subtasks);
        let new_state = !subtasks.get(&key).and_then(Value::as_bool).unwrap_or(false);
        subtasks[&key] = Value::Bool(new_state);
        if !self.store.save(RecordKey::Subtasks, &subtasks) {
            return None;
        }

        self.mirror("subtask progress", |client| {
            client.put_subtask(module_id, task_index, new_state)
        });
        Some(new_state)
    }

    /// Store a module note, sanitized (trimmed, truncated to 5000 chars).
    pub fn save_note(&self, module_id: u32, text: &str) -> bool {
        if !is_valid_module_id(module_id) {
            eprintln!("Warning: invalid module ID {}", module_id);
            return false;
        }

        let sanitized = sanitize_note(text);
        let mut notes = self.store.get(RecordKey::Notes);
        notes[module_id.to_string()] = Value::String(sanitized.clone());
        if !self.store.save(RecordKey::Notes, &notes) {
            return false;
        }

        self.mirror("note", |client| client.put_note(module_id, &sanitized));
        true
    }

    /// Add a badge to the unlock list.
    ///
    /// Adding an already-unlocked badge is a successful no-op and is not
    /// re-sent to the remote.
    pub fn add_badge(&self, badge_name: &str) -> bool {
        let mut badges = self.store.get(RecordKey::Badges);
        let list = match badges.as_array_mut() {
            Some(list) => list,
            None => return false,
        };

        if list.iter().any(|b| b.as_str() == Some(badge_name)) {
            return true;
        }

        list.push(Value::String(badge_name.to_string()));
        if !self.store.save(RecordKey::Badges, &badges) {
            return false;
        }

        self.mirror("badge", |client| client.post_badge(badge_name));
        true
    }

    /// Add XP and return the new total.
    ///
    /// Returns `None` when the local write fails. The counter only grows
    /// through this operation.
    pub fn add_xp(&self, amount: u64) -> Option<u64> {
        let new_total = self.xp().saturating_add(amount);
        if !self.store.save(RecordKey::Xp, &json!(new_total)) {
            return None;
        }

        self.mirror("xp", |client| client.post_xp(amount));
        Some(new_total)
    }

    // === Bulk Reconciliation ===

    /// Push the full local snapshot to the remote in one call.
    ///
    /// Returns `false` when no remote is configured, another bulk operation
    /// is already running, or the push fails.
    pub fn sync_all(&self) -> bool {
        let Some(client) = &self.remote else {
            eprintln!("Warning: remote sync is not configured");
            return false;
        };

        if !self.begin_bulk() {
            return false;
        }

        let result = client.push_snapshot(&self.snapshot());
        let ok = match result {
            Ok(synced_at) => {
                self.stamp_last_sync(synced_at);
                true
            }
            Err(e) => {
                eprintln!("Warning: full sync failed: {}", e);
                false
            }
        };

        self.end_bulk();
        ok
    }

    /// Pull the remote snapshot and overwrite the local records.
    ///
    /// Remote wins unconditionally; there is no merge. Returns `false` when
    /// no remote is configured, another bulk operation is running, or the
    /// fetch fails.
    pub fn pull_remote(&self) -> bool {
        let Some(client) = &self.remote else {
            eprintln!("Warning: remote sync is not configured");
            return false;
        };

        if !self.begin_bulk() {
            return false;
        }

        let ok = match client.fetch_snapshot() {
            Ok(remote) => {
                let mut applied = true;
                applied &= self
                    .store
                    .save(RecordKey::Progress, &json!(remote.modules));
                applied &= self
                    .store
                    .save(RecordKey::Subtasks, &json!(remote.subtasks));
                applied &= self.store.save(RecordKey::Notes, &json!(remote.notes));
                applied &= self.store.save(RecordKey::Badges, &json!(remote.badges));
                applied &= self.store.save(RecordKey::Xp, &json!(remote.xp));
                self.stamp_last_sync(remote.last_sync);
                applied
            }
            Err(e) => {
                eprintln!("Warning: failed to load remote snapshot: {}", e);
                false
            }
        };

        self.end_bulk();
        ok
    }

    fn begin_bulk(&self) -> bool {
        if self
            .bulk_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            eprintln!("Warning: a bulk sync is already in progress");
            return false;
        }
        true
    }

    fn end_bulk(&self) {
        self.bulk_in_flight.store(false, Ordering::SeqCst);
    }

    // === Export / Import / Reset ===

    /// Produce the user-facing backup envelope.
    pub fn export_all(&self) -> ExportEnvelope {
        ExportEnvelope {
            version: self.version(),
            timestamp: Utc::now(),
            last_sync: self.last_sync(),
            data: self.snapshot(),
        }
    }

    /// Apply a previously exported envelope.
    ///
    /// The envelope must carry a `data` object; every key about to be
    /// overwritten is backed up first. Missing fields inside `data` fall
    /// back to their defaults.
    pub fn import_all(&self, envelope: &Value) -> bool {
        let Some(data) = envelope.get("data").and_then(Value::as_object) else {
            eprintln!("Warning: invalid export data: missing data field");
            return false;
        };

        for key in RecordKey::DATA {
            self.store.backup_record(key);
        }

        let mut ok = true;
        for key in RecordKey::DATA {
            let value = data.get(key.as_str()).cloned().unwrap_or(key.default_value());
            ok &= self.store.save(key, &value);
        }
        ok
    }

    /// Reset every record except the schema version to its default.
    ///
    /// In remote mode additionally issues a best-effort delete of all
    /// remote state; a remote failure is logged, not surfaced.
    pub fn reset_all(&self) -> bool {
        let mut ok = true;
        for key in RecordKey::ALL {
            if key == RecordKey::Version {
                continue;
            }
            ok &= self.store.save(key, &key.default_value());
        }

        if let Some(client) = &self.remote {
            if let Err(e) = client.delete_all() {
                match e {
                    SyncError::Unauthenticated => {
                        eprintln!("Warning: skipped remote reset: {}", e)
                    }
                    _ => eprintln!("Warning: failed to reset remote state: {}", e),
                }
            }
        }

        ok
    }

    // === Remote Plumbing ===

    /// Fire a best-effort remote call for one local mutation.
    ///
    /// On success the lastSync record is stamped; on failure the error is
    /// logged and the local write stands.
    fn mirror<F>(&self, what: &str, call: F)
    where
        F: FnOnce(&RemoteClient) -> std::result::Result<(), SyncError>,
    {
        let Some(client) = &self.remote else {
            return;
        };

        match call(client) {
            Ok(()) => self.stamp_last_sync(None),
            Err(SyncError::Unauthenticated) => {
                eprintln!("Warning: not authenticated, keeping {} local only", what);
            }
            Err(e) => {
                eprintln!("Warning: failed to sync {} with backend, keeping local: {}", what, e);
            }
        }
    }

    /// Record the time of the last successful remote write.
    fn stamp_last_sync(&self, server_time: Option<String>) {
        let ts = server_time.unwrap_or_else(|| Utc::now().to_rfc3339());
        self.store.save(RecordKey::LastSync, &Value::String(ts));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::models::MAX_NOTE_LEN;
    use crate::test_utils::TestEnv;

    fn local_store(env: &TestEnv) -> ProgressStore {
        ProgressStore::init(env.data_path()).unwrap()
    }

    /// Remote client pointed at a dead loopback port: every call fails
    /// fast with a network error, exercising the best-effort paths.
    fn unreachable_remote(token: Option<&str>) -> RemoteClient {
        RemoteClient::new("http://127.0.0.1:1", token.map(str::to_string))
    }

    fn remote_store(env: &TestEnv, token: Option<&str>) -> ProgressStore {
        ProgressStore::init(env.data_path()).unwrap();
        ProgressStore::open(env.data_path(), Some(unreachable_remote(token))).unwrap()
    }

    #[test]
    fn test_open_before_init_fails() {
        let env = TestEnv::new();
        let result = ProgressStore::open(env.data_path(), None);
        assert!(matches!(result, Err(Error::NotInitialized)));
    }

    #[test]
    fn test_toggle_module_then_get() {
        let env = TestEnv::new();
        let store = local_store(&env);

        assert!(store.toggle_module(1, true));
        assert!(store.toggle_module(2, true));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.progress.get("1"), Some(&true));
        assert_eq!(snapshot.progress.get("2"), Some(&true));
        assert_eq!(snapshot.progress.len(), 2);
    }

    #[test]
    fn test_toggle_module_off() {
        let env = TestEnv::new();
        let store = local_store(&env);

        assert!(store.toggle_module(5, true));
        assert!(store.toggle_module(5, false));
        assert_eq!(store.snapshot().progress.get("5"), Some(&false));
    }

    #[test]
    fn test_toggle_module_rejects_invalid_id() {
        let env = TestEnv::new();
        let store = local_store(&env);

        assert!(!store.toggle_module(0, true));
        assert!(!store.toggle_module(21, true));
        assert!(store.snapshot().progress.is_empty());
    }

    #[test]
    fn test_toggle_subtask_twice_restores_state() {
        let env = TestEnv::new();
        let store = local_store(&env);

        assert_eq!(store.toggle_subtask(3, 1), Some(true));
        assert_eq!(store.toggle_subtask(3, 1), Some(false));
        assert_eq!(store.snapshot().subtasks.get("3-1"), Some(&false));
    }

    #[test]
    fn test_toggle_subtask_rejects_invalid_module() {
        let env = TestEnv::new();
        let store = local_store(&env);
        assert_eq!(store.toggle_subtask(0, 1), None);
    }

    #[test]
    fn test_save_note_truncates_to_limit() {
        let env = TestEnv::new();
        let store = local_store(&env);

        let long = "n".repeat(MAX_NOTE_LEN + 500);
        assert!(store.save_note(2, &long));
        assert_eq!(store.note(2).chars().count(), MAX_NOTE_LEN);
    }

    #[test]
    fn test_save_note_trims_whitespace() {
        let env = TestEnv::new();
        let store = local_store(&env);

        assert!(store.save_note(1, "  remember locators  "));
        assert_eq!(store.note(1), "remember locators");
    }

    #[test]
    fn test_note_for_module_without_note_is_empty() {
        let env = TestEnv::new();
        let store = local_store(&env);
        assert_eq!(store.note(7), "");
    }

    #[test]
    fn test_add_badge_twice_stores_once() {
        let env = TestEnv::new();
        let store = local_store(&env);

        assert!(store.add_badge("core"));
        assert!(store.add_badge("core"));

        let badges = store.badges();
        assert_eq!(badges, vec!["core".to_string()]);
    }

    #[test]
    fn test_badges_preserve_unlock_order() {
        let env = TestEnv::new();
        let store = local_store(&env);

        store.add_badge("core");
        store.add_badge("technical");
        store.add_badge("automation");

        assert_eq!(store.badges(), vec!["core", "technical", "automation"]);
    }

    #[test]
    fn test_add_xp_accumulates() {
        let env = TestEnv::new();
        let store = local_store(&env);

        assert_eq!(store.add_xp(500), Some(500));
        assert_eq!(store.add_xp(600), Some(1100));
        assert_eq!(store.xp(), 1100);
    }

    #[test]
    fn test_remote_mode_without_token_still_writes_locally() {
        let env = TestEnv::new();
        let store = remote_store(&env, None);

        assert!(store.toggle_module(1, true));
        assert_eq!(store.snapshot().progress.get("1"), Some(&true));
        // No remote write happened, so lastSync is untouched
        assert_eq!(store.last_sync(), None);
    }

    #[test]
    fn test_remote_failure_does_not_roll_back_local() {
        let env = TestEnv::new();
        let store = remote_store(&env, Some("wpt_test"));

        // The remote is unreachable; the local write must stand
        assert!(store.toggle_module(4, true));
        assert!(store.save_note(4, "api drills"));
        assert_eq!(store.snapshot().progress.get("4"), Some(&true));
        assert_eq!(store.note(4), "api drills");
        assert_eq!(store.last_sync(), None);
    }

    #[test]
    fn test_sync_all_without_remote_is_rejected() {
        let env = TestEnv::new();
        let store = local_store(&env);
        assert!(!store.sync_all());
    }

    #[test]
    fn test_pull_remote_without_remote_is_rejected() {
        let env = TestEnv::new();
        let store = local_store(&env);
        assert!(!store.pull_remote());
    }

    #[test]
    fn test_sync_all_failure_clears_in_flight_guard() {
        let env = TestEnv::new();
        let store = remote_store(&env, Some("wpt_test"));

        // Both calls fail on the network, but the second is not rejected
        // by a stuck guard (it gets as far as the network again).
        assert!(!store.sync_all());
        assert!(!store.bulk_in_flight.load(Ordering::SeqCst));
        assert!(!store.pull_remote());
        assert!(!store.bulk_in_flight.load(Ordering::SeqCst));
    }

    #[test]
    fn test_export_reset_import_round_trip() {
        let env = TestEnv::new();
        let store = local_store(&env);

        store.toggle_module(1, true);
        store.toggle_module(2, true);
        store.toggle_subtask(1, 0);
        store.save_note(1, "fundamentals done");
        store.add_badge("core");
        store.add_xp(250);

        let before = store.snapshot();
        let exported = serde_json::to_value(store.export_all()).unwrap();

        assert!(store.reset_all());
        assert_eq!(store.snapshot(), Snapshot::default());

        assert!(store.import_all(&exported));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_import_rejects_envelope_without_data() {
        let env = TestEnv::new();
        let store = local_store(&env);

        store.add_xp(100);
        assert!(!store.import_all(&json!({"version": "2.0"})));
        // Nothing was touched
        assert_eq!(store.xp(), 100);
    }

    #[test]
    fn test_import_missing_fields_fall_back_to_defaults() {
        let env = TestEnv::new();
        let store = local_store(&env);

        store.add_badge("core");
        store.add_xp(300);

        let partial = json!({"data": {"progress": {"1": true}}});
        assert!(store.import_all(&partial));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.progress.get("1"), Some(&true));
        assert!(snapshot.badges.is_empty());
        assert_eq!(snapshot.xp, 0);
    }

    #[test]
    fn test_reset_all_preserves_schema_version() {
        let env = TestEnv::new();
        let store = local_store(&env);

        store.toggle_module(1, true);
        assert!(store.reset_all());

        assert_eq!(store.version(), models::SCHEMA_VERSION);
        assert!(store.snapshot().progress.is_empty());
        assert_eq!(store.last_sync(), None);
    }

    #[test]
    fn test_completion_percent_two_of_twelve() {
        use crate::models::catalog::analytics;

        let env = TestEnv::new();
        let store = local_store(&env);

        store.toggle_module(1, true);
        store.toggle_module(2, true);

        let a = analytics(&store.snapshot());
        assert_eq!(a.percent, 17);
    }
}
