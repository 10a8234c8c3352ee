//! Schema migration for stored records.
//!
//! At open time the stored `version` record is compared against
//! [`SCHEMA_VERSION`]; on a mismatch the registered steps for that
//! transition run, then the new version is stamped. The step table is the
//! extensible hook - the only transition known today needs no data
//! transform beyond the stamp.

use serde_json::Value;

use crate::Result;
use crate::models::{RecordKey, SCHEMA_VERSION};
use crate::store::Store;

/// Bring stored records up to the current schema version.
///
/// Runs at facade open time, before any other record access. A store
/// already at the current version is left untouched.
pub fn run(store: &Store) -> Result<()> {
    let stamped = store.record_path(RecordKey::Version).exists();
    let stored = store
        .get(RecordKey::Version)
        .as_str()
        .map(str::to_string)
        .unwrap_or_default();

    if stamped && stored == SCHEMA_VERSION {
        return Ok(());
    }

    eprintln!(
        "Migrating data from version {:?} to {}",
        stored, SCHEMA_VERSION
    );
    apply_steps(store, &stored);

    store.save(RecordKey::Version, &Value::String(SCHEMA_VERSION.to_string()));
    Ok(())
}

/// Apply the migration steps registered for a version transition.
fn apply_steps(_store: &Store, from_version: &str) {
    match from_version {
        // 1.0 kept the same record shapes; xp and lastSync records are
        // created lazily on first read, so only the stamp is needed.
        "1.0" => {}
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_current_version_is_untouched() {
        let env = TestEnv::new();
        let store = env.init_store();

        run(&store).unwrap();
        assert_eq!(store.get(RecordKey::Version), json!(SCHEMA_VERSION));
    }

    #[test]
    fn test_old_version_is_stamped() {
        let env = TestEnv::new();
        let store = env.init_store();

        store.save(RecordKey::Version, &json!("1.0"));
        run(&store).unwrap();

        assert_eq!(store.get(RecordKey::Version), json!(SCHEMA_VERSION));
    }

    #[test]
    fn test_migration_preserves_existing_records() {
        let env = TestEnv::new();
        let store = env.init_store();

        store.save(RecordKey::Progress, &json!({"1": true}));
        store.save(RecordKey::Version, &json!("1.0"));

        run(&store).unwrap();

        assert_eq!(store.get(RecordKey::Progress), json!({"1": true}));
    }

    #[test]
    fn test_missing_version_record_is_stamped() {
        let env = TestEnv::new();
        let store = env.init_store();

        fs::remove_file(store.record_path(RecordKey::Version)).unwrap();
        run(&store).unwrap();

        assert!(store.record_path(RecordKey::Version).exists());
        assert_eq!(store.get(RecordKey::Version), json!(SCHEMA_VERSION));
    }
}
