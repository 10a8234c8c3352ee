//! Command implementations for the Waypoint CLI.
//!
//! Each function here is the business logic behind one `wp` subcommand: it
//! opens the progress store for the profile's data directory, performs the
//! operation, and returns a result struct implementing [`Output`] so the
//! binary can print it as JSON or human-readable text.

use std::path::Path;

use serde::Serialize;
use serde_json::json;

use crate::config::{
    ConfigOverrides, OutputFormat, SyncMode, WaypointState, resolve_config, resolve_state,
};
use crate::models::catalog::{self, Analytics};
use crate::models::{ExportEnvelope, MAX_MODULE_ID, is_valid_module_id};
use crate::progress::ProgressStore;
use crate::remote::RemoteClient;
use crate::store::Store;
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn to_json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

/// Open the progress store for a profile, wiring up the remote client when
/// the resolved configuration selects remote mode.
fn open_progress(root: &Path) -> Result<ProgressStore> {
    let store = Store::open(root)?;
    let config = resolve_config(&store, &ConfigOverrides::default())?;
    let state = resolve_state(&store)?;

    let remote = match (config.sync_mode(), config.backend_url()) {
        (SyncMode::Remote, Some(url)) => Some(RemoteClient::new(
            url,
            state.token().map(str::to_string),
        )),
        (SyncMode::Remote, None) => {
            eprintln!("Warning: sync mode is remote but no backend-url is configured");
            None
        }
        (SyncMode::Local, _) => None,
    };

    ProgressStore::open(root, remote)
}

fn require_module_id(module: u32) -> Result<()> {
    if !is_valid_module_id(module) {
        return Err(Error::InvalidInput(format!(
            "module ID must be 1-{}, got {}",
            MAX_MODULE_ID, module
        )));
    }
    Ok(())
}

// === init ===

/// Result of `wp init`.
#[derive(Debug, Serialize)]
pub struct InitResult {
    /// Data directory that was initialized
    pub root: String,
    /// Schema version stamped into the new store
    pub version: String,
    /// False when the profile already existed
    pub created: bool,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.created {
            format!("Initialized waypoint data in {}", self.root)
        } else {
            format!("Waypoint data already initialized in {}", self.root)
        }
    }
}

/// Initialize the profile's data directory.
pub fn init(root: &Path) -> Result<InitResult> {
    let created = !Store::exists(root);
    let store = ProgressStore::init(root)?;

    Ok(InitResult {
        root: root.display().to_string(),
        version: store.version(),
        created,
    })
}

// === toggle ===

/// Result of `wp toggle`.
#[derive(Debug, Serialize)]
pub struct ToggleResult {
    /// Module that was toggled
    pub module: u32,
    /// New completion state
    pub completed: bool,
    /// Completion percentage after the toggle
    pub percent: u32,
}

impl Output for ToggleResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let state = if self.completed { "done" } else { "not done" };
        format!(
            "Module {} marked {} ({}% complete)",
            self.module, state, self.percent
        )
    }
}

/// Set a module's completion state.
pub fn toggle(root: &Path, module: u32, completed: bool) -> Result<ToggleResult> {
    require_module_id(module)?;
    let store = open_progress(root)?;

    if !store.toggle_module(module, completed) {
        return Err(Error::Other(format!(
            "failed to save progress for module {}",
            module
        )));
    }

    let analytics = catalog::analytics(&store.snapshot());
    Ok(ToggleResult {
        module,
        completed,
        percent: analytics.percent,
    })
}

// === subtask ===

/// Result of `wp subtask`.
#[derive(Debug, Serialize)]
pub struct SubtaskResult {
    /// Module the subtask belongs to
    pub module: u32,
    /// Task index within the module
    pub task: u32,
    /// New completion state after the flip
    pub completed: bool,
}

impl Output for SubtaskResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let state = if self.completed { "done" } else { "not done" };
        format!("Subtask {}-{} marked {}", self.module, self.task, state)
    }
}

/// Flip one checklist item of a module.
pub fn subtask(root: &Path, module: u32, task: u32) -> Result<SubtaskResult> {
    require_module_id(module)?;
    let store = open_progress(root)?;

    match store.toggle_subtask(module, task) {
        Some(completed) => Ok(SubtaskResult {
            module,
            task,
            completed,
        }),
        None => Err(Error::Other(format!(
            "failed to save subtask {}-{}",
            module, task
        ))),
    }
}

// === note ===

/// Result of `wp note set` / `wp note show`.
#[derive(Debug, Serialize)]
pub struct NoteResult {
    /// Module the note belongs to
    pub module: u32,
    /// Stored note text (after sanitization)
    pub note: String,
}

impl Output for NoteResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.note.is_empty() {
            format!("No note for module {}", self.module)
        } else {
            format!("Module {}: {}", self.module, self.note)
        }
    }
}

/// Store a note for a module.
pub fn note_set(root: &Path, module: u32, text: &str) -> Result<NoteResult> {
    require_module_id(module)?;
    let store = open_progress(root)?;

    if !store.save_note(module, text) {
        return Err(Error::Other(format!(
            "failed to save note for module {}",
            module
        )));
    }

    Ok(NoteResult {
        module,
        note: store.note(module),
    })
}

/// Show a module's note.
pub fn note_show(root: &Path, module: u32) -> Result<NoteResult> {
    require_module_id(module)?;
    let store = open_progress(root)?;

    Ok(NoteResult {
        module,
        note: store.note(module),
    })
}

// === badge ===

/// Result of `wp badge add` / `wp badge list`.
#[derive(Debug, Serialize)]
pub struct BadgeResult {
    /// Unlocked badges in unlock order
    pub badges: Vec<String>,
    /// Badge that was just added, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added: Option<String>,
}

impl Output for BadgeResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.badges.is_empty() {
            "No badges unlocked yet".to_string()
        } else {
            format!("Badges: {}", self.badges.join(", "))
        }
    }
}

/// Record an unlocked badge.
pub fn badge_add(root: &Path, name: &str) -> Result<BadgeResult> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("badge name must not be empty".to_string()));
    }

    let store = open_progress(root)?;
    if !store.add_badge(name) {
        return Err(Error::Other(format!("failed to save badge {}", name)));
    }

    Ok(BadgeResult {
        badges: store.badges(),
        added: Some(name.to_string()),
    })
}

/// List unlocked badges.
pub fn badge_list(root: &Path) -> Result<BadgeResult> {
    let store = open_progress(root)?;
    Ok(BadgeResult {
        badges: store.badges(),
        added: None,
    })
}

// === xp ===

/// Result of `wp xp add` / `wp xp show`.
#[derive(Debug, Serialize)]
pub struct XpResult {
    /// Amount added by this command (0 for show)
    pub added: u64,
    /// XP total after the command
    pub total: u64,
}

impl Output for XpResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.added > 0 {
            format!("+{} XP (total {})", self.added, self.total)
        } else {
            format!("{} XP", self.total)
        }
    }
}

/// Add to the XP counter.
pub fn xp_add(root: &Path, amount: u64) -> Result<XpResult> {
    let store = open_progress(root)?;
    match store.add_xp(amount) {
        Some(total) => Ok(XpResult {
            added: amount,
            total,
        }),
        None => Err(Error::Other("failed to save XP".to_string())),
    }
}

/// Show the XP total.
pub fn xp_show(root: &Path) -> Result<XpResult> {
    let store = open_progress(root)?;
    Ok(XpResult {
        added: 0,
        total: store.xp(),
    })
}

// === status ===

/// One module row in the status output.
#[derive(Debug, Serialize)]
pub struct ModuleStatus {
    /// Module ID
    pub id: u32,
    /// Module title from the catalog
    pub title: String,
    /// XP reward for completion
    pub xp: u64,
    /// Whether the module is completed
    pub completed: bool,
    /// Completed checklist items out of the total
    pub tasks_done: usize,
    /// Total checklist items
    pub tasks_total: usize,
}

/// Result of `wp status`.
#[derive(Debug, Serialize)]
pub struct StatusResult {
    /// Per-module rows in catalog order
    pub modules: Vec<ModuleStatus>,
    /// Derived analytics (percent, earned XP, badges, active module)
    pub analytics: Analytics,
    /// Stored XP counter
    pub xp: u64,
    /// Unlocked badges in unlock order
    pub badges: Vec<String>,
    /// Last successful remote write, if any
    pub last_sync: Option<String>,
    /// Whether a remote mirror is configured
    pub remote: bool,
}

impl Output for StatusResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = String::new();

        for m in &self.modules {
            let mark = if m.completed { "x" } else { " " };
            let active = if self.analytics.active_module == Some(m.id) {
                "  <- active"
            } else {
                ""
            };
            out.push_str(&format!(
                "[{}] {:2}. {} (+{} XP, {}/{} tasks){}\n",
                mark, m.id, m.title, m.xp, m.tasks_done, m.tasks_total, active
            ));
        }

        out.push_str(&format!(
            "\n{}/{} modules complete ({}%), {} XP earned, {} XP banked\n",
            self.analytics.completed,
            self.analytics.total,
            self.analytics.percent,
            self.analytics.earned_xp,
            self.xp
        ));

        if self.badges.is_empty() {
            out.push_str("No badges unlocked\n");
        } else {
            out.push_str(&format!("Badges: {}\n", self.badges.join(", ")));
        }

        match &self.last_sync {
            Some(ts) => out.push_str(&format!("Last sync: {}\n", ts)),
            None if self.remote => out.push_str("Last sync: never\n"),
            None => out.push_str("Sync: local only\n"),
        }

        out
    }
}

/// Show the full dashboard: modules, analytics, XP, badges, sync state.
pub fn status(root: &Path) -> Result<StatusResult> {
    let store = open_progress(root)?;
    let snapshot = store.snapshot();
    let analytics = catalog::analytics(&snapshot);

    let modules = catalog::catalog()
        .modules
        .iter()
        .map(|m| {
            let completed = snapshot
                .progress
                .get(&m.id.to_string())
                .copied()
                .unwrap_or(false);
            let tasks_done = (0..m.tasks.len())
                .filter(|i| {
                    snapshot
                        .subtasks
                        .get(&crate::models::subtask_key(m.id, *i as u32))
                        .copied()
                        .unwrap_or(false)
                })
                .count();
            ModuleStatus {
                id: m.id,
                title: m.title.clone(),
                xp: m.xp,
                completed,
                tasks_done,
                tasks_total: m.tasks.len(),
            }
        })
        .collect();

    Ok(StatusResult {
        modules,
        analytics,
        xp: snapshot.xp,
        badges: snapshot.badges,
        last_sync: store.last_sync(),
        remote: store.is_remote(),
    })
}

// === sync ===

/// Result of `wp sync push` / `wp sync pull`.
#[derive(Debug, Serialize)]
pub struct SyncResult {
    /// "push" or "pull"
    pub direction: String,
    /// Last sync timestamp after the operation
    pub last_sync: Option<String>,
}

impl Output for SyncResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        match &self.last_sync {
            Some(ts) => format!("Sync {} completed at {}", self.direction, ts),
            None => format!("Sync {} completed", self.direction),
        }
    }
}

/// Push the full local snapshot to the remote API.
pub fn sync_push(root: &Path) -> Result<SyncResult> {
    let store = open_progress(root)?;
    if !store.is_remote() {
        return Err(Error::Sync(
            "remote sync is not configured; set sync \"remote\" and a backend-url".to_string(),
        ));
    }

    if !store.sync_all() {
        return Err(Error::Sync("full sync failed".to_string()));
    }

    Ok(SyncResult {
        direction: "push".to_string(),
        last_sync: store.last_sync(),
    })
}

/// Pull the remote snapshot, overwriting local records.
pub fn sync_pull(root: &Path) -> Result<SyncResult> {
    let store = open_progress(root)?;
    if !store.is_remote() {
        return Err(Error::Sync(
            "remote sync is not configured; set sync \"remote\" and a backend-url".to_string(),
        ));
    }

    if !store.pull_remote() {
        return Err(Error::Sync("failed to load remote snapshot".to_string()));
    }

    Ok(SyncResult {
        direction: "pull".to_string(),
        last_sync: store.last_sync(),
    })
}

// === export / import ===

/// Result of `wp export`.
#[derive(Debug, Serialize)]
pub struct ExportResult {
    /// File the envelope was written to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_to: Option<String>,
    /// The exported envelope
    pub envelope: ExportEnvelope,
}

impl Output for ExportResult {
    fn to_json(&self) -> String {
        match &self.written_to {
            // The envelope already landed in the file; keep stdout short
            Some(path) => to_json_string(&json!({"exported": path})),
            None => to_json_string(&self.envelope),
        }
    }

    fn to_human(&self) -> String {
        let data = &self.envelope.data;
        let summary = format!(
            "{} modules, {} subtasks, {} notes, {} badges, {} XP",
            data.progress.len(),
            data.subtasks.len(),
            data.notes.len(),
            data.badges.len(),
            data.xp
        );
        match &self.written_to {
            Some(path) => format!("Exported {} to {}", summary, path),
            None => format!(
                "{}\n{}",
                summary,
                serde_json::to_string_pretty(&self.envelope).unwrap_or_default()
            ),
        }
    }
}

/// Produce the backup envelope, optionally writing it to a file.
pub fn export(root: &Path, output: Option<&Path>) -> Result<ExportResult> {
    let store = open_progress(root)?;
    let envelope = store.export_all();

    let written_to = match output {
        Some(path) => {
            let serialized = serde_json::to_string_pretty(&envelope)?;
            std::fs::write(path, serialized)?;
            Some(path.display().to_string())
        }
        None => None,
    };

    Ok(ExportResult {
        written_to,
        envelope,
    })
}

/// Result of `wp import`.
#[derive(Debug, Serialize)]
pub struct ImportResult {
    /// File the envelope was read from
    pub source: String,
    /// Completion percentage after the import
    pub percent: u32,
}

impl Output for ImportResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Imported {} ({}% complete)", self.source, self.percent)
    }
}

/// Restore records from a backup envelope file.
pub fn import(root: &Path, file: &Path) -> Result<ImportResult> {
    let raw = std::fs::read_to_string(file)?;
    let envelope: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| Error::InvalidInput(format!("{} is not valid JSON: {}", file.display(), e)))?;

    let store = open_progress(root)?;
    if !store.import_all(&envelope) {
        return Err(Error::InvalidInput(format!(
            "{} is not a waypoint export (missing data field)",
            file.display()
        )));
    }

    let analytics = catalog::analytics(&store.snapshot());
    Ok(ImportResult {
        source: file.display().to_string(),
        percent: analytics.percent,
    })
}

// === reset ===

/// Result of `wp reset`.
#[derive(Debug, Serialize)]
pub struct ResetResult {
    /// Records were reset
    pub reset: bool,
}

impl Output for ResetResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        "All progress reset to defaults".to_string()
    }
}

/// Reset every record to its default. Requires `--force`.
pub fn reset(root: &Path, force: bool) -> Result<ResetResult> {
    if !force {
        return Err(Error::InvalidInput(
            "refusing to reset without --force".to_string(),
        ));
    }

    let store = open_progress(root)?;
    if !store.reset_all() {
        return Err(Error::Other("failed to reset records".to_string()));
    }

    Ok(ResetResult { reset: true })
}

// === config ===

/// Result of `wp config get` / `wp config set`.
#[derive(Debug, Serialize)]
pub struct ConfigValueResult {
    /// Configuration key
    pub key: String,
    /// Current value, if set
    pub value: Option<String>,
    /// Where the value came from (get only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Output for ConfigValueResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        match (&self.value, &self.source) {
            (Some(value), Some(source)) => format!("{} = {} ({})", self.key, value, source),
            (Some(value), None) => format!("{} = {}", self.key, value),
            (None, _) => format!("{} is not set", self.key),
        }
    }
}

/// Result of `wp config show`.
#[derive(Debug, Serialize)]
pub struct ConfigShowResult {
    /// All known keys with value and source
    pub entries: Vec<ConfigValueResult>,
}

impl Output for ConfigShowResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        self.entries
            .iter()
            .map(Output::to_human)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Get one resolved configuration value.
pub fn config_get(root: &Path, key: &str) -> Result<ConfigValueResult> {
    let store = Store::open(root)?;
    let config = resolve_config(&store, &ConfigOverrides::default())?;

    let (value, source) = match key {
        "output-format" => (
            Some(config.output_format().to_string()),
            Some(config.output_format.source.to_string()),
        ),
        "backend-url" => match &config.backend_url {
            Some(resolved) => (Some(resolved.value.clone()), Some(resolved.source.to_string())),
            None => (None, None),
        },
        "sync" => (
            Some(config.sync_mode().to_string()),
            Some(config.sync_mode.source.to_string()),
        ),
        _ => {
            return Err(Error::InvalidInput(format!(
                "unknown config key: {} (known: output-format, backend-url, sync)",
                key
            )));
        }
    };

    Ok(ConfigValueResult {
        key: key.to_string(),
        value,
        source,
    })
}

/// Set one configuration value in the profile config.
pub fn config_set(root: &Path, key: &str, value: &str) -> Result<ConfigValueResult> {
    let store = Store::open(root)?;
    let mut config = store.read_config()?;

    match key {
        "output-format" => {
            config.output_format = Some(OutputFormat::parse(value).ok_or_else(|| {
                Error::InvalidInput(format!("output-format must be json or human, got {}", value))
            })?);
        }
        "backend-url" => {
            config.backend_url = Some(value.to_string());
        }
        "sync" => {
            config.sync_mode = Some(SyncMode::parse(value).ok_or_else(|| {
                Error::InvalidInput(format!("sync must be local or remote, got {}", value))
            })?);
        }
        _ => {
            return Err(Error::InvalidInput(format!(
                "unknown config key: {} (known: output-format, backend-url, sync)",
                key
            )));
        }
    }

    config
        .validate()
        .map_err(Error::InvalidInput)?;
    store.write_config(&config)?;

    Ok(ConfigValueResult {
        key: key.to_string(),
        value: Some(value.to_string()),
        source: None,
    })
}

/// Show all resolved configuration values with sources.
pub fn config_show(root: &Path) -> Result<ConfigShowResult> {
    let entries = ["output-format", "backend-url", "sync"]
        .iter()
        .map(|key| config_get(root, key))
        .collect::<Result<Vec<_>>>()?;
    Ok(ConfigShowResult { entries })
}

// === token ===

/// Result of `wp token` commands.
#[derive(Debug, Serialize)]
pub struct TokenResult {
    /// Masked token, if one is available
    pub token: Option<String>,
    /// Where the token came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Output for TokenResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        match (&self.token, &self.source) {
            (Some(token), Some(source)) => format!("API token: {} ({})", token, source),
            (Some(token), None) => format!("API token: {}", token),
            (None, _) => "No API token stored".to_string(),
        }
    }
}

/// Store the API token in the profile state file.
pub fn token_set(root: &Path, token: &str) -> Result<TokenResult> {
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::InvalidInput("token must not be empty".to_string()));
    }

    let store = Store::open(root)?;
    let mut state = store.read_state()?;
    state.api_token = Some(token.to_string());
    state.token_saved_at = Some(chrono::Utc::now());
    store.write_state(&state)?;

    Ok(TokenResult {
        token: WaypointState {
            api_token: Some(token.to_string()),
            ..Default::default()
        }
        .masked_token(),
        source: None,
    })
}

/// Show the resolved token, masked.
pub fn token_show(root: &Path) -> Result<TokenResult> {
    let store = Store::open(root)?;
    let state = resolve_state(&store)?;

    Ok(TokenResult {
        token: state.masked_token(),
        source: state.token_source().map(|s| s.to_string()),
    })
}

/// Remove the stored token from the profile state file.
pub fn token_clear(root: &Path) -> Result<TokenResult> {
    let store = Store::open(root)?;
    let mut state = store.read_state()?;
    state.api_token = None;
    state.token_saved_at = None;
    store.write_state(&state)?;

    Ok(TokenResult {
        token: None,
        source: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;

    #[test]
    fn test_init_then_reinit() {
        let env = TestEnv::new();

        let first = init(env.data_path()).unwrap();
        assert!(first.created);

        let second = init(env.data_path()).unwrap();
        assert!(!second.created);
    }

    #[test]
    fn test_commands_before_init_fail() {
        let env = TestEnv::new();
        assert!(matches!(
            status(env.data_path()),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(
            toggle(env.data_path(), 1, true),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn test_toggle_rejects_out_of_range_module() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();

        let result = toggle(env.data_path(), 21, true);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_toggle_updates_percent() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();

        toggle(env.data_path(), 1, true).unwrap();
        let result = toggle(env.data_path(), 2, true).unwrap();
        assert_eq!(result.percent, 17);
    }

    #[test]
    fn test_status_on_fresh_profile() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();

        let result = status(env.data_path()).unwrap();
        assert_eq!(result.analytics.completed, 0);
        assert_eq!(result.analytics.active_module, Some(1));
        assert_eq!(result.xp, 0);
        assert!(!result.remote);
        assert_eq!(result.modules.len(), catalog::catalog().len());
    }

    #[test]
    fn test_status_counts_subtasks() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();

        subtask(env.data_path(), 1, 0).unwrap();
        subtask(env.data_path(), 1, 1).unwrap();

        let result = status(env.data_path()).unwrap();
        assert_eq!(result.modules[0].tasks_done, 2);
    }

    #[test]
    fn test_reset_requires_force() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();

        assert!(matches!(
            reset(env.data_path(), false),
            Err(Error::InvalidInput(_))
        ));
        assert!(reset(env.data_path(), true).unwrap().reset);
    }

    #[test]
    fn test_sync_without_remote_config_errors() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();

        assert!(matches!(sync_push(env.data_path()), Err(Error::Sync(_))));
        assert!(matches!(sync_pull(env.data_path()), Err(Error::Sync(_))));
    }

    #[test]
    fn test_config_set_and_get() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();

        config_set(env.data_path(), "backend-url", "https://progress.example.com").unwrap();
        let result = config_get(env.data_path(), "backend-url").unwrap();
        assert_eq!(result.value.as_deref(), Some("https://progress.example.com"));
        assert_eq!(result.source.as_deref(), Some("profile"));
    }

    #[test]
    fn test_config_set_rejects_unknown_key() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();

        assert!(matches!(
            config_set(env.data_path(), "theme", "dark"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_config_set_rejects_bad_value() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();

        assert!(matches!(
            config_set(env.data_path(), "sync", "firebase"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            config_set(env.data_path(), "backend-url", "not-a-url"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_token_set_show_clear() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();

        let set = token_set(env.data_path(), "wpt_secret_token_abcd").unwrap();
        assert_eq!(set.token.as_deref(), Some("wpt_...abcd"));

        let shown = token_show(env.data_path()).unwrap();
        assert_eq!(shown.token.as_deref(), Some("wpt_...abcd"));
        assert_eq!(shown.source.as_deref(), Some("profile"));

        token_clear(env.data_path()).unwrap();
        // A WP_API_TOKEN in the ambient environment would still resolve;
        // the profile state itself must be empty now.
        let store = Store::open(env.data_path()).unwrap();
        assert!(store.read_state().unwrap().api_token.is_none());
    }

    #[test]
    fn test_export_import_through_commands() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();

        toggle(env.data_path(), 1, true).unwrap();
        xp_add(env.data_path(), 100).unwrap();

        let file = env.data_path().join("backup.json");
        export(env.data_path(), Some(&file)).unwrap();

        reset(env.data_path(), true).unwrap();
        assert_eq!(xp_show(env.data_path()).unwrap().total, 0);

        let result = import(env.data_path(), &file).unwrap();
        assert_eq!(result.percent, 8); // 1 of 12 modules
        assert_eq!(xp_show(env.data_path()).unwrap().total, 100);
    }

    #[test]
    fn test_import_rejects_non_envelope_file() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();

        let file = env.data_path().join("bogus.json");
        std::fs::write(&file, r#"{"version": "2.0"}"#).unwrap();

        assert!(matches!(
            import(env.data_path(), &file),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_note_set_joins_and_shows() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();

        note_set(env.data_path(), 2, "  boundary values first  ").unwrap();
        let shown = note_show(env.data_path(), 2).unwrap();
        assert_eq!(shown.note, "boundary values first");
    }

    #[test]
    fn test_badge_add_is_idempotent() {
        let env = TestEnv::new();
        init(env.data_path()).unwrap();

        badge_add(env.data_path(), "core").unwrap();
        let result = badge_add(env.data_path(), "core").unwrap();
        assert_eq!(result.badges, vec!["core".to_string()]);
    }
}
