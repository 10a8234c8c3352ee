//! Embedded curriculum catalog and derived analytics.
//!
//! The catalog (modules, XP rewards, subtask checklists) is compiled into
//! the binary from `catalog.json` and parsed once on first access. Badge
//! rules and the analytics derived from a [`Snapshot`] live here too, so
//! the dashboard numbers come from one place.

use std::ops::RangeInclusive;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::models::Snapshot;

// Embedded catalog content (included at compile time)
const CATALOG_JSON: &str = include_str!("catalog.json");

/// Badge rules: badge name and the contiguous module range that unlocks it.
pub const BADGE_RULES: [(&str, RangeInclusive<u32>); 4] = [
    ("core", 1..=2),
    ("technical", 3..=5),
    ("automation", 6..=9),
    ("master", 10..=12),
];

/// One curriculum unit with a fixed XP reward and a task checklist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// Module ID, unique and contiguous from 1
    pub id: u32,
    /// Display title
    pub title: String,
    /// XP awarded on completion
    pub xp: u64,
    /// Checklist items, addressed by index
    pub tasks: Vec<String>,
}

/// The full embedded curriculum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Modules in curriculum order
    pub modules: Vec<Module>,
}

impl Catalog {
    /// Look up a module by ID.
    pub fn module(&self, id: u32) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Number of modules in the curriculum.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// True when the catalog has no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Access the embedded catalog, parsing it on first use.
pub fn catalog() -> &'static Catalog {
    static CATALOG: OnceLock<Catalog> = OnceLock::new();
    CATALOG.get_or_init(|| {
        serde_json::from_str(CATALOG_JSON).expect("embedded catalog.json is valid")
    })
}

/// Earned/unearned state of one badge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeStatus {
    /// Badge name
    pub name: String,
    /// Whether the required modules are all completed
    pub earned: bool,
}

/// Numbers derived from a snapshot against the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analytics {
    /// Count of completed modules
    pub completed: usize,
    /// Total modules in the catalog
    pub total: usize,
    /// Completion percentage, rounded to the nearest integer
    pub percent: u32,
    /// Sum of XP rewards of completed modules
    pub earned_xp: u64,
    /// Per-badge eligibility
    pub badges: Vec<BadgeStatus>,
    /// First incomplete module in catalog order, if any
    pub active_module: Option<u32>,
}

/// Compute analytics for a snapshot.
pub fn analytics(snapshot: &Snapshot) -> Analytics {
    let cat = catalog();

    let completed_ids: Vec<u32> = cat
        .modules
        .iter()
        .filter(|m| is_completed(snapshot, m.id))
        .map(|m| m.id)
        .collect();

    let completed = completed_ids.len();
    let total = cat.len();
    let percent = if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u32
    };

    let earned_xp = cat
        .modules
        .iter()
        .filter(|m| is_completed(snapshot, m.id))
        .map(|m| m.xp)
        .sum();

    let badges = BADGE_RULES
        .iter()
        .map(|(name, range)| BadgeStatus {
            name: name.to_string(),
            earned: range.clone().all(|id| is_completed(snapshot, id)),
        })
        .collect();

    let active_module = cat
        .modules
        .iter()
        .find(|m| !is_completed(snapshot, m.id))
        .map(|m| m.id);

    Analytics {
        completed,
        total,
        percent,
        earned_xp,
        badges,
        active_module,
    }
}

fn is_completed(snapshot: &Snapshot, module_id: u32) -> bool {
    snapshot
        .progress
        .get(&module_id.to_string())
        .copied()
        .unwrap_or(false)
}
