//! Column preferences: order, widths and visibility.
//!
//! Preferences are stored as JSON through an injected [`PrefsStore`]. The
//! default store discards everything, so layouts last only as long as the
//! grid.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::column::ACTIONS_COLUMN_ID;

/// Current preferences schema version.
pub const PREFS_VERSION: u32 = 1;

/// Persisted column preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColumnPrefs {
    pub column_sizing: BTreeMap<String, u32>,
    pub column_order: Vec<String>,
    pub column_visibility: BTreeMap<String, bool>,
    pub v: u32,
}

impl Default for ColumnPrefs {
    fn default() -> Self {
        Self {
            column_sizing: BTreeMap::new(),
            column_order: Vec::new(),
            column_visibility: BTreeMap::new(),
            v: PREFS_VERSION,
        }
    }
}

/// Normalize a column order against the declared column ids.
///
/// Unknown ids are dropped, duplicates collapse to their first occurrence,
/// missing ids are appended in declaration order and the actions column is
/// always last.
pub fn normalize_order(order: &[String], declared: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(declared.len() + 1);
    for id in order {
        if id != ACTIONS_COLUMN_ID && declared.contains(id) && !out.contains(id) {
            out.push(id.clone());
        }
    }
    for id in declared {
        if id != ACTIONS_COLUMN_ID && !out.contains(id) {
            out.push(id.clone());
        }
    }
    out.push(ACTIONS_COLUMN_ID.to_string());
    out
}

// =============================================================================
// Storage
// =============================================================================

/// Key-value storage for serialized preferences.
pub trait PrefsStore: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&self, key: &str, raw: String);
    fn remove(&self, key: &str);
}

/// Store that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPrefsStore;

impl PrefsStore for NoopPrefsStore {
    fn load(&self, _key: &str) -> Option<String> {
        None
    }

    fn save(&self, _key: &str, _raw: String) {}

    fn remove(&self, _key: &str) {}
}

/// Process-local store, shareable between grids.
#[derive(Debug, Clone, Default)]
pub struct MemoryPrefsStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryPrefsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PrefsStore for MemoryPrefsStore {
    fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn save(&self, key: &str, raw: String) {
        self.entries.insert(key.to_string(), raw);
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

// =============================================================================
// Prefs state
// =============================================================================

/// Live preferences of one grid, written through to its store on change.
pub struct PrefsState {
    key: String,
    store: Arc<dyn PrefsStore>,
    prefs: ColumnPrefs,
    declared: Vec<String>,
}

impl PrefsState {
    /// Load preferences for `key`, falling back to defaults on missing or
    /// unreadable data.
    pub fn load(key: impl Into<String>, store: Arc<dyn PrefsStore>, declared: Vec<String>) -> Self {
        let key = key.into();
        let prefs = match store.load(&key) {
            Some(raw) => serde_json::from_str::<ColumnPrefs>(&raw).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable column prefs for {}: {}", key, e);
                ColumnPrefs::default()
            }),
            None => ColumnPrefs::default(),
        };
        let mut state = Self {
            key,
            store,
            prefs,
            declared,
        };
        state.prefs.column_order = state.order();
        state
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn prefs(&self) -> &ColumnPrefs {
        &self.prefs
    }

    /// Replace the declared column ids and renormalize.
    pub fn set_declared(&mut self, declared: Vec<String>) {
        self.declared = declared;
        self.prefs.column_order = self.order();
        self.persist();
    }

    /// Normalized display order, actions column last.
    pub fn order(&self) -> Vec<String> {
        normalize_order(&self.prefs.column_order, &self.declared)
    }

    pub fn set_order(&mut self, order: Vec<String>) {
        self.prefs.column_order = normalize_order(&order, &self.declared);
        self.persist();
    }

    /// Move a column to `target` within the data columns.
    pub fn move_column(&mut self, id: &str, target: usize) {
        let mut order = self.order();
        order.retain(|c| c != ACTIONS_COLUMN_ID);
        let Some(from) = order.iter().position(|c| c == id) else {
            return;
        };
        let column = order.remove(from);
        order.insert(target.min(order.len()), column);
        self.set_order(order);
    }

    pub fn size(&self, id: &str) -> Option<u32> {
        self.prefs.column_sizing.get(id).copied()
    }

    pub fn set_size(&mut self, id: &str, px: u32) {
        self.prefs.column_sizing.insert(id.to_string(), px);
        self.persist();
    }

    /// Forget a resized width so the declared default applies again.
    pub fn reset_size(&mut self, id: &str) {
        if self.prefs.column_sizing.remove(id).is_some() {
            self.persist();
        }
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.prefs.column_visibility.get(id).copied().unwrap_or(true)
    }

    pub fn set_visibility(&mut self, id: &str, visible: bool) {
        self.prefs.column_visibility.insert(id.to_string(), visible);
        self.persist();
    }

    /// Drop all preferences, in memory and in the store.
    pub fn reset(&mut self) {
        self.prefs = ColumnPrefs::default();
        self.prefs.column_order = self.order();
        self.store.remove(&self.key);
    }

    fn persist(&self) {
        let mut prefs = self.prefs.clone();
        prefs.column_order = self.order();
        match serde_json::to_string(&prefs) {
            Ok(raw) => self.store.save(&self.key, raw),
            Err(e) => log::warn!("Failed to serialize column prefs for {}: {}", self.key, e),
        }
    }
}

impl std::fmt::Debug for PrefsState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefsState")
            .field("key", &self.key)
            .field("prefs", &self.prefs)
            .finish_non_exhaustive()
    }
}
