//! Durable record of which file panels are open.
//!
//! The store is the single source of truth for panel expansion. Panels read it
//! when they are (re)built, so an expansion survives re-renders, commit
//! switches, page loads and restarts. Every effective mutation marks the store
//! dirty; the owner flushes [`ExpansionStateStore::take_dirty_snapshot`] to the
//! durable key-value store on the same tick.
//!
//! Garbage collection is deliberately conservative: it only runs once enough
//! history is loaded to judge staleness, it never drops a key whose commit is
//! in the loaded window, and it never drops working-tree keys.

use std::collections::{BTreeSet, HashSet};

use crate::types::{ExpansionKey, ScopeId};

/// Minimum number of loaded commits before garbage collection may evict keys.
pub const DEFAULT_GC_MIN_LOADED: usize = 20;

#[derive(Debug, Clone)]
pub struct ExpansionStateStore {
    expanded: BTreeSet<ExpansionKey>,
    gc_min_loaded: usize,
    dirty: bool,
}

impl Default for ExpansionStateStore {
    fn default() -> Self {
        Self::new(DEFAULT_GC_MIN_LOADED)
    }
}

impl ExpansionStateStore {
    pub fn new(gc_min_loaded: usize) -> Self {
        Self { expanded: BTreeSet::new(), gc_min_loaded, dirty: false }
    }

    pub fn is_expanded(&self, key: &ExpansionKey) -> bool {
        self.expanded.contains(key)
    }

    /// Flips `key` and returns the new state (`true` = expanded).
    pub fn toggle(&mut self, key: &ExpansionKey) -> bool {
        let now_expanded = if self.expanded.remove(key) {
            false
        } else {
            self.expanded.insert(key.clone());
            true
        };
        self.dirty = true;
        now_expanded
    }

    /// Sets `key` to the given state. Returns `true` if anything changed.
    pub fn set(&mut self, key: &ExpansionKey, expanded: bool) -> bool {
        let changed = if expanded {
            self.expanded.insert(key.clone())
        } else {
            self.expanded.remove(key)
        };
        self.dirty |= changed;
        changed
    }

    /// Removes every key belonging to `scope`. Returns how many were removed.
    pub fn collapse_all(&mut self, scope: &ScopeId) -> usize {
        let before = self.expanded.len();
        self.expanded.retain(|key| &key.scope != scope);
        let removed = before - self.expanded.len();
        if removed > 0 {
            self.dirty = true;
        }
        removed
    }

    /// Evicts keys whose commit is not in `loaded_hashes`.
    ///
    /// Does nothing while fewer than the configured minimum of commits are
    /// loaded: with a short window a missing hash says nothing about whether
    /// the commit still exists. Returns the number of evicted keys.
    pub fn garbage_collect(&mut self, loaded_hashes: &HashSet<&str>) -> usize {
        if loaded_hashes.len() < self.gc_min_loaded {
            return 0;
        }
        let before = self.expanded.len();
        self.expanded.retain(|key| match key.scope.commit_hash() {
            None => true,
            Some(hash) => loaded_hashes.contains(hash),
        });
        let evicted = before - self.expanded.len();
        if evicted > 0 {
            self.dirty = true;
            tracing::debug!(evicted, "expansion keys garbage-collected");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ExpansionKey> {
        self.expanded.iter()
    }

    /// Serialises the whole store as a JSON array of `{scope, path}` objects.
    pub fn to_snapshot(&self) -> String {
        // A BTreeSet of plain string pairs cannot fail to serialise.
        serde_json::to_string(&self.expanded).unwrap_or_else(|_| "[]".to_owned())
    }

    /// Rebuilds a store from a snapshot. Corrupt input yields an empty store.
    pub fn from_snapshot(raw: &str, gc_min_loaded: usize) -> Self {
        let expanded = match serde_json::from_str::<BTreeSet<ExpansionKey>>(raw) {
            Ok(keys) => keys,
            Err(err) => {
                tracing::warn!(%err, "discarding unreadable expansion snapshot");
                BTreeSet::new()
            }
        };
        Self { expanded, gc_min_loaded, dirty: false }
    }

    /// Returns the snapshot if the store changed since the last call.
    pub fn take_dirty_snapshot(&mut self) -> Option<String> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.to_snapshot())
    }
}
