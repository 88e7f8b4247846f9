//! Per-file diff panels of the selected commit.
//!
//! A [`DiffPanelController`] never decides on its own whether it is open: it
//! mirrors the [`ExpansionStateStore`] on construction and after every page
//! load, and writes through to it on toggle. Fetches are tagged with a token
//! so a diff that arrives after its panel was collapsed, or after the scope
//! changed, is dropped.

use crate::expansion::ExpansionStateStore;
use crate::layout::{self, DiffLayout, RenderedDiff};
use crate::types::{ExpansionKey, FileChange, FileDiff, ScopeId};

/// A diff fetch the owner must perform and answer with
/// [`DiffPanelSet::apply_diff`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRequest {
    pub key: ExpansionKey,
    pub token: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelState {
    Collapsed,
    Loading(u64),
    Ready(FileDiff),
    Failed(String),
}

/// One file's panel.
#[derive(Debug, Clone)]
pub struct DiffPanelController {
    key: ExpansionKey,
    file: FileChange,
    state: PanelState,
}

impl DiffPanelController {
    fn new(key: ExpansionKey, file: FileChange) -> Self {
        Self { key, file, state: PanelState::Collapsed }
    }

    pub fn key(&self) -> &ExpansionKey {
        &self.key
    }

    pub fn file(&self) -> &FileChange {
        &self.file
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn is_expanded(&self) -> bool {
        !matches!(self.state, PanelState::Collapsed)
    }

    /// Brings the panel in line with `store`. Returns the token of a fetch to
    /// start when the panel just opened.
    fn sync(&mut self, store: &ExpansionStateStore, next_token: &mut u64) -> Option<u64> {
        match (store.is_expanded(&self.key), self.is_expanded()) {
            (true, false) => Some(self.start_loading(next_token)),
            (false, true) => {
                self.state = PanelState::Collapsed;
                None
            }
            _ => None,
        }
    }

    fn start_loading(&mut self, next_token: &mut u64) -> u64 {
        *next_token += 1;
        self.state = PanelState::Loading(*next_token);
        *next_token
    }

    /// Rows for the expanded body, `None` while collapsed or loading.
    pub fn render(&self, layout: DiffLayout) -> Option<RenderedDiff> {
        match &self.state {
            PanelState::Ready(diff) => Some(layout::render(diff, layout)),
            _ => None,
        }
    }
}

/// The panels of one scope, in file-list order.
#[derive(Debug, Default)]
pub struct DiffPanelSet {
    scope: Option<ScopeId>,
    panels: Vec<DiffPanelController>,
    layout: DiffLayout,
    next_token: u64,
}

impl DiffPanelSet {
    pub fn new(layout: DiffLayout) -> Self {
        Self { layout, ..Self::default() }
    }

    pub fn scope(&self) -> Option<&ScopeId> {
        self.scope.as_ref()
    }

    pub fn panels(&self) -> &[DiffPanelController] {
        &self.panels
    }

    pub fn layout(&self) -> DiffLayout {
        self.layout
    }

    pub fn set_layout(&mut self, layout: DiffLayout) {
        self.layout = layout;
    }

    pub fn toggle_layout(&mut self) -> DiffLayout {
        self.layout = self.layout.toggled();
        self.layout
    }

    /// Rebuilds the panels for `scope`. Files already expanded in `store` are
    /// fetched right away.
    pub fn open_scope(
        &mut self,
        scope: ScopeId,
        files: &[FileChange],
        store: &ExpansionStateStore,
    ) -> Vec<DiffRequest> {
        self.panels = files
            .iter()
            .map(|f| DiffPanelController::new(ExpansionKey::new(scope.clone(), &f.path), f.clone()))
            .collect();
        self.scope = Some(scope);
        self.resync(store)
    }

    pub fn clear(&mut self) {
        self.scope = None;
        self.panels.clear();
    }

    /// Re-reads every panel's expansion from `store`.
    pub fn resync(&mut self, store: &ExpansionStateStore) -> Vec<DiffRequest> {
        let mut requests = Vec::new();
        for panel in &mut self.panels {
            if let Some(token) = panel.sync(store, &mut self.next_token) {
                requests.push(DiffRequest { key: panel.key.clone(), token });
            }
        }
        requests
    }

    /// Flips the panel at `index`, writing the change through to `store`.
    pub fn toggle(&mut self, index: usize, store: &mut ExpansionStateStore) -> Option<DiffRequest> {
        let panel = self.panels.get_mut(index)?;
        store.toggle(&panel.key);
        let token = panel.sync(store, &mut self.next_token)?;
        Some(DiffRequest { key: panel.key.clone(), token })
    }

    /// Collapses every panel of the current scope.
    pub fn collapse_all(&mut self, store: &mut ExpansionStateStore) -> usize {
        let Some(scope) = &self.scope else {
            return 0;
        };
        let removed = store.collapse_all(scope);
        for panel in &mut self.panels {
            panel.state = PanelState::Collapsed;
        }
        removed
    }

    /// Delivers a fetched diff. Returns `false` if the panel moved on.
    pub fn apply_diff(&mut self, request: &DiffRequest, result: Result<FileDiff, String>) -> bool {
        let Some(panel) = self.panels.iter_mut().find(|p| p.key == request.key) else {
            return false;
        };
        if panel.state != PanelState::Loading(request.token) {
            return false;
        }
        panel.state = match result {
            Ok(diff) => PanelState::Ready(diff),
            Err(message) => PanelState::Failed(message),
        };
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileStatus;

    fn files(paths: &[&str]) -> Vec<FileChange> {
        paths
            .iter()
            .map(|p| FileChange {
                path: (*p).to_owned(),
                status: FileStatus::Modified,
                additions: 1,
                deletions: 1,
                old_path: None,
            })
            .collect()
    }

    fn scope() -> ScopeId {
        ScopeId::Commit("c1".into())
    }

    #[test]
    fn expanded_files_fetch_on_open() {
        let mut store = ExpansionStateStore::default();
        store.toggle(&ExpansionKey::new(scope(), "b.rs"));
        let mut set = DiffPanelSet::default();
        let requests = set.open_scope(scope(), &files(&["a.rs", "b.rs"]), &store);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].key.path, "b.rs");
        assert!(!set.panels()[0].is_expanded());
        assert!(set.panels()[1].is_expanded());
    }

    #[test]
    fn late_diff_after_collapse_is_dropped() {
        let mut store = ExpansionStateStore::default();
        let mut set = DiffPanelSet::default();
        set.open_scope(scope(), &files(&["a.rs"]), &store);
        let request = set.toggle(0, &mut store).unwrap();
        assert!(store.is_expanded(&request.key));
        assert!(set.toggle(0, &mut store).is_none());

        let diff = FileDiff { path: "a.rs".into(), hunks: Vec::new() };
        assert!(!set.apply_diff(&request, Ok(diff)));
        assert_eq!(set.panels()[0].state(), &PanelState::Collapsed);
    }

    #[test]
    fn ready_panel_renders_in_current_layout() {
        let mut store = ExpansionStateStore::default();
        let mut set = DiffPanelSet::default();
        set.open_scope(scope(), &files(&["a.rs"]), &store);
        let request = set.toggle(0, &mut store).unwrap();
        assert!(set.apply_diff(&request, Ok(FileDiff { path: "a.rs".into(), hunks: Vec::new() })));
        assert!(matches!(set.panels()[0].render(set.layout()), Some(RenderedDiff::Split(_))));
        set.toggle_layout();
        assert!(matches!(set.panels()[0].render(set.layout()), Some(RenderedDiff::Unified(_))));
    }

    #[test]
    fn collapse_all_clears_store_and_panels() {
        let mut store = ExpansionStateStore::default();
        let mut set = DiffPanelSet::default();
        set.open_scope(scope(), &files(&["a.rs", "b.rs"]), &store);
        set.toggle(0, &mut store);
        set.toggle(1, &mut store);
        assert_eq!(set.collapse_all(&mut store), 2);
        assert!(store.is_empty());
        assert!(set.panels().iter().all(|p| !p.is_expanded()));
    }

    #[test]
    fn resync_follows_external_store_changes() {
        let mut store = ExpansionStateStore::default();
        let mut set = DiffPanelSet::default();
        set.open_scope(scope(), &files(&["a.rs"]), &store);
        store.set(&ExpansionKey::new(scope(), "a.rs"), true);
        assert_eq!(set.resync(&store).len(), 1);
        store.set(&ExpansionKey::new(scope(), "a.rs"), false);
        assert!(set.resync(&store).is_empty());
        assert!(!set.panels()[0].is_expanded());
    }
}
