//! The paginated commit feed.
//!
//! `CommitFeed` owns the loaded commit window, the pagination cursor, the
//! active browse mode and the selection. It performs no I/O: every operation
//! that needs the backend returns a [`PageTicket`] describing the request, and
//! the caller hands the outcome back through [`CommitFeed::apply_page`].
//!
//! # Staleness
//!
//! Every switch between paging modes (and every fresh initial load) bumps a
//! generation counter. Tickets carry the generation they were issued under,
//! and results for an older generation are discarded without touching state.
//! This is what keeps a slow page from one mode from landing in another.
//! Entering or leaving search does not bump it: a page in flight underneath
//! a search still lands in the browse window and the hits are recomputed.
//!
//! # Modes
//!
//! Normal and Tag mode page through the backend. Search is an overlay over the
//! already-loaded window: it stashes the browse cursor, filters locally, and
//! restores the stashed cursor when the query is cleared.

use std::collections::HashSet;

use crate::search::{filter_window, SearchFilters};
use crate::types::{
    Commit, FeedCursor, FeedMode, FileChange, RefLists, ScopeId, Selection, UNCOMMITTED_TOKEN,
};

/// Commits requested per page unless configured otherwise.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// First page of a mode; replaces the list.
    Initial,
    /// Next page; appended to the list.
    More,
}

/// The paging modes. Search never reaches the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseMode {
    Normal,
    Tag(String),
}

impl BrowseMode {
    fn feed_mode(&self) -> FeedMode {
        match self {
            Self::Normal => FeedMode::Normal,
            Self::Tag(tag) => FeedMode::Tag(tag.clone()),
        }
    }
}

/// A page request issued by the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTicket {
    pub generation: u64,
    pub kind: LoadKind,
    pub mode: BrowseMode,
    pub offset: usize,
    pub limit: usize,
}

/// A page as fetched from the backend.
///
/// `uncommitted` and `refs` are only present when the strategy that served
/// the page also returned them (initial Normal loads).
#[derive(Debug, Clone, Default)]
pub struct PageData {
    pub commits: Vec<Commit>,
    pub uncommitted: Option<Vec<FileChange>>,
    pub refs: Option<RefLists>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was merged. `restored` is set when a remembered selection was
    /// re-established by this page.
    Applied { added: usize, restored: bool },
    /// The ticket belonged to an earlier generation. Nothing changed.
    Stale,
    /// The fetch failed; the error is recorded as the status message.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Error,
}

/// One-line message for the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

#[derive(Debug, Clone)]
struct SearchOverlay {
    query: String,
    hits: Vec<usize>,
    stashed: FeedCursor,
}

#[derive(Debug)]
pub struct CommitFeed {
    commits: Vec<Commit>,
    loaded: HashSet<String>,
    uncommitted: Vec<FileChange>,
    refs: RefLists,
    cursor: FeedCursor,
    generation: u64,
    in_flight: Option<LoadKind>,
    search: Option<SearchOverlay>,
    filters: SearchFilters,
    selection: Selection,
    restore: Option<Selection>,
    selection_dirty: bool,
    incoming: usize,
    status: Option<StatusMessage>,
}

impl Default for CommitFeed {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_LIMIT)
    }
}

impl CommitFeed {
    pub fn new(limit: usize) -> Self {
        Self {
            commits: Vec::new(),
            loaded: HashSet::new(),
            uncommitted: Vec::new(),
            refs: RefLists::default(),
            cursor: FeedCursor::new(limit.max(1), FeedMode::Normal),
            generation: 0,
            in_flight: None,
            search: None,
            filters: SearchFilters::default(),
            selection: Selection::None,
            restore: None,
            selection_dirty: false,
            incoming: 0,
            status: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn cursor(&self) -> &FeedCursor {
        &self.cursor
    }

    pub fn mode(&self) -> &FeedMode {
        &self.cursor.mode
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// All loaded commits, regardless of any active search.
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Commits currently shown: the search hits, or the whole window.
    pub fn visible(&self) -> Vec<&Commit> {
        match &self.search {
            Some(overlay) => overlay.hits.iter().filter_map(|&i| self.commits.get(i)).collect(),
            None => self.commits.iter().collect(),
        }
    }

    /// Working-tree changes pinned at the head of the list. Empty outside
    /// Normal mode.
    pub fn uncommitted(&self) -> &[FileChange] {
        if self.shows_uncommitted() {
            &self.uncommitted
        } else {
            &[]
        }
    }

    /// Whether the pinned working-tree entry is shown above the commits.
    pub fn shows_uncommitted(&self) -> bool {
        self.browse_mode() == FeedMode::Normal && !self.uncommitted.is_empty()
    }

    pub fn refs(&self) -> &RefLists {
        &self.refs
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.loaded.contains(hash)
    }

    pub fn loaded_hashes(&self) -> HashSet<&str> {
        self.loaded.iter().map(String::as_str).collect()
    }

    pub fn find(&self, hash: &str) -> Option<&Commit> {
        self.commits.iter().find(|c| c.hash == hash)
    }

    pub fn search_query(&self) -> Option<&str> {
        self.search.as_ref().map(|s| s.query.as_str())
    }

    pub fn search_filters(&self) -> &SearchFilters {
        &self.filters
    }

    /// Commits announced by the push channel that are not in the list yet.
    pub fn incoming(&self) -> usize {
        self.incoming
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn set_status(&mut self, level: StatusLevel, text: impl Into<String>) {
        self.status = Some(StatusMessage { level, text: text.into() });
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    /// The paging mode underneath any search overlay.
    pub fn browse_mode(&self) -> FeedMode {
        match &self.search {
            Some(overlay) => overlay.stashed.mode.clone(),
            None => self.cursor.mode.clone(),
        }
    }

    /// Expansion scope for panels of commit `hash` in the current mode.
    pub fn scope_for(&self, hash: &str) -> ScopeId {
        match self.browse_mode() {
            FeedMode::Tag(tag) => ScopeId::Tagged { tag, hash: hash.to_owned() },
            _ => ScopeId::Commit(hash.to_owned()),
        }
    }

    // -----------------------------------------------------------------------
    // Paging
    // -----------------------------------------------------------------------

    /// Starts over in Normal mode from offset 0. Always issues a request.
    pub fn load_initial(&mut self) -> PageTicket {
        self.reset(BrowseMode::Normal)
    }

    /// Requests the next page of the current browse mode.
    ///
    /// Returns `None` while any load is in flight, once the backend has
    /// signalled the end of history, and in Search mode.
    pub fn load_more(&mut self) -> Option<PageTicket> {
        if self.in_flight.is_some() || !self.cursor.has_more {
            return None;
        }
        let mode = match &self.cursor.mode {
            FeedMode::Normal => BrowseMode::Normal,
            FeedMode::Tag(tag) => BrowseMode::Tag(tag.clone()),
            FeedMode::Search(_) => return None,
        };
        self.in_flight = Some(LoadKind::More);
        Some(PageTicket {
            generation: self.generation,
            kind: LoadKind::More,
            mode,
            offset: self.cursor.offset,
            limit: self.cursor.limit,
        })
    }

    /// Merges a fetched page, or records why it could not be fetched.
    pub fn apply_page(
        &mut self,
        ticket: &PageTicket,
        result: Result<PageData, String>,
    ) -> PageOutcome {
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale page"
            );
            return PageOutcome::Stale;
        }
        self.in_flight = None;

        let page = match result {
            Ok(page) => page,
            Err(message) => {
                if ticket.kind == LoadKind::Initial {
                    self.clear_window();
                    self.browse_cursor_mut().has_more = false;
                    self.refilter();
                }
                tracing::warn!(%message, offset = ticket.offset, "page load failed");
                self.set_status(StatusLevel::Error, format!("Could not load commits: {message}"));
                return PageOutcome::Failed;
            }
        };

        if ticket.kind == LoadKind::Initial {
            self.clear_window();
            if ticket.mode == BrowseMode::Normal {
                self.incoming = 0;
            }
            if let Some(refs) = page.refs {
                self.refs = refs;
            }
        }
        if let Some(uncommitted) = page.uncommitted {
            self.uncommitted = uncommitted;
        }

        let returned = page.commits.len();
        let mut added = 0;
        for commit in page.commits {
            if self.loaded.insert(commit.hash.clone()) {
                self.commits.push(commit);
                added += 1;
            }
        }
        let browse = self.browse_cursor_mut();
        browse.offset += returned;
        browse.has_more = returned == ticket.limit;
        self.refilter();

        if ticket.kind == LoadKind::Initial {
            // Picked from the previous window while this page was in flight.
            if let Selection::Commit(hash) = &self.selection {
                if !self.loaded.contains(hash) {
                    self.unverify_selection();
                }
            }
        }

        let restored = self.try_restore();
        tracing::debug!(
            added,
            offset = self.browse_cursor().offset,
            has_more = self.browse_cursor().has_more,
            "page applied"
        );
        PageOutcome::Applied { added, restored }
    }

    /// The paging cursor, stashed underneath a search if one is active.
    fn browse_cursor(&self) -> &FeedCursor {
        match &self.search {
            Some(overlay) => &overlay.stashed,
            None => &self.cursor,
        }
    }

    fn browse_cursor_mut(&mut self) -> &mut FeedCursor {
        match &mut self.search {
            Some(overlay) => &mut overlay.stashed,
            None => &mut self.cursor,
        }
    }

    /// Recomputes the search hits after the window changed.
    fn refilter(&mut self) {
        if let Some(overlay) = self.search.as_mut() {
            overlay.hits = filter_window(&self.commits, &overlay.query, &self.filters);
        }
    }

    fn clear_window(&mut self) {
        self.commits.clear();
        self.loaded.clear();
    }

    /// Switches to `mode` with a fresh cursor and returns its first ticket.
    fn reset(&mut self, mode: BrowseMode) -> PageTicket {
        self.exit_search();
        self.bump_generation();
        self.unverify_selection();
        if mode != BrowseMode::Normal || self.cursor.mode != FeedMode::Normal {
            // Leaving or entering a tag: the old window belongs to another mode.
            self.clear_window();
        }
        self.cursor = FeedCursor::new(self.cursor.limit, mode.feed_mode());
        self.in_flight = Some(LoadKind::Initial);
        PageTicket {
            generation: self.generation,
            kind: LoadKind::Initial,
            mode,
            offset: 0,
            limit: self.cursor.limit,
        }
    }

    fn bump_generation(&mut self) {
        self.generation += 1;
        // Whatever was in flight belongs to the old generation now.
        self.in_flight = None;
    }

    // -----------------------------------------------------------------------
    // Modes
    // -----------------------------------------------------------------------

    /// Browses the history reachable from `tag`.
    pub fn enter_tag_mode(&mut self, tag: &str) -> PageTicket {
        self.reset(BrowseMode::Tag(tag.to_owned()))
    }

    /// Leaves Tag or Search mode.
    ///
    /// Search over Normal restores the stashed window without a request. Tag
    /// mode (directly or underneath a search) reloads Normal history. Already
    /// in Normal mode, this is a no-op.
    pub fn exit_to_normal_mode(&mut self) -> Option<PageTicket> {
        if self.browse_mode() != FeedMode::Normal {
            return Some(self.load_initial());
        }
        self.exit_search();
        None
    }

    /// Filters the loaded window by `query`. An empty query leaves search.
    ///
    /// Returns the number of matches.
    pub fn search(&mut self, query: &str) -> usize {
        let query = query.trim();
        if query.is_empty() {
            self.exit_search();
            return self.commits.len();
        }
        let stashed = match self.search.take() {
            Some(overlay) => overlay.stashed,
            None => self.cursor.clone(),
        };
        self.cursor = FeedCursor::new(self.cursor.limit, FeedMode::Search(query.to_owned()));
        let hits = filter_window(&self.commits, query, &self.filters);
        let count = hits.len();
        self.search = Some(SearchOverlay { query: query.to_owned(), hits, stashed });
        count
    }

    /// Same as [`CommitFeed::search`]; named for the mode transition.
    pub fn enter_search_mode(&mut self, query: &str) -> usize {
        self.search(query)
    }

    /// Replaces the search filters and re-runs the active query.
    pub fn set_search_filters(&mut self, filters: SearchFilters) {
        self.filters = filters;
        self.refilter();
    }

    fn exit_search(&mut self) {
        if let Some(overlay) = self.search.take() {
            self.cursor = overlay.stashed;
        }
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The selection if it is shown by the current view (search may hide it).
    pub fn visible_selection(&self) -> &Selection {
        match (&self.selection, &self.search) {
            (Selection::Commit(hash), Some(overlay)) => {
                let shown = overlay.hits.iter().any(|&i| self.commits[i].hash == *hash);
                if shown {
                    &self.selection
                } else {
                    &Selection::None
                }
            }
            (Selection::Uncommitted, Some(_)) => &Selection::None,
            _ => &self.selection,
        }
    }

    /// Selects a loaded commit. Unknown hashes are ignored.
    pub fn select(&mut self, hash: &str) -> bool {
        if !self.contains(hash) {
            return false;
        }
        self.restore = None;
        self.set_selection(Selection::Commit(hash.to_owned()));
        true
    }

    /// Selects the pinned working-tree entry, if shown.
    pub fn select_uncommitted(&mut self) -> bool {
        if !self.shows_uncommitted() {
            return false;
        }
        self.restore = None;
        self.set_selection(Selection::Uncommitted);
        true
    }

    pub fn clear_selection(&mut self) {
        self.restore = None;
        self.set_selection(Selection::None);
    }

    fn set_selection(&mut self, selection: Selection) {
        if self.selection != selection {
            self.selection = selection;
            self.selection_dirty = true;
        }
    }

    /// Remembers a persisted selection to re-establish once it is loaded.
    pub fn remember_selection(&mut self, persisted: &str) {
        self.restore = match persisted {
            "" => None,
            UNCOMMITTED_TOKEN => Some(Selection::Uncommitted),
            hash => Some(Selection::Commit(hash.to_owned())),
        };
    }

    /// The selection waiting for its commit to load.
    pub fn pending_restore(&self) -> Option<&Selection> {
        self.restore.as_ref()
    }

    /// Moves the current selection into the "remembered, unverified" state.
    fn unverify_selection(&mut self) {
        let current = std::mem::take(&mut self.selection);
        if current != Selection::None {
            self.restore = Some(current);
        }
    }

    fn try_restore(&mut self) -> bool {
        let Some(target) = self.restore.clone() else {
            return false;
        };
        let found = match &target {
            Selection::Commit(hash) => self.contains(hash),
            Selection::Uncommitted => self.shows_uncommitted(),
            Selection::None => false,
        };
        if found {
            self.restore = None;
            // Same value as persisted, no write-back needed.
            let dirty = self.selection_dirty;
            self.set_selection(target);
            self.selection_dirty = dirty;
            return true;
        }
        let browse = self.browse_cursor();
        let exhausted = match target {
            Selection::Uncommitted => browse.offset > 0 || !browse.has_more,
            _ => !browse.has_more,
        };
        if exhausted {
            tracing::debug!(?target, "remembered selection not found; dropping it");
            self.restore = None;
            self.selection_dirty = true;
        }
        false
    }

    /// The persisted form of the selection if it changed since the last call:
    /// `Some(Some(value))` to store, `Some(None)` to clear.
    pub fn take_selection_change(&mut self) -> Option<Option<String>> {
        if !self.selection_dirty {
            return None;
        }
        self.selection_dirty = false;
        Some(match &self.selection {
            Selection::None => None,
            Selection::Uncommitted => Some(UNCOMMITTED_TOKEN.to_owned()),
            Selection::Commit(hash) => Some(hash.clone()),
        })
    }

    // -----------------------------------------------------------------------
    // Invalidation
    // -----------------------------------------------------------------------

    /// Counts a commit announced by the push channel. The list itself is only
    /// refreshed by a reload. Returns `true` if the commit was counted.
    pub fn note_incoming_commit(&mut self, hash: &str) -> bool {
        if self.browse_mode() != FeedMode::Normal || self.contains(hash) {
            return false;
        }
        self.incoming += 1;
        true
    }

    /// Applies the outcome of a mutation. Success reloads from scratch,
    /// failure reports the backend's message and leaves state untouched.
    pub fn on_mutation_result(
        &mut self,
        label: &str,
        result: Result<(), String>,
    ) -> Option<PageTicket> {
        match result {
            Ok(()) => {
                self.set_status(StatusLevel::Success, format!("{label}: done"));
                Some(self.load_initial())
            }
            Err(message) => {
                self.set_status(StatusLevel::Error, message);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Author, FileStatus};

    fn commit(hash: &str) -> Commit {
        Commit {
            hash: hash.to_owned(),
            short_hash: String::new(),
            message: format!("commit {hash}"),
            author: Author::default(),
            date: None,
            parent_hashes: Vec::new(),
            files: Vec::new(),
        }
    }

    fn page(hashes: &[&str]) -> PageData {
        PageData { commits: hashes.iter().map(|h| commit(h)).collect(), ..PageData::default() }
    }

    fn range(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    fn page_of(hashes: &[String]) -> PageData {
        PageData { commits: hashes.iter().map(|h| commit(h)).collect(), ..PageData::default() }
    }

    #[test]
    fn initial_then_more_advances_offset() {
        let mut feed = CommitFeed::new(2);
        let t = feed.load_initial();
        assert_eq!(t.offset, 0);
        feed.apply_page(&t, Ok(page(&["a", "b"])));
        assert_eq!(feed.cursor().offset, 2);
        assert!(feed.cursor().has_more);

        let t = feed.load_more().unwrap();
        assert_eq!(t.offset, 2);
        feed.apply_page(&t, Ok(page(&["c"])));
        assert_eq!(feed.cursor().offset, 3);
        assert!(!feed.cursor().has_more, "short page ends the history");
        assert!(feed.load_more().is_none());
    }

    #[test]
    fn load_more_while_in_flight_is_a_no_op() {
        let mut feed = CommitFeed::new(50);
        let t = feed.load_initial();
        let hashes = range("h", 50);
        feed.apply_page(&t, Ok(page_of(&hashes)));
        assert_eq!(feed.cursor().offset, 50);

        let first = feed.load_more();
        assert!(first.is_some());
        assert!(feed.load_more().is_none(), "second call while loading must not issue");
        assert_eq!(feed.cursor().offset, 50);
    }

    #[test]
    fn duplicate_hashes_are_dropped_but_offset_counts_them() {
        let mut feed = CommitFeed::new(2);
        let t = feed.load_initial();
        feed.apply_page(&t, Ok(page(&["a", "b"])));
        let t = feed.load_more().unwrap();
        let outcome = feed.apply_page(&t, Ok(page(&["b", "c"])));
        assert_eq!(outcome, PageOutcome::Applied { added: 1, restored: false });
        let hashes: Vec<_> = feed.commits().iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(hashes, ["a", "b", "c"]);
        assert_eq!(feed.cursor().offset, 4);
    }

    #[test]
    fn stale_page_after_mode_switch_is_discarded() {
        let mut feed = CommitFeed::new(2);
        let normal = feed.load_initial();
        let tag = feed.enter_tag_mode("v1.0");
        assert_eq!(feed.apply_page(&normal, Ok(page(&["x", "y"]))), PageOutcome::Stale);
        assert!(feed.commits().is_empty());
        assert!(feed.is_loading(), "the tag load is still outstanding");

        feed.apply_page(&tag, Ok(page(&["t1"])));
        assert_eq!(feed.mode(), &FeedMode::Tag("v1.0".into()));
        assert_eq!(feed.commits().len(), 1);
    }

    #[test]
    fn failed_initial_load_leaves_feed_empty_with_status() {
        let mut feed = CommitFeed::new(2);
        let t = feed.load_initial();
        assert_eq!(feed.apply_page(&t, Err("connection refused".into())), PageOutcome::Failed);
        assert!(feed.commits().is_empty());
        assert_eq!(feed.status().unwrap().level, StatusLevel::Error);
        assert!(!feed.is_loading());
    }

    #[test]
    fn search_overlays_window_and_empty_query_restores_it() {
        let mut feed = CommitFeed::new(3);
        let t = feed.load_initial();
        let mut data = page(&["a1", "b2", "c3"]);
        data.commits[0].message = "Fix parser".into();
        data.commits[1].message = "Add docs".into();
        data.commits[2].author.name = "fixer".into();
        feed.apply_page(&t, Ok(data));
        let before = feed.cursor().clone();

        assert_eq!(feed.search("fix"), 2);
        assert_eq!(feed.mode(), &FeedMode::Search("fix".into()));
        assert_eq!(feed.cursor().offset, 0);
        assert!(feed.cursor().has_more);
        assert!(feed.load_more().is_none(), "search never pages");
        let shown: Vec<_> = feed.visible().iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(shown, ["a1", "c3"]);

        feed.search("");
        assert_eq!(feed.cursor(), &before);
        assert_eq!(feed.visible().len(), 3);
    }

    #[test]
    fn initial_page_landing_under_search_is_kept_and_refiltered() {
        let mut feed = CommitFeed::new(2);
        let t = feed.load_initial();
        assert_eq!(feed.search("fix"), 0);
        assert!(feed.is_loading(), "search must not cancel the outstanding load");

        let mut data = page(&["a", "b"]);
        data.commits[0].message = "Fix crash".into();
        assert_eq!(feed.apply_page(&t, Ok(data)), PageOutcome::Applied { added: 2, restored: false });
        let shown: Vec<_> = feed.visible().iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(shown, ["a"]);
        assert_eq!(feed.mode(), &FeedMode::Search("fix".into()));

        assert_eq!(feed.search(""), 2);
        assert_eq!(feed.mode(), &FeedMode::Normal);
        assert_eq!(feed.cursor().offset, 2);
        assert!(feed.cursor().has_more);
        assert!(feed.load_more().is_some());
    }

    #[test]
    fn tag_page_landing_under_search_advances_tag_cursor() {
        let mut feed = CommitFeed::new(2);
        let t = feed.enter_tag_mode("v3");
        feed.search("t");
        assert!(matches!(feed.apply_page(&t, Ok(page(&["t1"]))), PageOutcome::Applied { .. }));
        assert_eq!(feed.visible().len(), 1);

        feed.search("");
        assert_eq!(feed.mode(), &FeedMode::Tag("v3".into()));
        assert_eq!(feed.cursor().offset, 1);
        assert!(!feed.cursor().has_more);
    }

    #[test]
    fn exit_to_normal_from_search_over_tag_reloads() {
        let mut feed = CommitFeed::new(2);
        let t = feed.enter_tag_mode("v2");
        feed.apply_page(&t, Ok(page(&["t1", "t2"])));
        feed.search("t1");
        let ticket = feed.exit_to_normal_mode().expect("reload expected");
        assert_eq!(ticket.mode, BrowseMode::Normal);
        assert_eq!(feed.mode(), &FeedMode::Normal);
        assert!(feed.search_query().is_none());
    }

    #[test]
    fn exit_to_normal_from_plain_search_does_not_fetch() {
        let mut feed = CommitFeed::new(2);
        let t = feed.load_initial();
        feed.apply_page(&t, Ok(page(&["a", "b"])));
        feed.search("a");
        assert!(feed.exit_to_normal_mode().is_none());
        assert_eq!(feed.mode(), &FeedMode::Normal);
        assert_eq!(feed.cursor().offset, 2);
    }

    #[test]
    fn uncommitted_entry_is_pinned_in_normal_mode_only() {
        let mut feed = CommitFeed::new(2);
        let t = feed.load_initial();
        let mut data = page(&["a"]);
        data.uncommitted = Some(vec![FileChange {
            path: "wip.rs".into(),
            status: FileStatus::Modified,
            additions: 1,
            deletions: 0,
            old_path: None,
        }]);
        feed.apply_page(&t, Ok(data));
        assert!(feed.shows_uncommitted());
        assert!(feed.select_uncommitted());

        feed.enter_tag_mode("v1");
        assert!(!feed.shows_uncommitted());
        assert!(feed.uncommitted().is_empty());
        assert!(!feed.select_uncommitted());
    }

    #[test]
    fn remembered_selection_restores_when_page_lands() {
        let mut feed = CommitFeed::new(2);
        feed.remember_selection("c");
        let t = feed.load_initial();
        let outcome = feed.apply_page(&t, Ok(page(&["a", "b"])));
        assert_eq!(outcome, PageOutcome::Applied { added: 2, restored: false });
        assert_eq!(feed.selection(), &Selection::None);

        let t = feed.load_more().unwrap();
        let outcome = feed.apply_page(&t, Ok(page(&["c", "d"])));
        assert_eq!(outcome, PageOutcome::Applied { added: 2, restored: true });
        assert_eq!(feed.selection(), &Selection::Commit("c".into()));
        assert!(feed.take_selection_change().is_none(), "restoring does not rewrite storage");
    }

    #[test]
    fn remembered_selection_is_dropped_when_history_is_exhausted() {
        let mut feed = CommitFeed::new(2);
        feed.remember_selection("gone");
        let t = feed.load_initial();
        feed.apply_page(&t, Ok(page(&["a"])));
        assert!(feed.pending_restore().is_none());
        assert_eq!(feed.take_selection_change(), Some(None));
    }

    #[test]
    fn mode_switch_keeps_selection_as_restore_target() {
        let mut feed = CommitFeed::new(2);
        let t = feed.load_initial();
        feed.apply_page(&t, Ok(page(&["a", "b"])));
        assert!(feed.select("b"));
        assert_eq!(feed.take_selection_change(), Some(Some("b".into())));

        let t = feed.enter_tag_mode("v1");
        assert_eq!(feed.selection(), &Selection::None);
        let outcome = feed.apply_page(&t, Ok(page(&["x", "b"])));
        assert_eq!(outcome, PageOutcome::Applied { added: 2, restored: true });
        assert_eq!(feed.selection(), &Selection::Commit("b".into()));
        assert_eq!(feed.scope_for("b"), ScopeId::Tagged { tag: "v1".into(), hash: "b".into() });
    }

    #[test]
    fn incoming_commits_are_counted_not_spliced() {
        let mut feed = CommitFeed::new(2);
        let t = feed.load_initial();
        feed.apply_page(&t, Ok(page(&["a", "b"])));
        assert!(feed.note_incoming_commit("new"));
        assert!(!feed.note_incoming_commit("a"), "already loaded");
        assert_eq!(feed.incoming(), 1);
        assert_eq!(feed.commits().len(), 2);
    }

    #[test]
    fn mutation_failure_keeps_state_and_surfaces_message() {
        let mut feed = CommitFeed::new(2);
        let t = feed.load_initial();
        feed.apply_page(&t, Ok(page(&["a", "b"])));
        let generation = feed.generation();

        assert!(feed
            .on_mutation_result("checkout main", Err("Your local changes would be overwritten".into()))
            .is_none());
        assert_eq!(feed.generation(), generation);
        assert_eq!(feed.commits().len(), 2);
        assert_eq!(feed.status().unwrap().text, "Your local changes would be overwritten");

        let ticket = feed.on_mutation_result("checkout main", Ok(())).unwrap();
        assert_eq!(ticket.kind, LoadKind::Initial);
        assert!(feed.generation() > generation);
    }
}
