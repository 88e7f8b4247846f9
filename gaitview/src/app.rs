//! Central application state for gaitview.
//!
//! `AppState` owns the [`Engine`] plus everything that only matters to the
//! terminal: mode, focus, list cursors, scroll offsets, cached viewport
//! geometry and the queue of backend requests produced by key handlers.
//! Rendering reads it; the keybinding dispatcher and the main loop mutate it.

use std::time::{Duration, Instant};

use gaitview_core::api::Mutation;
use gaitview_core::engine::{BackendReply, BackendRequest, Engine};
use gaitview_core::feed::StatusLevel;
use gaitview_core::prefs::LayoutPrefs;
use gaitview_core::search::DateRange;
use gaitview_core::types::{FeedMode, Selection};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;

use crate::event::LiveEvent;
use crate::ui::diff_view::BodyCache;

/// Panel width change per `<`/`>`/`[`/`]` press.
pub const PCT_STEP: u16 = 5;

/// Non-error status messages disappear after this long.
const STATUS_TTL: Duration = Duration::from_secs(6);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    /// A one-line prompt is open (see [`AppState::prompt`]).
    Insert,
    HelpOverlay,
    /// Waiting for y/n on [`AppState::pending_confirm`].
    Confirm,
}

/// What the open prompt will do on Enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Search,
    DateRange,
    CommitMessage,
    BranchName,
    TagName,
    StashMessage,
}

impl PromptKind {
    pub fn title(self) -> &'static str {
        match self {
            PromptKind::Search => "Search",
            PromptKind::DateRange => "Date range (YYYY-MM-DD..YYYY-MM-DD, empty clears)",
            PromptKind::CommitMessage => "Commit message",
            PromptKind::BranchName => "New branch",
            PromptKind::TagName => "New tag",
            PromptKind::StashMessage => "Stash message",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

/// Which panel receives navigation keys.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    Sidebar,
    #[default]
    Commits,
    Details,
}

impl PanelFocus {
    pub fn prev(self) -> Self {
        match self {
            PanelFocus::Sidebar => PanelFocus::Details,
            PanelFocus::Commits => PanelFocus::Sidebar,
            PanelFocus::Details => PanelFocus::Commits,
        }
    }

    pub fn next(self) -> Self {
        match self {
            PanelFocus::Sidebar => PanelFocus::Commits,
            PanelFocus::Commits => PanelFocus::Details,
            PanelFocus::Details => PanelFocus::Sidebar,
        }
    }
}

/// What occupies the commit list and details area.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum View {
    #[default]
    Commits,
    Insights,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarSection {
    Branches,
    Tags,
    Stashes,
}

impl SidebarSection {
    pub const ALL: [SidebarSection; 3] =
        [SidebarSection::Branches, SidebarSection::Tags, SidebarSection::Stashes];

    /// Name under which the collapsed flag is persisted.
    pub fn key(self) -> &'static str {
        match self {
            SidebarSection::Branches => "branches",
            SidebarSection::Tags => "tags",
            SidebarSection::Stashes => "stashes",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            SidebarSection::Branches => "Branches",
            SidebarSection::Tags => "Tags",
            SidebarSection::Stashes => "Stashes",
        }
    }
}

/// One row of the sidebar; items index into the feed's `RefLists`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidebarRow {
    Header(SidebarSection),
    Branch(usize),
    Tag(usize),
    Stash(usize),
}

impl SidebarRow {
    pub fn section(self) -> SidebarSection {
        match self {
            SidebarRow::Header(section) => section,
            SidebarRow::Branch(_) => SidebarSection::Branches,
            SidebarRow::Tag(_) => SidebarSection::Tags,
            SidebarRow::Stash(_) => SidebarSection::Stashes,
        }
    }
}

/// One row of the commit list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitRow {
    Uncommitted,
    Commit(String),
}

pub struct AppState {
    pub engine: Engine,
    pub mode: Mode,
    pub focus: PanelFocus,
    pub view: View,

    pub prompt: Option<Prompt>,
    /// Destructive mutation awaiting confirmation.
    pub pending_confirm: Option<Mutation>,

    pub prefs: LayoutPrefs,
    /// Set when `prefs` changed and has not been written yet.
    pub prefs_dirty: bool,

    pub sidebar_state: ListState,
    pub commit_list_state: ListState,
    /// First visible row of the details body.
    pub details_scroll: usize,
    pub insights_scroll: u16,
    pub help_scroll: u16,

    /// Index of the file panel under the cursor.
    pub file_cursor: usize,
    /// Body row at which each file panel starts, cached after each render.
    pub file_row_offsets: Vec<usize>,
    /// Total rows of the details body, cached after each render.
    pub details_row_count: usize,

    pub sidebar_viewport_height: u16,
    pub commits_viewport_height: u16,
    pub details_viewport_height: u16,

    /// Sidebar, commit list and details rects from the last render, for mouse focus.
    pub panel_rects: [Rect; 3],

    pub body_cache: BodyCache,

    outbox: Vec<BackendRequest>,
    status_seen: Option<(String, Instant)>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Engine::default(), LayoutPrefs::default())
    }
}

impl AppState {
    pub fn new(engine: Engine, prefs: LayoutPrefs) -> Self {
        Self {
            engine,
            mode: Mode::default(),
            focus: PanelFocus::default(),
            view: View::default(),
            prompt: None,
            pending_confirm: None,
            prefs,
            prefs_dirty: false,
            sidebar_state: ListState::default(),
            commit_list_state: ListState::default(),
            details_scroll: 0,
            insights_scroll: 0,
            help_scroll: 0,
            file_cursor: 0,
            file_row_offsets: Vec::new(),
            details_row_count: 0,
            sidebar_viewport_height: 0,
            commits_viewport_height: 0,
            details_viewport_height: 0,
            panel_rects: [Rect::default(); 3],
            body_cache: BodyCache::default(),
            outbox: Vec::new(),
            status_seen: None,
        }
    }

    // -----------------------------------------------------------------------
    // Backend plumbing
    // -----------------------------------------------------------------------

    pub fn queue(&mut self, requests: Vec<BackendRequest>) {
        self.outbox.extend(requests);
    }

    /// Requests produced since the last call, in order.
    pub fn take_outbox(&mut self) -> Vec<BackendRequest> {
        std::mem::take(&mut self.outbox)
    }

    pub fn start(&mut self) {
        let requests = self.engine.start();
        self.queue(requests);
    }

    pub fn on_backend_reply(&mut self, reply: BackendReply) {
        let after_page = matches!(reply, BackendReply::Page { .. });
        if let BackendReply::Diff { request, .. } = &reply {
            self.body_cache.invalidate(&request.key);
        }
        let requests = self.engine.handle_reply(reply);
        self.queue(requests);
        if after_page {
            self.sync_commit_cursor();
            self.clamp_sidebar_cursor();
        }
        self.clamp_file_cursor();
    }

    pub fn on_live(&mut self, event: LiveEvent) {
        let reconciler = &mut self.engine.reconciler;
        match event {
            LiveEvent::Connecting => reconciler.on_connecting(),
            LiveEvent::Connected => reconciler.on_connected(),
            LiveEvent::Disconnected(reason) => {
                let delay = reconciler.on_disconnected();
                tracing::debug!(%reason, retry_in = ?delay, "live link dropped");
            }
            LiveEvent::Frame(frame) => {
                let outcome = self.engine.apply_push(*frame);
                tracing::trace!(?outcome, "push applied");
            }
        }
    }

    /// Expires stale informational status messages.
    pub fn on_tick(&mut self, now: Instant) {
        let Some(status) = self.engine.feed.status() else {
            self.status_seen = None;
            return;
        };
        match &self.status_seen {
            Some((text, since)) if *text == status.text => {
                if status.level != StatusLevel::Error && now.duration_since(*since) >= STATUS_TTL {
                    self.engine.feed.clear_status();
                    self.status_seen = None;
                }
            }
            _ => self.status_seen = Some((status.text.clone(), now)),
        }
    }

    // -----------------------------------------------------------------------
    // Commit list
    // -----------------------------------------------------------------------

    pub fn commit_rows(&self) -> Vec<CommitRow> {
        let feed = &self.engine.feed;
        let mut rows = Vec::new();
        if feed.shows_uncommitted() {
            rows.push(CommitRow::Uncommitted);
        }
        rows.extend(feed.visible().into_iter().map(|c| CommitRow::Commit(c.hash.clone())));
        rows
    }

    pub fn selected_commit_row(&self) -> Option<CommitRow> {
        let index = self.commit_list_state.selected()?;
        self.commit_rows().into_iter().nth(index)
    }

    /// Opens the row under the cursor in the details panel.
    pub fn activate_commit_row(&mut self) {
        let requests = match self.selected_commit_row() {
            Some(CommitRow::Uncommitted) => self.engine.select_uncommitted(),
            Some(CommitRow::Commit(hash)) => self.engine.select_commit(&hash),
            None => return,
        };
        self.file_cursor = 0;
        self.details_scroll = 0;
        self.queue(requests);
    }

    /// Pages in more history once the cursor sits on the last row.
    pub fn maybe_load_more(&mut self) {
        let rows = self.commit_rows().len();
        let at_end = matches!(self.commit_list_state.selected(), Some(i) if i + 1 >= rows);
        let feed = &self.engine.feed;
        if at_end && feed.cursor().has_more && !feed.is_loading() {
            let requests = self.engine.load_more();
            self.queue(requests);
        }
    }

    pub fn load_more(&mut self) {
        let requests = self.engine.load_more();
        if requests.is_empty() && !self.engine.feed.cursor().has_more {
            self.engine.feed.set_status(StatusLevel::Info, "No more commits");
        }
        self.queue(requests);
    }

    /// Points the list cursor at the current selection after the rows changed.
    fn sync_commit_cursor(&mut self) {
        let rows = self.commit_rows();
        let wanted = match self.engine.feed.visible_selection() {
            Selection::Uncommitted => rows.iter().position(|r| *r == CommitRow::Uncommitted),
            Selection::Commit(hash) => {
                rows.iter().position(|r| matches!(r, CommitRow::Commit(h) if h == hash))
            }
            Selection::None => None,
        };
        let index = wanted
            .or_else(|| self.commit_list_state.selected().filter(|&i| i < rows.len()))
            .or_else(|| (!rows.is_empty()).then_some(0));
        self.commit_list_state.select(index);
    }

    pub fn refresh(&mut self) {
        let requests = self.engine.refresh();
        self.queue(requests);
    }

    pub fn exit_to_normal_mode(&mut self) {
        let requests = self.engine.exit_to_normal_mode();
        self.queue(requests);
        self.sync_commit_cursor();
    }

    pub fn search(&mut self, query: &str) {
        let hits = self.engine.search(query);
        if matches!(self.engine.feed.mode(), FeedMode::Search(_)) {
            self.engine
                .feed
                .set_status(StatusLevel::Info, format!("{hits} matching commits"));
        }
        self.commit_list_state.select(None);
        self.sync_commit_cursor();
    }

    /// Flips file-path matching for search and re-runs the active query.
    pub fn toggle_file_search(&mut self) {
        let mut filters = self.engine.feed.search_filters().clone();
        filters.files = !filters.files;
        let label = if filters.files { "on" } else { "off" };
        self.engine.set_search_filters(filters);
        self.engine
            .feed
            .set_status(StatusLevel::Info, format!("Search in file paths: {label}"));
        self.sync_commit_cursor();
    }

    /// Limits search hits to commits dated inside `input`; empty input
    /// removes the limit.
    pub fn set_date_range(&mut self, input: &str) {
        let range = match DateRange::parse(input) {
            Ok(range) => range,
            Err(e) => {
                self.engine.feed.set_status(StatusLevel::Error, format!("Date range: {e}"));
                return;
            }
        };
        let mut filters = self.engine.feed.search_filters().clone();
        filters.date = range;
        self.engine.set_search_filters(filters);
        let text = match range {
            Some(range) => format!("Search dates: {}", range_text(&range)),
            None => "Search dates: any".to_owned(),
        };
        self.engine.feed.set_status(StatusLevel::Info, text);
        self.sync_commit_cursor();
    }

    // -----------------------------------------------------------------------
    // Sidebar
    // -----------------------------------------------------------------------

    pub fn sidebar_rows(&self) -> Vec<SidebarRow> {
        let refs = self.engine.feed.refs();
        let mut rows = Vec::new();
        for section in SidebarSection::ALL {
            rows.push(SidebarRow::Header(section));
            if self.prefs.is_collapsed(section.key()) {
                continue;
            }
            match section {
                SidebarSection::Branches => {
                    rows.extend((0..refs.branches.len()).map(SidebarRow::Branch))
                }
                SidebarSection::Tags => rows.extend((0..refs.tags.len()).map(SidebarRow::Tag)),
                SidebarSection::Stashes => {
                    rows.extend((0..refs.stashes.len()).map(SidebarRow::Stash))
                }
            }
        }
        rows
    }

    pub fn selected_sidebar_row(&self) -> Option<SidebarRow> {
        let index = self.sidebar_state.selected()?;
        self.sidebar_rows().get(index).copied()
    }

    fn clamp_sidebar_cursor(&mut self) {
        let len = self.sidebar_rows().len();
        match self.sidebar_state.selected() {
            Some(i) if i >= len => self.sidebar_state.select(len.checked_sub(1)),
            None if len > 0 => self.sidebar_state.select(Some(0)),
            _ => {}
        }
    }

    /// Collapses or expands the section under the sidebar cursor.
    pub fn toggle_sidebar_section(&mut self) {
        let Some(row) = self.selected_sidebar_row() else {
            return;
        };
        let section = row.section();
        self.prefs.toggle_section(section.key());
        self.prefs_dirty = true;
        let header = self.sidebar_rows().iter().position(|r| *r == SidebarRow::Header(section));
        self.sidebar_state.select(header);
    }

    /// Enter on the sidebar: headers fold, tags switch to tag mode.
    pub fn activate_sidebar_row(&mut self) {
        match self.selected_sidebar_row() {
            Some(SidebarRow::Header(_)) => self.toggle_sidebar_section(),
            Some(SidebarRow::Tag(_)) => self.enter_selected_tag(),
            _ => {}
        }
    }

    pub fn enter_selected_tag(&mut self) {
        let Some(SidebarRow::Tag(i)) = self.selected_sidebar_row() else {
            self.engine.feed.set_status(StatusLevel::Info, "Select a tag in the sidebar first");
            return;
        };
        let Some(tag) = self.engine.feed.refs().tags.get(i).map(|t| t.name.clone()) else {
            return;
        };
        let requests = self.engine.enter_tag_mode(&tag);
        self.queue(requests);
        self.commit_list_state.select(None);
        self.focus = PanelFocus::Commits;
    }

    fn selected_branch(&self) -> Option<String> {
        match self.selected_sidebar_row()? {
            SidebarRow::Branch(i) => self.engine.feed.refs().branches.get(i).map(|b| b.name.clone()),
            _ => None,
        }
    }

    fn selected_stash(&self) -> Option<u32> {
        match self.selected_sidebar_row()? {
            SidebarRow::Stash(i) => self.engine.feed.refs().stashes.get(i).map(|s| s.index),
            _ => None,
        }
    }

    pub fn checkout_selected_branch(&mut self) {
        match self.selected_branch() {
            Some(branch) => self.mutate(Mutation::CheckoutBranch { branch }),
            None => self.engine.feed.set_status(StatusLevel::Info, "Select a branch first"),
        }
    }

    pub fn merge_selected_branch(&mut self) {
        match self.selected_branch() {
            Some(name) => self.mutate(Mutation::MergeBranch { name, no_fast_forward: false }),
            None => self.engine.feed.set_status(StatusLevel::Info, "Select a branch first"),
        }
    }

    /// `a`/`p`/`d` on a stash row.
    pub fn stash_action(&mut self, build: fn(u32) -> Mutation) {
        let Some(index) = self.selected_stash() else {
            self.engine.feed.set_status(StatusLevel::Info, "Select a stash first");
            return;
        };
        let mutation = build(index);
        if matches!(mutation, Mutation::DropStash { .. }) {
            self.ask_confirm(mutation);
        } else {
            self.mutate(mutation);
        }
    }

    /// Asks before deleting the branch or tag under the sidebar cursor.
    pub fn delete_selected_ref(&mut self) {
        let refs = self.engine.feed.refs();
        let mutation = match self.selected_sidebar_row() {
            Some(SidebarRow::Branch(i)) => refs
                .branches
                .get(i)
                .map(|b| Mutation::DeleteBranch { name: b.name.clone(), force: false }),
            Some(SidebarRow::Tag(i)) => {
                refs.tags.get(i).map(|t| Mutation::DeleteTag { name: t.name.clone() })
            }
            Some(SidebarRow::Stash(i)) => {
                refs.stashes.get(i).map(|s| Mutation::DropStash { index: s.index })
            }
            _ => None,
        };
        if let Some(mutation) = mutation {
            self.ask_confirm(mutation);
        }
    }

    // -----------------------------------------------------------------------
    // Details and file panels
    // -----------------------------------------------------------------------

    fn file_count(&self) -> usize {
        self.engine.panels.panels().len()
    }

    fn clamp_file_cursor(&mut self) {
        self.file_cursor = self.file_cursor.min(self.file_count().saturating_sub(1));
    }

    pub fn next_file(&mut self) {
        if self.file_cursor + 1 < self.file_count() {
            self.file_cursor += 1;
        }
        self.scroll_to_file_cursor();
    }

    pub fn prev_file(&mut self) {
        self.file_cursor = self.file_cursor.saturating_sub(1);
        self.scroll_to_file_cursor();
    }

    fn scroll_to_file_cursor(&mut self) {
        if let Some(&offset) = self.file_row_offsets.get(self.file_cursor) {
            self.details_scroll = offset;
        }
    }

    /// Space/o: expands or collapses the file under the cursor.
    pub fn toggle_file(&mut self) {
        let requests = self.engine.toggle_file(self.file_cursor);
        self.queue(requests);
    }

    pub fn collapse_all(&mut self) {
        let removed = self.engine.collapse_all();
        self.details_scroll = self.file_row_offsets.get(self.file_cursor).copied().unwrap_or(0);
        tracing::debug!(removed, "collapsed all panels");
    }

    pub fn toggle_layout(&mut self) {
        let layout = self.engine.toggle_layout();
        self.engine.feed.set_status(StatusLevel::Info, format!("Diff layout: {layout:?}"));
    }

    fn selected_file_path(&self) -> Option<String> {
        self.engine.panels.panels().get(self.file_cursor).map(|p| p.file().path.clone())
    }

    /// `s`/`u`: only working-tree files can be staged.
    pub fn stage_selected_file(&mut self, stage: bool) {
        if *self.engine.feed.selection() != Selection::Uncommitted {
            self.engine
                .feed
                .set_status(StatusLevel::Info, "Open uncommitted changes to stage files");
            return;
        }
        let Some(path) = self.selected_file_path() else {
            return;
        };
        self.mutate(if stage { Mutation::Stage { path } } else { Mutation::Unstage { path } });
    }

    // -----------------------------------------------------------------------
    // Prompts, confirmations and mutations
    // -----------------------------------------------------------------------

    pub fn open_prompt(&mut self, kind: PromptKind) {
        let input = match kind {
            PromptKind::Search => self.engine.feed.search_query().unwrap_or_default().to_owned(),
            PromptKind::DateRange => {
                self.engine.feed.search_filters().date.map(|r| range_text(&r)).unwrap_or_default()
            }
            _ => String::new(),
        };
        self.prompt = Some(Prompt { kind, input });
        self.mode = Mode::Insert;
    }

    pub fn cancel_prompt(&mut self) {
        self.prompt = None;
        self.mode = Mode::Normal;
    }

    /// Enter in a prompt. Empty input cancels, except for search where it
    /// leaves search mode and for the date range where it clears the limit.
    pub fn submit_prompt(&mut self) {
        let Some(Prompt { kind, input }) = self.prompt.take() else {
            self.mode = Mode::Normal;
            return;
        };
        self.mode = Mode::Normal;
        let text = input.trim().to_owned();
        if text.is_empty() && !matches!(kind, PromptKind::Search | PromptKind::DateRange) {
            return;
        }
        let selected = self.engine.feed.selection().hash().map(str::to_owned);
        match kind {
            PromptKind::Search => self.search(&text),
            PromptKind::DateRange => self.set_date_range(&text),
            PromptKind::CommitMessage => {
                self.mutate(Mutation::CreateCommit { message: text, amend: false, signoff: false })
            }
            PromptKind::BranchName => {
                self.mutate(Mutation::CreateBranch { name: text, start_point: selected })
            }
            PromptKind::TagName => {
                self.mutate(Mutation::CreateTag { name: text, commit: selected, message: None })
            }
            PromptKind::StashMessage => {
                self.mutate(Mutation::CreateStash { message: text, include_untracked: false })
            }
        }
    }

    pub fn ask_confirm(&mut self, mutation: Mutation) {
        self.pending_confirm = Some(mutation);
        self.mode = Mode::Confirm;
    }

    pub fn resolve_confirm(&mut self, accepted: bool) {
        self.mode = Mode::Normal;
        if let Some(mutation) = self.pending_confirm.take() {
            if accepted {
                self.mutate(mutation);
            }
        }
    }

    pub fn mutate(&mut self, mutation: Mutation) {
        let requests = self.engine.run_mutation(mutation);
        self.queue(requests);
    }

    pub fn toggle_insights(&mut self) {
        self.view = match self.view {
            View::Commits => {
                let requests = self.engine.refresh_insights();
                self.queue(requests);
                View::Insights
            }
            View::Insights => View::Commits,
        };
        self.insights_scroll = 0;
    }

    // -----------------------------------------------------------------------
    // Panel geometry
    // -----------------------------------------------------------------------

    pub fn grow_list(&mut self) {
        self.prefs.set_list_pct(self.prefs.list_pct.saturating_add(PCT_STEP));
        self.prefs_dirty = true;
    }

    pub fn shrink_list(&mut self) {
        self.prefs.set_list_pct(self.prefs.list_pct.saturating_sub(PCT_STEP));
        self.prefs_dirty = true;
    }

    pub fn grow_sidebar(&mut self) {
        self.prefs.set_sidebar_pct(self.prefs.sidebar_pct.saturating_add(PCT_STEP));
        self.prefs_dirty = true;
    }

    pub fn shrink_sidebar(&mut self) {
        self.prefs.set_sidebar_pct(self.prefs.sidebar_pct.saturating_sub(PCT_STEP));
        self.prefs_dirty = true;
    }

    // -----------------------------------------------------------------------
    // Scrolling
    // -----------------------------------------------------------------------

    pub fn scroll_down(&mut self, lines: u16) {
        if self.view == View::Insights && self.focus != PanelFocus::Sidebar {
            self.insights_scroll = self.insights_scroll.saturating_add(lines);
            return;
        }
        match self.focus {
            PanelFocus::Sidebar => self.sidebar_state.scroll_down_by(lines),
            PanelFocus::Commits => {
                self.commit_list_state.scroll_down_by(lines);
                self.maybe_load_more();
            }
            PanelFocus::Details => {
                let max = self.details_row_count.saturating_sub(1);
                self.details_scroll = self.details_scroll.saturating_add(lines as usize).min(max);
            }
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        if self.view == View::Insights && self.focus != PanelFocus::Sidebar {
            self.insights_scroll = self.insights_scroll.saturating_sub(lines);
            return;
        }
        match self.focus {
            PanelFocus::Sidebar => self.sidebar_state.scroll_up_by(lines),
            PanelFocus::Commits => self.commit_list_state.scroll_up_by(lines),
            PanelFocus::Details => {
                self.details_scroll = self.details_scroll.saturating_sub(lines as usize)
            }
        }
    }

    pub fn scroll_top(&mut self) {
        if self.view == View::Insights && self.focus != PanelFocus::Sidebar {
            self.insights_scroll = 0;
            return;
        }
        match self.focus {
            PanelFocus::Sidebar => self.sidebar_state.select_first(),
            PanelFocus::Commits => self.commit_list_state.select_first(),
            PanelFocus::Details => self.details_scroll = 0,
        }
    }

    pub fn scroll_bottom(&mut self) {
        if self.view == View::Insights && self.focus != PanelFocus::Sidebar {
            self.insights_scroll = u16::MAX;
            return;
        }
        match self.focus {
            PanelFocus::Sidebar => self.sidebar_state.select_last(),
            PanelFocus::Commits => {
                let rows = self.commit_rows().len();
                self.commit_list_state.select(rows.checked_sub(1));
                self.maybe_load_more();
            }
            PanelFocus::Details => self.details_scroll = self.details_row_count.saturating_sub(1),
        }
    }

    fn focused_viewport_height(&self) -> u16 {
        match self.focus {
            PanelFocus::Sidebar => self.sidebar_viewport_height,
            PanelFocus::Commits => self.commits_viewport_height,
            PanelFocus::Details => self.details_viewport_height,
        }
    }

    /// Uses the height cached by the previous render; scrolls at least one row.
    pub fn half_page_down(&mut self) {
        self.scroll_down((self.focused_viewport_height() / 2).max(1));
    }

    pub fn half_page_up(&mut self) {
        self.scroll_up((self.focused_viewport_height() / 2).max(1));
    }

    pub fn full_page_down(&mut self) {
        self.scroll_down(self.focused_viewport_height().max(1));
    }

    pub fn full_page_up(&mut self) {
        self.scroll_up(self.focused_viewport_height().max(1));
    }
}

/// Inverse of [`DateRange::parse`], for prefilling the prompt.
fn range_text(range: &DateRange) -> String {
    let from = range.from.map(|d| d.to_string()).unwrap_or_default();
    if range.from.is_some() && range.from == range.to {
        return from;
    }
    let to = range.to.map(|d| d.to_string()).unwrap_or_default();
    format!("{from}..{to}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaitview_core::engine::EngineConfig;
    use gaitview_core::feed::PageData;
    use gaitview_core::types::{Author, Branch, Commit, RefLists, Stash, Tag};

    fn commit(hash: &str) -> Commit {
        Commit {
            hash: hash.to_owned(),
            short_hash: String::new(),
            message: format!("change {hash}"),
            author: Author::default(),
            date: None,
            parent_hashes: Vec::new(),
            files: Vec::new(),
        }
    }

    fn refs() -> RefLists {
        RefLists {
            branches: vec![
                Branch { name: "main".into(), hash: "a".into(), is_remote: false, is_current: true },
                Branch { name: "dev".into(), hash: "b".into(), is_remote: false, is_current: false },
            ],
            tags: vec![Tag { name: "v1".into(), hash: "a".into(), message: String::new() }],
            stashes: vec![Stash { index: 0, message: "wip".into(), branch: "main".into() }],
        }
    }

    /// State with one applied Normal page of `hashes`, two commits per page.
    fn loaded(hashes: &[&str]) -> AppState {
        loaded_with(hashes.iter().map(|h| commit(h)).collect())
    }

    fn loaded_with(commits: Vec<Commit>) -> AppState {
        let config = EngineConfig { page_limit: 2, ..EngineConfig::default() };
        let mut state = AppState::new(Engine::new(&config), LayoutPrefs::default());
        state.start();
        let requests = state.take_outbox();
        let Some(BackendRequest::Page { ticket, .. }) = requests.into_iter().next() else {
            panic!("start must request a page");
        };
        let page = PageData {
            commits,
            uncommitted: Some(Vec::new()),
            refs: Some(refs()),
        };
        state.on_backend_reply(BackendReply::Page { ticket, result: Ok(page) });
        state
    }

    #[test]
    fn panel_focus_cycles() {
        let focus = PanelFocus::Commits;
        assert_eq!(focus.next(), PanelFocus::Details);
        assert_eq!(focus.next().next(), PanelFocus::Sidebar);
        assert_eq!(focus.prev(), PanelFocus::Sidebar);
        assert_eq!(focus.next().next().next(), focus);
    }

    #[test]
    fn first_page_puts_cursor_on_first_row() {
        let state = loaded(&["a", "b"]);
        assert_eq!(state.commit_list_state.selected(), Some(0));
        assert_eq!(state.selected_commit_row(), Some(CommitRow::Commit("a".into())));
        assert_eq!(state.sidebar_state.selected(), Some(0));
    }

    #[test]
    fn activating_a_row_requests_details() {
        let mut state = loaded(&["a", "b"]);
        state.commit_list_state.select(Some(1));
        state.activate_commit_row();
        let out = state.take_outbox();
        assert!(matches!(&out[..], [BackendRequest::Details { hash, .. }] if hash == "b"));
        assert_eq!(state.engine.feed.selection().hash(), Some("b"));
    }

    #[test]
    fn reaching_the_last_row_pages_in_more() {
        let mut state = loaded(&["a", "b"]);
        state.scroll_down(1);
        let out = state.take_outbox();
        assert!(matches!(&out[..], [BackendRequest::Page { ticket, .. }] if ticket.offset == 2));

        // A second press while the page is in flight does not ask again
        state.scroll_down(1);
        assert!(state.take_outbox().is_empty());
    }

    #[test]
    fn collapsed_sections_hide_their_rows() {
        let mut state = loaded(&["a"]);
        assert_eq!(state.sidebar_rows().len(), 3 + 2 + 1 + 1);

        state.sidebar_state.select(Some(3)); // Tags header
        state.toggle_sidebar_section();
        assert!(state.prefs.is_collapsed("tags"));
        assert!(state.prefs_dirty);
        assert!(!state.sidebar_rows().contains(&SidebarRow::Tag(0)));
        assert_eq!(state.selected_sidebar_row(), Some(SidebarRow::Header(SidebarSection::Tags)));
    }

    #[test]
    fn tag_row_enters_tag_mode() {
        let mut state = loaded(&["a"]);
        state.sidebar_state.select(Some(4)); // v1
        state.activate_sidebar_row();
        assert_eq!(state.engine.feed.mode(), &FeedMode::Tag("v1".into()));
        assert_eq!(state.take_outbox().len(), 1);
    }

    #[test]
    fn dropping_a_stash_asks_first() {
        let mut state = loaded(&["a"]);
        state.sidebar_state.select(Some(6)); // stash@{0}
        state.stash_action(|index| Mutation::DropStash { index });
        assert_eq!(state.mode, Mode::Confirm);
        assert!(state.take_outbox().is_empty());

        state.resolve_confirm(false);
        assert_eq!(state.mode, Mode::Normal);
        assert!(state.take_outbox().is_empty());

        state.stash_action(|index| Mutation::ApplyStash { index });
        let out = state.take_outbox();
        assert_eq!(out, vec![BackendRequest::Mutation(Mutation::ApplyStash { index: 0 })]);
    }

    #[test]
    fn branch_prompt_starts_at_selected_commit() {
        let mut state = loaded(&["a", "b"]);
        state.activate_commit_row();
        state.take_outbox();

        state.open_prompt(PromptKind::BranchName);
        assert_eq!(state.mode, Mode::Insert);
        if let Some(prompt) = state.prompt.as_mut() {
            prompt.input.push_str(" feature ");
        }
        state.submit_prompt();
        assert_eq!(state.mode, Mode::Normal);
        assert_eq!(
            state.take_outbox(),
            vec![BackendRequest::Mutation(Mutation::CreateBranch {
                name: "feature".into(),
                start_point: Some("a".into()),
            })]
        );
    }

    #[test]
    fn empty_prompt_is_cancelled() {
        let mut state = loaded(&["a"]);
        state.open_prompt(PromptKind::CommitMessage);
        state.submit_prompt();
        assert!(state.take_outbox().is_empty());
        assert!(state.prompt.is_none());
    }

    fn dated(hash: &str, date: &str) -> Commit {
        serde_json::from_value(serde_json::json!({
            "hash": hash,
            "message": format!("change {hash}"),
            "author": { "name": "Dana", "email": "dana@example.com" },
            "date": date,
        }))
        .unwrap()
    }

    fn type_into_prompt(state: &mut AppState, kind: PromptKind, text: &str) {
        state.open_prompt(kind);
        if let Some(prompt) = state.prompt.as_mut() {
            prompt.input = text.to_owned();
        }
        state.submit_prompt();
    }

    #[test]
    fn date_range_prompt_narrows_search_and_empty_input_clears_it() {
        let mut state = loaded_with(vec![
            dated("aaa", "2024-01-10T09:00:00Z"),
            dated("bbb", "2024-02-20T09:00:00Z"),
        ]);
        type_into_prompt(&mut state, PromptKind::Search, "change");
        assert_eq!(state.commit_rows().len(), 2);

        type_into_prompt(&mut state, PromptKind::DateRange, "2024-02-01..");
        assert_eq!(state.commit_rows(), vec![CommitRow::Commit("bbb".into())]);

        state.open_prompt(PromptKind::DateRange);
        assert_eq!(state.prompt.as_ref().map(|p| p.input.as_str()), Some("2024-02-01.."));
        state.cancel_prompt();

        type_into_prompt(&mut state, PromptKind::DateRange, "not a date");
        assert_eq!(state.engine.feed.status().map(|s| s.level), Some(StatusLevel::Error));
        assert_eq!(state.commit_rows().len(), 1, "a bad range keeps the previous one");

        type_into_prompt(&mut state, PromptKind::DateRange, "");
        assert!(state.engine.feed.search_filters().date.is_none());
        assert_eq!(state.commit_rows().len(), 2);
    }

    #[test]
    fn search_prompt_filters_and_empty_query_leaves() {
        let mut state = loaded(&["aaa", "bbb"]);
        state.open_prompt(PromptKind::Search);
        if let Some(prompt) = state.prompt.as_mut() {
            prompt.input.push_str("bbb");
        }
        state.submit_prompt();
        assert_eq!(state.commit_rows(), vec![CommitRow::Commit("bbb".into())]);

        state.open_prompt(PromptKind::Search);
        assert_eq!(state.prompt.as_ref().map(|p| p.input.as_str()), Some("bbb"));
        if let Some(prompt) = state.prompt.as_mut() {
            prompt.input.clear();
        }
        state.submit_prompt();
        assert_eq!(state.commit_rows().len(), 2);
        assert_eq!(state.engine.feed.mode(), &FeedMode::Normal);
    }

    #[test]
    fn staging_needs_the_working_tree() {
        let mut state = loaded(&["a"]);
        state.stage_selected_file(true);
        assert!(state.take_outbox().is_empty());
        assert!(state.engine.feed.status().is_some());
    }

    #[test]
    fn panel_widths_stay_in_range() {
        let mut state = AppState::default();
        for _ in 0..20 {
            state.grow_list();
            state.shrink_sidebar();
        }
        assert_eq!(state.prefs.list_pct, 70);
        assert_eq!(state.prefs.sidebar_pct, 10);
    }

    #[test]
    fn informational_status_expires() {
        let mut state = AppState::default();
        let start = Instant::now();
        state.engine.feed.set_status(StatusLevel::Info, "hello");
        state.on_tick(start);
        state.on_tick(start + Duration::from_secs(1));
        assert!(state.engine.feed.status().is_some());
        state.on_tick(start + STATUS_TTL);
        assert!(state.engine.feed.status().is_none());

        state.engine.feed.set_status(StatusLevel::Error, "boom");
        state.on_tick(start);
        state.on_tick(start + STATUS_TTL * 2);
        assert!(state.engine.feed.status().is_some(), "errors stay until replaced");
    }
}
