//! The engine ties the feed, the expansion store, the diff panels and the
//! push reconciler together.
//!
//! It is a synchronous state machine. Operations return the
//! [`BackendRequest`]s they need; the owner runs them with [`execute`] on a
//! worker thread and feeds each [`BackendReply`] back through
//! [`Engine::handle_reply`], which may in turn ask for more. Durable writes
//! are collected with [`Engine::take_pending_writes`] after every event.

use crate::api::{GitApi, Mutation, Transport};
use crate::error::{BackendError, FetchError};
use crate::events::{DashboardSnapshot, PushFrame};
use crate::expansion::{ExpansionStateStore, DEFAULT_GC_MIN_LOADED};
use crate::feed::{
    BrowseMode, CommitFeed, LoadKind, PageData, PageOutcome, PageTicket, StatusLevel,
    DEFAULT_PAGE_LIMIT,
};
use crate::fetch::{fetch_page, FetchPlan};
use crate::layout::DiffLayout;
use crate::panel::{DiffPanelSet, DiffRequest};
use crate::reconcile::{RealtimeReconciler, Reconciled, ReconnectPolicy};
use crate::search::SearchFilters;
use crate::types::{Commit, FileDiff, ScopeId, Selection};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub page_limit: usize,
    /// Try the server-rendered listing before the JSON one.
    pub prefer_markup: bool,
    pub gc_min_loaded: usize,
    pub reconnect: ReconnectPolicy,
    pub layout: DiffLayout,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            prefer_markup: true,
            gc_min_loaded: DEFAULT_GC_MIN_LOADED,
            reconnect: ReconnectPolicy::default(),
            layout: DiffLayout::Split,
        }
    }
}

/// Durable state read at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    pub selected: Option<String>,
    pub expansions: Option<String>,
}

/// Durable writes produced since the last flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingWrites {
    /// New expansion snapshot.
    pub expansions: Option<String>,
    /// `Some(None)` clears the stored selection.
    pub selection: Option<Option<String>>,
}

impl PendingWrites {
    pub fn is_empty(&self) -> bool {
        self.expansions.is_none() && self.selection.is_none()
    }
}

/// Work for the backend worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendRequest {
    Page { ticket: PageTicket, plan: FetchPlan },
    Details { hash: String, token: u64 },
    Diff(DiffRequest),
    Mutation(Mutation),
    Dashboard,
    Patterns,
}

/// The result of one [`BackendRequest`].
#[derive(Debug)]
pub enum BackendReply {
    Page { ticket: PageTicket, result: Result<PageData, FetchError> },
    Details { hash: String, token: u64, result: Result<Commit, BackendError> },
    Diff { request: DiffRequest, result: Result<FileDiff, BackendError> },
    Mutation { mutation: Mutation, result: Result<(), BackendError> },
    Dashboard(Result<DashboardSnapshot, BackendError>),
    Patterns(Result<serde_json::Value, BackendError>),
}

/// Performs `request` against the backend. Blocking.
pub fn execute<T: Transport>(api: &GitApi<T>, request: BackendRequest) -> BackendReply {
    match request {
        BackendRequest::Page { ticket, plan } => {
            let result = fetch_page(api, &ticket, &plan);
            BackendReply::Page { ticket, result }
        }
        BackendRequest::Details { hash, token } => {
            let result = api.commit(&hash);
            BackendReply::Details { hash, token, result }
        }
        BackendRequest::Diff(request) => {
            let result = api.diff(&request.key.scope, &request.key.path);
            BackendReply::Diff { request, result }
        }
        BackendRequest::Mutation(mutation) => {
            let result = api.mutate(&mutation);
            BackendReply::Mutation { mutation, result }
        }
        BackendRequest::Dashboard => BackendReply::Dashboard(api.dashboard()),
        BackendRequest::Patterns => BackendReply::Patterns(api.patterns()),
    }
}

/// Full record of the selected commit.
#[derive(Debug, Clone, Default)]
pub struct DetailsState {
    token: u64,
    pub commit: Option<Commit>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct Engine {
    pub feed: CommitFeed,
    pub expansions: ExpansionStateStore,
    pub panels: DiffPanelSet,
    pub reconciler: RealtimeReconciler,
    pub details: DetailsState,
    prefer_markup: bool,
    gc_min_loaded: usize,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            feed: CommitFeed::new(config.page_limit),
            expansions: ExpansionStateStore::new(config.gc_min_loaded),
            panels: DiffPanelSet::new(config.layout),
            reconciler: RealtimeReconciler::new(config.reconnect),
            details: DetailsState::default(),
            prefer_markup: config.prefer_markup,
            gc_min_loaded: config.gc_min_loaded,
        }
    }

    /// Restores durable state. Call before [`Engine::start`].
    pub fn hydrate(&mut self, state: PersistedState) {
        if let Some(raw) = state.expansions.as_deref() {
            self.expansions = ExpansionStateStore::from_snapshot(raw, self.gc_min_loaded);
        }
        if let Some(selected) = state.selected.as_deref() {
            self.feed.remember_selection(selected);
        }
        tracing::debug!(
            expansions = self.expansions.len(),
            restore = ?self.feed.pending_restore(),
            "engine hydrated"
        );
    }

    fn page_request(&self, ticket: PageTicket) -> BackendRequest {
        let plan = FetchPlan::for_ticket(&ticket, self.prefer_markup);
        BackendRequest::Page { ticket, plan }
    }

    // -----------------------------------------------------------------------
    // Feed operations
    // -----------------------------------------------------------------------

    /// First page plus the insights aggregates.
    pub fn start(&mut self) -> Vec<BackendRequest> {
        let ticket = self.feed.load_initial();
        vec![self.page_request(ticket), BackendRequest::Dashboard, BackendRequest::Patterns]
    }

    /// Reloads Normal history from the top.
    pub fn refresh(&mut self) -> Vec<BackendRequest> {
        let ticket = self.feed.load_initial();
        vec![self.page_request(ticket)]
    }

    pub fn load_more(&mut self) -> Vec<BackendRequest> {
        self.feed.load_more().map(|t| self.page_request(t)).into_iter().collect()
    }

    pub fn enter_tag_mode(&mut self, tag: &str) -> Vec<BackendRequest> {
        let ticket = self.feed.enter_tag_mode(tag);
        self.clear_details();
        vec![self.page_request(ticket)]
    }

    pub fn exit_to_normal_mode(&mut self) -> Vec<BackendRequest> {
        match self.feed.exit_to_normal_mode() {
            Some(ticket) => {
                self.clear_details();
                vec![self.page_request(ticket)]
            }
            None => Vec::new(),
        }
    }

    /// Filters the loaded window. Returns the number of matches.
    pub fn search(&mut self, query: &str) -> usize {
        self.feed.search(query)
    }

    pub fn set_search_filters(&mut self, filters: SearchFilters) {
        self.feed.set_search_filters(filters);
    }

    // -----------------------------------------------------------------------
    // Selection and panels
    // -----------------------------------------------------------------------

    pub fn select_commit(&mut self, hash: &str) -> Vec<BackendRequest> {
        if self.feed.selection().hash() == Some(hash) && self.details.commit.is_some() {
            return Vec::new();
        }
        if !self.feed.select(hash) {
            return Vec::new();
        }
        self.open_details(hash.to_owned())
    }

    pub fn select_uncommitted(&mut self) -> Vec<BackendRequest> {
        if !self.feed.select_uncommitted() {
            return Vec::new();
        }
        self.open_uncommitted()
    }

    fn open_details(&mut self, hash: String) -> Vec<BackendRequest> {
        self.panels.clear();
        self.details.token += 1;
        self.details.commit = None;
        self.details.error = None;
        self.details.loading = true;
        vec![BackendRequest::Details { hash, token: self.details.token }]
    }

    fn open_uncommitted(&mut self) -> Vec<BackendRequest> {
        self.details.token += 1;
        self.details.commit = None;
        self.details.error = None;
        self.details.loading = false;
        self.panels
            .open_scope(ScopeId::Uncommitted, self.feed.uncommitted(), &self.expansions)
            .into_iter()
            .map(BackendRequest::Diff)
            .collect()
    }

    fn open_selection(&mut self) -> Vec<BackendRequest> {
        match self.feed.selection().clone() {
            Selection::Commit(hash) => self.open_details(hash),
            Selection::Uncommitted => self.open_uncommitted(),
            Selection::None => {
                self.clear_details();
                Vec::new()
            }
        }
    }

    fn clear_details(&mut self) {
        self.details.token += 1;
        self.details.commit = None;
        self.details.error = None;
        self.details.loading = false;
        self.panels.clear();
    }

    /// Expands or collapses the file panel at `index`.
    pub fn toggle_file(&mut self, index: usize) -> Vec<BackendRequest> {
        self.panels
            .toggle(index, &mut self.expansions)
            .map(BackendRequest::Diff)
            .into_iter()
            .collect()
    }

    pub fn collapse_all(&mut self) -> usize {
        self.panels.collapse_all(&mut self.expansions)
    }

    pub fn toggle_layout(&mut self) -> DiffLayout {
        self.panels.toggle_layout()
    }

    // -----------------------------------------------------------------------
    // Mutations and insights
    // -----------------------------------------------------------------------

    pub fn run_mutation(&mut self, mutation: Mutation) -> Vec<BackendRequest> {
        self.feed.set_status(StatusLevel::Info, format!("{}...", mutation.label()));
        vec![BackendRequest::Mutation(mutation)]
    }

    pub fn refresh_insights(&self) -> Vec<BackendRequest> {
        vec![BackendRequest::Dashboard, BackendRequest::Patterns]
    }

    /// Folds a push frame into the board and the feed.
    pub fn apply_push(&mut self, frame: PushFrame) -> Reconciled {
        self.reconciler.apply(frame.event, &mut self.feed)
    }

    // -----------------------------------------------------------------------
    // Replies
    // -----------------------------------------------------------------------

    /// Applies a backend reply and returns any follow-up requests.
    pub fn handle_reply(&mut self, reply: BackendReply) -> Vec<BackendRequest> {
        match reply {
            BackendReply::Page { ticket, result } => self.on_page(ticket, result),
            BackendReply::Details { hash, token, result } => self.on_details(&hash, token, result),
            BackendReply::Diff { request, result } => {
                let failed = result.as_ref().err().map(ToString::to_string);
                let applied = self.panels.apply_diff(&request, result.map_err(|e| e.to_string()));
                if let (true, Some(message)) = (applied, failed) {
                    self.feed.set_status(
                        StatusLevel::Error,
                        format!("Could not load diff for {}: {message}", request.key.path),
                    );
                }
                Vec::new()
            }
            BackendReply::Mutation { mutation, result } => {
                if let Err(err) = &result {
                    tracing::warn!(mutation = %mutation.label(), error = %err, "mutation failed");
                }
                self.feed
                    .on_mutation_result(&mutation.label(), result.map_err(|e| e.to_string()))
                    .map(|ticket| self.page_request(ticket))
                    .into_iter()
                    .collect()
            }
            BackendReply::Dashboard(result) => {
                match result {
                    Ok(snapshot) => self.reconciler.board.apply_dashboard(snapshot),
                    Err(err) => tracing::warn!(error = %err, "dashboard unavailable"),
                }
                Vec::new()
            }
            BackendReply::Patterns(result) => {
                match result {
                    Ok(patterns) => self.reconciler.board.apply_patterns(patterns),
                    Err(err) => tracing::warn!(error = %err, "patterns unavailable"),
                }
                Vec::new()
            }
        }
    }

    fn on_page(
        &mut self,
        ticket: PageTicket,
        result: Result<PageData, FetchError>,
    ) -> Vec<BackendRequest> {
        let result = result.map_err(|err| match err.last() {
            Some(last) => last.to_string(),
            None => err.to_string(),
        });
        let PageOutcome::Applied { restored, .. } = self.feed.apply_page(&ticket, result) else {
            return Vec::new();
        };

        let mut requests = Vec::new();
        if ticket.mode == BrowseMode::Normal {
            self.expansions.garbage_collect(&self.feed.loaded_hashes());
            requests.extend(self.panels.resync(&self.expansions).into_iter().map(BackendRequest::Diff));
        }
        if restored {
            requests.extend(self.open_selection());
        } else if ticket.kind == LoadKind::Initial && *self.feed.selection() == Selection::None {
            self.clear_details();
        }
        requests
    }

    fn on_details(
        &mut self,
        hash: &str,
        token: u64,
        result: Result<Commit, BackendError>,
    ) -> Vec<BackendRequest> {
        if token != self.details.token || self.feed.selection().hash() != Some(hash) {
            tracing::debug!(hash, token, "discarding stale commit details");
            return Vec::new();
        }
        self.details.loading = false;
        match result {
            Ok(commit) => {
                let scope = self.feed.scope_for(hash);
                let requests = self
                    .panels
                    .open_scope(scope, &commit.files, &self.expansions)
                    .into_iter()
                    .map(BackendRequest::Diff)
                    .collect();
                self.details.commit = Some(commit);
                requests
            }
            Err(err) => {
                let message = err.to_string();
                self.feed.set_status(StatusLevel::Error, format!("Could not load {hash}: {message}"));
                self.details.error = Some(message);
                Vec::new()
            }
        }
    }

    /// Collects durable writes made since the previous call.
    pub fn take_pending_writes(&mut self) -> PendingWrites {
        PendingWrites {
            expansions: self.expansions.take_dirty_snapshot(),
            selection: self.feed.take_selection_change(),
        }
    }
}
