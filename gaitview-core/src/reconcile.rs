//! Applies push events to local state.
//!
//! The socket itself lives in the application; this module only tracks the
//! link state, decides how long to wait before reconnecting, and folds decoded
//! [`PushEvent`]s into the insights board and the commit feed. Events that
//! arrive while the link is not `Connected` are ignored, so a half-torn-down
//! socket cannot mutate state.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::Duration;

use serde_json::Value;

use crate::events::{
    Analytics, DashboardSnapshot, Insight, InsightSet, KnowledgeGraph, Notice, PushEvent,
};
use crate::feed::CommitFeed;
use crate::types::FeedMode;

/// Notices kept for the notification list.
pub const MAX_NOTICES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Reconnect delay. Fixed, no backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { delay: Duration::from_secs(5) }
    }
}

impl ReconnectPolicy {
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// Delay before reconnect attempt `attempt`. The same for every attempt.
    pub fn delay_for(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Aggregates shown in the insights view.
#[derive(Debug, Clone, Default)]
pub struct InsightsBoard {
    pub analytics: Option<Analytics>,
    pub insights: Vec<Insight>,
    pub semantics: Option<BTreeMap<String, f64>>,
    pub knowledge_graph: Option<KnowledgeGraph>,
    pub patterns: Option<Value>,
    /// Most recent pushed insight.
    pub spotlight: Option<Insight>,
    pub notices: VecDeque<Notice>,
    counted: HashSet<String>,
}

impl InsightsBoard {
    /// Replaces every section present in `snapshot`; absent sections are kept.
    pub fn apply_dashboard(&mut self, snapshot: DashboardSnapshot) {
        if let Some(analytics) = snapshot.analytics {
            self.analytics = Some(analytics);
            // Server totals include every commit pushed so far.
            self.counted.clear();
        }
        if let Some(InsightSet { insights, knowledge_graph }) = snapshot.insights {
            self.insights = insights;
            if knowledge_graph.is_some() {
                self.knowledge_graph = knowledge_graph;
            }
        }
        if let Some(semantics) = snapshot.semantics {
            self.semantics = Some(semantics);
        }
        if let Some(graph) = snapshot.knowledge_graph {
            self.knowledge_graph = Some(graph);
        }
        if let Some(patterns) = snapshot.patterns {
            self.patterns = Some(patterns);
        }
    }

    pub fn apply_patterns(&mut self, patterns: Value) {
        self.patterns = Some(patterns);
    }

    pub fn push_notice(&mut self, notice: Notice) {
        if self.notices.len() == MAX_NOTICES {
            self.notices.pop_back();
        }
        self.notices.push_front(notice);
    }

    /// Counts a pushed commit into the aggregates once. Returns `false` for a
    /// hash that was already counted.
    fn count_commit(&mut self, hash: &str) -> bool {
        if !self.counted.insert(hash.to_owned()) {
            return false;
        }
        if let Some(analytics) = self.analytics.as_mut() {
            analytics.total_commits += 1;
            if let Some(last) = analytics.commit_trends.values.last_mut() {
                *last += 1;
            }
        }
        true
    }
}

/// What an applied event changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    Aggregates,
    IncomingCommit,
    Notice,
    Ignored,
}

#[derive(Debug, Default)]
pub struct RealtimeReconciler {
    state: LinkState,
    policy: ReconnectPolicy,
    attempts: u32,
    pub board: InsightsBoard,
}

impl RealtimeReconciler {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, ..Self::default() }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    pub fn on_connecting(&mut self) {
        self.state = LinkState::Connecting;
    }

    pub fn on_connected(&mut self) {
        tracing::info!(after_attempts = self.attempts, "push channel connected");
        self.state = LinkState::Connected;
        self.attempts = 0;
    }

    /// Records a dropped link and returns how long to wait before retrying.
    pub fn on_disconnected(&mut self) -> Duration {
        self.state = LinkState::Disconnected;
        let delay = self.policy.delay_for(self.attempts);
        self.attempts = self.attempts.saturating_add(1);
        delay
    }

    /// Folds `event` into local state.
    pub fn apply(&mut self, event: PushEvent, feed: &mut CommitFeed) -> Reconciled {
        if self.state != LinkState::Connected {
            tracing::debug!(?event, "ignoring push event on inactive link");
            return Reconciled::Ignored;
        }
        match event {
            PushEvent::Analytics(snapshot) => {
                self.board.apply_dashboard(snapshot);
                Reconciled::Aggregates
            }
            PushEvent::Commit { hash, message } => {
                self.board.push_notice(Notice {
                    kind: "info".to_owned(),
                    title: "New commit".to_owned(),
                    message: message.lines().next().unwrap_or_default().to_owned(),
                });
                if feed.browse_mode() == FeedMode::Normal && self.board.count_commit(&hash) {
                    feed.note_incoming_commit(&hash);
                    Reconciled::IncomingCommit
                } else {
                    Reconciled::Notice
                }
            }
            PushEvent::Insight(insight) => {
                self.board.spotlight = Some(insight);
                Reconciled::Aggregates
            }
            PushEvent::Notification(notice) => {
                self.board.push_notice(notice);
                Reconciled::Notice
            }
            PushEvent::Unknown(kind) => {
                tracing::debug!(%kind, "unknown push event");
                Reconciled::Ignored
            }
        }
    }
}
