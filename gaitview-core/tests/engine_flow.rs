//! End-to-end engine scenarios against a canned backend.
//!
//! The fake transport answers by request path (`/api/commits?limit=2&offset=0`)
//! and records every path it was asked for, so tests can assert on fallback
//! order as well as on the resulting state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use gaitview_core::api::{Endpoint, GitApi, Method, Mutation, Transport};
use gaitview_core::engine::{execute, BackendRequest, Engine, EngineConfig, PersistedState};
use gaitview_core::error::BackendError;
use gaitview_core::events::PushFrame;
use gaitview_core::feed::StatusLevel;
use gaitview_core::panel::PanelState;
use gaitview_core::reconcile::Reconciled;
use gaitview_core::types::{FeedMode, Selection};

#[derive(Clone)]
enum Canned {
    Body(String),
    Status(u16, String),
}

#[derive(Clone, Default)]
struct FakeTransport {
    routes: Arc<Mutex<HashMap<String, Canned>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeTransport {
    fn route(&self, path: &str, body: Value) -> &Self {
        self.routes.lock().unwrap().insert(path.to_owned(), Canned::Body(body.to_string()));
        self
    }

    fn route_raw(&self, path: &str, body: &str) -> &Self {
        self.routes.lock().unwrap().insert(path.to_owned(), Canned::Body(body.to_owned()));
        self
    }

    fn fail(&self, path: &str, status: u16, body: &str) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_owned(), Canned::Status(status, body.to_owned()));
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, path: String) -> Result<String, BackendError> {
        self.calls.lock().unwrap().push(path.clone());
        match self.routes.lock().unwrap().get(&path).cloned() {
            Some(Canned::Body(body)) => Ok(body),
            Some(Canned::Status(status, body)) => Err(BackendError::Server {
                status,
                message: gaitview_core::api::server_message(status, &body),
            }),
            None => Err(BackendError::Transport(format!("no route for {path}"))),
        }
    }
}

impl Transport for FakeTransport {
    fn get(&self, endpoint: &Endpoint) -> Result<String, BackendError> {
        self.answer(endpoint.path())
    }

    fn send(&self, method: Method, endpoint: &Endpoint, _body: &Value) -> Result<String, BackendError> {
        let prefix = match method {
            Method::Post => "POST ",
            Method::Delete => "DELETE ",
        };
        self.answer(format!("{prefix}{}", endpoint.path()))
    }
}

fn commit(hash: &str) -> Value {
    json!({
        "hash": hash,
        "message": format!("change {hash}"),
        "author": { "name": "Dana", "email": "dana@example.com" },
        "date": "2024-05-01T10:00:00Z",
    })
}

fn commits(hashes: &[&str]) -> Value {
    Value::Array(hashes.iter().map(|h| commit(h)).collect())
}

/// Runs requests (and every follow-up) to completion.
fn drive(engine: &mut Engine, api: &GitApi<FakeTransport>, requests: Vec<BackendRequest>) {
    let mut queue = requests;
    while !queue.is_empty() {
        let request = queue.remove(0);
        let reply = execute(api, request);
        queue.extend(engine.handle_reply(reply));
    }
}

fn engine(limit: usize) -> Engine {
    Engine::new(&EngineConfig { page_limit: limit, ..EngineConfig::default() })
}

fn loaded(engine: &Engine) -> Vec<String> {
    engine.feed.commits().iter().map(|c| c.hash.clone()).collect()
}

#[test]
fn initial_load_falls_back_to_per_resource_endpoints() {
    let transport = FakeTransport::default();
    transport
        .fail("/api/all?limit=2", 500, r#"{"error":"batched endpoint disabled"}"#)
        .route("/api/commits?limit=2&offset=0", commits(&["a", "b"]))
        .route(
            "/api/uncommitted",
            json!([{ "path": "wip.rs", "status": "modified", "additions": 2, "deletions": 0 }]),
        )
        .route("/api/branches", json!([{ "name": "main", "isCurrent": true }]))
        .route("/api/tags", json!([{ "name": "v1.0" }]))
        .route("/api/stashes", json!([]));
    let api = GitApi::new(transport.clone());
    let mut engine = engine(2);

    let requests = engine.start();
    drive(&mut engine, &api, requests);

    assert_eq!(loaded(&engine), ["a", "b"]);
    assert!(engine.feed.shows_uncommitted());
    assert_eq!(engine.feed.refs().current_branch().unwrap().name, "main");
    assert_eq!(engine.feed.refs().tags[0].name, "v1.0");
    assert!(engine.feed.cursor().has_more);
    let calls = transport.calls();
    assert_eq!(calls[0], "/api/all?limit=2");
    assert_eq!(calls[1], "/api/commits?limit=2&offset=0");
}

#[test]
fn load_more_prefers_markup_then_json() {
    let transport = FakeTransport::default();
    transport
        .route("/api/all?limit=2", json!({ "commits": commits(&["a", "b"]) }))
        .route_raw("/api/commits/html?limit=2&offset=2", "<html>maintenance</html>")
        .route("/api/commits?limit=2&offset=2", commits(&["c"]));
    let api = GitApi::new(transport.clone());
    let mut engine = engine(2);

    let requests = engine.refresh();
    drive(&mut engine, &api, requests);

    let requests = engine.load_more();
    assert_eq!(requests.len(), 1);
    assert!(engine.load_more().is_empty(), "no second load while one is in flight");
    drive(&mut engine, &api, requests);

    assert_eq!(loaded(&engine), ["a", "b", "c"]);
    assert_eq!(engine.feed.cursor().offset, 3);
    assert!(!engine.feed.cursor().has_more);
    assert!(engine.load_more().is_empty(), "history exhausted");
    let calls = transport.calls();
    let html = calls.iter().position(|c| c == "/api/commits/html?limit=2&offset=2").unwrap();
    let json = calls.iter().position(|c| c == "/api/commits?limit=2&offset=2").unwrap();
    assert!(html < json);
}

#[test]
fn short_rendered_page_without_end_marker_falls_back_to_json() {
    let transport = FakeTransport::default();
    transport
        .route("/api/all?limit=2", json!({ "commits": commits(&["a", "b"]) }))
        .route_raw(
            "/api/commits/html?limit=2&offset=2",
            r#"<li class="commit-item" data-hash="c">
                   <div class="commit-message">Third</div>
               </li>
               <li class="commit-item">garbled entry</li>"#,
        )
        .route("/api/commits?limit=2&offset=2", commits(&["c", "d"]));
    let api = GitApi::new(transport.clone());
    let mut engine = engine(2);

    let requests = engine.refresh();
    drive(&mut engine, &api, requests);
    let requests = engine.load_more();
    drive(&mut engine, &api, requests);

    assert_eq!(loaded(&engine), ["a", "b", "c", "d"]);
    assert_eq!(engine.feed.cursor().offset, 4);
    assert!(engine.feed.cursor().has_more, "a full JSON page keeps paging open");
    assert!(transport.calls().contains(&"/api/commits?limit=2&offset=2".to_owned()));
}

#[test]
fn tag_mode_pages_through_rendered_listing() {
    let transport = FakeTransport::default();
    transport.route_raw(
        "/api/commits/tag/v1.0/html?limit=2&offset=0",
        r#"<li class="commit-item" onclick="gAItUI.selectCommit('t1')" data-hash="t1">
               <div class="commit-message">Tagged work</div>
               <span class="commit-author">Dana</span>
               <span class="commit-date">2024-05-01 10:00</span>
           </li>
           <li class="end-indicator">All commits loaded</li>"#,
    );
    let api = GitApi::new(transport);
    let mut engine = engine(2);

    let requests = engine.enter_tag_mode("v1.0");
    drive(&mut engine, &api, requests);

    assert_eq!(engine.feed.mode(), &FeedMode::Tag("v1.0".into()));
    assert_eq!(loaded(&engine), ["t1"]);
    assert_eq!(engine.feed.commits()[0].message, "Tagged work");
    assert!(!engine.feed.shows_uncommitted());
    assert!(!engine.feed.cursor().has_more);
}

#[test]
fn page_from_previous_mode_is_discarded() {
    let transport = FakeTransport::default();
    transport
        .route("/api/all?limit=2", json!({ "commits": commits(&["a", "b"]) }))
        .route("/api/commits/tag/v2/html?limit=2&offset=0", json!("unused"))
        .route("/api/commits/tag/v2?limit=2&offset=0", commits(&["t1"]));
    let api = GitApi::new(transport);
    let mut engine = engine(2);

    let normal = engine.refresh();
    let tag = engine.enter_tag_mode("v2");

    // The tag page lands first, then the slow normal page.
    drive(&mut engine, &api, tag);
    drive(&mut engine, &api, normal);

    assert_eq!(engine.feed.mode(), &FeedMode::Tag("v2".into()));
    assert_eq!(loaded(&engine), ["t1"]);
}

#[test]
fn search_typed_before_first_page_filters_it_on_arrival() {
    let transport = FakeTransport::default();
    transport.route("/api/all?limit=2", json!({ "commits": commits(&["a", "b"]) }));
    let api = GitApi::new(transport);
    let mut engine = engine(2);

    let requests = engine.refresh();
    assert_eq!(engine.search("b"), 0);
    drive(&mut engine, &api, requests);

    assert_eq!(loaded(&engine), ["a", "b"]);
    let shown: Vec<_> = engine.feed.visible().iter().map(|c| c.hash.clone()).collect();
    assert_eq!(shown, ["b"]);

    assert_eq!(engine.search(""), 2);
    assert_eq!(engine.feed.mode(), &FeedMode::Normal);
    assert_eq!(engine.feed.cursor().offset, 2);
    assert!(!engine.load_more().is_empty(), "paging resumes after the search");
}

#[test]
fn persisted_selection_and_expansion_restore_on_first_page() {
    let transport = FakeTransport::default();
    transport
        .route("/api/all?limit=2", json!({ "commits": commits(&["c1", "c2"]) }))
        .route(
            "/api/commit/c2",
            json!({
                "hash": "c2",
                "message": "change c2",
                "files": [
                    { "path": "src/lib.rs", "status": "modified", "additions": 1, "deletions": 1 },
                    { "path": "README.md", "status": "added", "additions": 3, "deletions": 0 }
                ]
            }),
        )
        .route(
            "/api/diff?hash=c2&file=src/lib.rs",
            json!({
                "path": "src/lib.rs",
                "hunks": [{
                    "header": "@@ -1,1 +1,1 @@",
                    "oldStart": 1, "oldLines": 1, "newStart": 1, "newLines": 1,
                    "lines": [
                        { "type": "deletion", "content": "-old" },
                        { "type": "addition", "content": "+new" }
                    ]
                }]
            }),
        );
    let api = GitApi::new(transport.clone());
    let mut engine = engine(2);
    engine.hydrate(PersistedState {
        selected: Some("c2".into()),
        expansions: Some(r#"[{"scope":"c2","path":"src/lib.rs"}]"#.into()),
    });

    let requests = engine.refresh();
    drive(&mut engine, &api, requests);

    assert_eq!(engine.feed.selection(), &Selection::Commit("c2".into()));
    assert_eq!(engine.details.commit.as_ref().unwrap().files.len(), 2);
    let panels = engine.panels.panels();
    assert!(matches!(panels[0].state(), PanelState::Ready(_)));
    assert_eq!(panels[1].state(), &PanelState::Collapsed);
    assert!(transport.calls().iter().all(|c| !c.contains("README.md")), "collapsed files are not fetched");

    // Restoring is not a change worth writing back.
    let pending = engine.take_pending_writes();
    assert!(pending.is_empty());

    // Collapsing is.
    assert_eq!(engine.collapse_all(), 1);
    let pending = engine.take_pending_writes();
    assert_eq!(pending.expansions.as_deref(), Some("[]"));
}

#[test]
fn expansion_gc_runs_once_enough_history_is_loaded() {
    let transport = FakeTransport::default();
    transport.route("/api/all?limit=2", json!({ "commits": commits(&["c1", "c2"]) }));
    let api = GitApi::new(transport);
    let mut engine =
        Engine::new(&EngineConfig { page_limit: 2, gc_min_loaded: 2, ..EngineConfig::default() });
    engine.hydrate(PersistedState {
        selected: None,
        expansions: Some(
            r#"[{"scope":"c1","path":"a"},{"scope":"gone","path":"b"},{"scope":"uncommitted","path":"w"}]"#
                .into(),
        ),
    });

    let requests = engine.refresh();
    drive(&mut engine, &api, requests);

    assert_eq!(engine.expansions.len(), 2);
    let snapshot = engine.take_pending_writes().expansions.unwrap();
    assert!(!snapshot.contains("gone"));
}

#[test]
fn failed_mutation_reports_server_message_and_keeps_feed() {
    let transport = FakeTransport::default();
    transport
        .route("/api/all?limit=2", json!({ "commits": commits(&["a", "b"]) }))
        .fail(
            "POST /api/branch/checkout",
            409,
            r#"{"error":"Your local changes would be overwritten by checkout"}"#,
        );
    let api = GitApi::new(transport);
    let mut engine = engine(2);
    let requests = engine.refresh();
    drive(&mut engine, &api, requests);
    let generation = engine.feed.generation();

    let requests = engine.run_mutation(Mutation::CheckoutBranch { branch: "dev".into() });
    drive(&mut engine, &api, requests);

    let status = engine.feed.status().unwrap();
    assert_eq!(status.level, StatusLevel::Error);
    assert_eq!(status.text, "Your local changes would be overwritten by checkout");
    assert_eq!(engine.feed.generation(), generation, "no reload after a failure");
    assert_eq!(loaded(&engine), ["a", "b"]);
}

#[test]
fn successful_mutation_reloads_and_keeps_selection() {
    let transport = FakeTransport::default();
    transport
        .route("/api/all?limit=2", json!({ "commits": commits(&["a", "b"]) }))
        .route("/api/commit/b", json!({ "hash": "b", "files": [] }))
        .route("POST /api/stage", json!({ "success": true }));
    let api = GitApi::new(transport.clone());
    let mut engine = engine(2);
    let requests = engine.refresh();
    drive(&mut engine, &api, requests);
    let requests = engine.select_commit("b");
    drive(&mut engine, &api, requests);
    assert_eq!(engine.take_pending_writes().selection, Some(Some("b".into())));

    let requests = engine.run_mutation(Mutation::Stage { path: "src/lib.rs".into() });
    drive(&mut engine, &api, requests);

    assert_eq!(engine.feed.status().unwrap().level, StatusLevel::Success);
    assert_eq!(engine.feed.selection(), &Selection::Commit("b".into()));
    assert!(engine.details.commit.is_some());
    let reloads = transport.calls().iter().filter(|c| *c == "/api/all?limit=2").count();
    assert_eq!(reloads, 2);
}

#[test]
fn pushed_commit_is_counted_once_and_ignored_when_offline() {
    let transport = FakeTransport::default();
    transport
        .route("/api/all?limit=2", json!({ "commits": commits(&["a", "b"]) }))
        .route(
            "/api/ades/dashboard",
            json!({ "analytics": { "totalCommits": 2, "commitTrends": { "labels": ["Mon"], "values": [2] } } }),
        )
        .route("/api/ades/patterns", json!({ "hotspots": [] }));
    let api = GitApi::new(transport);
    let mut engine = engine(2);
    let requests = engine.start();
    drive(&mut engine, &api, requests);

    let frame = r#"{"type":"commit","payload":{"hash":"new1","message":"Add feature"}}"#;
    assert_eq!(engine.apply_push(PushFrame::decode(frame).unwrap()), Reconciled::Ignored);

    engine.reconciler.on_connecting();
    engine.reconciler.on_connected();
    assert_eq!(engine.apply_push(PushFrame::decode(frame).unwrap()), Reconciled::IncomingCommit);
    assert_eq!(engine.apply_push(PushFrame::decode(frame).unwrap()), Reconciled::Notice);

    let analytics = engine.reconciler.board.analytics.as_ref().unwrap();
    assert_eq!(analytics.total_commits, 3);
    assert_eq!(analytics.commit_trends.values, [3]);
    assert_eq!(engine.feed.incoming(), 1);
    assert!(engine.reconciler.board.patterns.is_some());
}
