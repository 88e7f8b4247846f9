//! Typed client for the gait backend's REST surface.
//!
//! The HTTP details live behind the [`Transport`] trait so the engine and the
//! fetch plans can be exercised against canned responses. [`HttpTransport`] is
//! the real implementation, a blocking `ureq` agent meant to run on the
//! backend worker thread, never on the UI loop.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::error::BackendError;
use crate::events::DashboardSnapshot;
use crate::markup;
use crate::types::{Branch, Commit, FileChange, FileDiff, RepositorySnapshot, ScopeId, Stash, Tag};

/// A backend path plus query parameters, independent of the server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl Endpoint {
    /// `/api/<segments...>`. Segments are percent-encoded individually, so a
    /// tag such as `release/1.0` stays a single segment.
    pub fn api<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all = vec!["api".to_owned()];
        all.extend(segments.into_iter().map(Into::into));
        Self { segments: all, query: Vec::new() }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    /// Human-readable path used in logs and error messages.
    pub fn path(&self) -> String {
        let mut out = format!("/{}", self.segments.join("/"));
        for (i, (k, v)) in self.query.iter().enumerate() {
            out.push(if i == 0 { '?' } else { '&' });
            out.push_str(k);
            out.push('=');
            out.push_str(v);
        }
        out
    }

    /// Joins this endpoint onto the server base address.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Transport` if `base` cannot carry a path
    /// (e.g. a `mailto:` URL).
    pub fn resolve(&self, base: &Url) -> Result<Url, BackendError> {
        let mut url = base.clone();
        url.set_query(None);
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                BackendError::Transport(format!("{base} cannot be used as a backend address"))
            })?;
            path.pop_if_empty();
            path.extend(&self.segments);
        }
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}

/// HTTP verbs used by mutations. Reads are always GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    Delete,
}

/// Raw request/response exchange with the backend.
pub trait Transport: Send {
    /// GET `endpoint`, returning the response body.
    fn get(&self, endpoint: &Endpoint) -> Result<String, BackendError>;

    /// Send a JSON body with `method`, returning the response body.
    fn send(&self, method: Method, endpoint: &Endpoint, body: &Value)
        -> Result<String, BackendError>;
}

/// Blocking HTTP transport over a shared `ureq` agent.
pub struct HttpTransport {
    base: Url,
    agent: ureq::Agent,
}

impl HttpTransport {
    /// Creates a transport for the server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Url` if `base_url` is not an absolute URL.
    pub fn new(base_url: &str, read_timeout: Duration) -> Result<Self, BackendError> {
        let base = Url::parse(base_url)?;
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(read_timeout)
            .build();
        Ok(Self { base, agent })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

impl Transport for HttpTransport {
    fn get(&self, endpoint: &Endpoint) -> Result<String, BackendError> {
        let url = endpoint.resolve(&self.base)?;
        tracing::debug!(path = %endpoint.path(), "GET");
        let response = self.agent.get(url.as_str()).call().map_err(from_ureq)?;
        response
            .into_string()
            .map_err(|e| BackendError::Transport(e.to_string()))
    }

    fn send(
        &self,
        method: Method,
        endpoint: &Endpoint,
        body: &Value,
    ) -> Result<String, BackendError> {
        let url = endpoint.resolve(&self.base)?;
        tracing::debug!(path = %endpoint.path(), ?method, "send");
        let request = match method {
            Method::Post => self.agent.post(url.as_str()),
            Method::Delete => self.agent.delete(url.as_str()),
        };
        let result = if body.is_null() { request.call() } else { request.send_json(body) };
        result
            .map_err(from_ureq)?
            .into_string()
            .map_err(|e| BackendError::Transport(e.to_string()))
    }
}

fn from_ureq(err: ureq::Error) -> BackendError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            BackendError::Server { status, message: server_message(status, &body) }
        }
        ureq::Error::Transport(transport) => BackendError::Transport(transport.to_string()),
    }
}

/// Extracts the user-facing message from an error response body.
///
/// The backend answers failures with `{"error": "..."}`; anything else is
/// passed through trimmed, and an empty body becomes `HTTP <status>`.
pub fn server_message(status: u16, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.error;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        trimmed.to_owned()
    }
}

/// A state-changing git operation. Every success invalidates the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CheckoutBranch { branch: String },
    CreateBranch { name: String, start_point: Option<String> },
    DeleteBranch { name: String, force: bool },
    MergeBranch { name: String, no_fast_forward: bool },
    CreateCommit { message: String, amend: bool, signoff: bool },
    Stage { path: String },
    Unstage { path: String },
    CreateStash { message: String, include_untracked: bool },
    ApplyStash { index: u32 },
    PopStash { index: u32 },
    DropStash { index: u32 },
    CreateTag { name: String, commit: Option<String>, message: Option<String> },
    DeleteTag { name: String },
}

impl Mutation {
    /// Short description for status messages.
    pub fn label(&self) -> String {
        match self {
            Self::CheckoutBranch { branch } => format!("checkout {branch}"),
            Self::CreateBranch { name, .. } => format!("create branch {name}"),
            Self::DeleteBranch { name, .. } => format!("delete branch {name}"),
            Self::MergeBranch { name, .. } => format!("merge {name}"),
            Self::CreateCommit { amend: true, .. } => "amend commit".to_owned(),
            Self::CreateCommit { .. } => "commit".to_owned(),
            Self::Stage { path } => format!("stage {path}"),
            Self::Unstage { path } => format!("unstage {path}"),
            Self::CreateStash { .. } => "stash changes".to_owned(),
            Self::ApplyStash { index } => format!("apply stash@{{{index}}}"),
            Self::PopStash { index } => format!("pop stash@{{{index}}}"),
            Self::DropStash { index } => format!("drop stash@{{{index}}}"),
            Self::CreateTag { name, .. } => format!("create tag {name}"),
            Self::DeleteTag { name } => format!("delete tag {name}"),
        }
    }

    /// The HTTP request implementing this mutation.
    pub fn request(&self) -> (Method, Endpoint, Value) {
        match self {
            Self::CheckoutBranch { branch } => (
                Method::Post,
                Endpoint::api(["branch", "checkout"]),
                json!({ "branch": branch }),
            ),
            Self::CreateBranch { name, start_point } => (
                Method::Post,
                Endpoint::api(["branch", "create"]),
                json!({ "branchName": name, "startPoint": start_point.clone().unwrap_or_default() }),
            ),
            Self::DeleteBranch { name, force } => (
                Method::Post,
                Endpoint::api(["branch", "delete"]),
                json!({ "branchName": name, "force": force }),
            ),
            Self::MergeBranch { name, no_fast_forward } => (
                Method::Post,
                Endpoint::api(["branch", "merge"]),
                json!({ "branchName": name, "noFastForward": no_fast_forward }),
            ),
            Self::CreateCommit { message, amend, signoff } => (
                Method::Post,
                Endpoint::api(["commit", "create"]),
                json!({ "message": message, "amend": amend, "signoff": signoff }),
            ),
            Self::Stage { path } => {
                (Method::Post, Endpoint::api(["stage"]), json!({ "filePath": path }))
            }
            Self::Unstage { path } => {
                (Method::Post, Endpoint::api(["unstage"]), json!({ "filePath": path }))
            }
            Self::CreateStash { message, include_untracked } => (
                Method::Post,
                Endpoint::api(["stash", "create"]),
                json!({ "message": message, "includeUntracked": include_untracked }),
            ),
            Self::ApplyStash { index } => {
                (Method::Post, Endpoint::api(["stash", "apply"]), json!({ "index": index }))
            }
            Self::PopStash { index } => {
                (Method::Post, Endpoint::api(["stash", "pop"]), json!({ "index": index }))
            }
            Self::DropStash { index } => {
                (Method::Post, Endpoint::api(["stash", "drop"]), json!({ "index": index }))
            }
            Self::CreateTag { name, commit, message } => (
                Method::Post,
                Endpoint::api(["tag", "create"]),
                json!({
                    "tagName": name,
                    "commitHash": commit.clone().unwrap_or_default(),
                    "message": message.clone().unwrap_or_default(),
                    "annotated": message.is_some(),
                }),
            ),
            Self::DeleteTag { name } => {
                (Method::Delete, Endpoint::api(["tag", name.as_str()]), Value::Null)
            }
        }
    }
}

/// Typed operations over a [`Transport`].
pub struct GitApi<T> {
    transport: T,
}

impl<T: Transport> GitApi<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    fn get_json<R: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<R, BackendError> {
        let body = self.transport.get(&endpoint)?;
        serde_json::from_str(&body)
            .map_err(|source| BackendError::Decode { endpoint: endpoint.path(), source })
    }

    /// Batched first page plus refs and working-tree changes.
    pub fn snapshot(&self, limit: usize) -> Result<RepositorySnapshot, BackendError> {
        self.get_json(Endpoint::api(["all"]).param("limit", limit))
    }

    pub fn commits(&self, limit: usize, offset: usize) -> Result<Vec<Commit>, BackendError> {
        self.get_json(commits_endpoint(None, false, limit, offset))
    }

    pub fn tag_commits(
        &self,
        tag: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Commit>, BackendError> {
        self.get_json(commits_endpoint(Some(tag), false, limit, offset))
    }

    /// Fetches a server-rendered commit page and recovers the commit records
    /// from it. `tag` selects the tag-scoped listing.
    ///
    /// A page shorter than `limit` must carry the end-of-history marker;
    /// otherwise some entries failed to parse and the page is rejected.
    pub fn commits_markup(
        &self,
        tag: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Commit>, BackendError> {
        let endpoint = commits_endpoint(tag, true, limit, offset);
        let body = self.transport.get(&endpoint)?;
        let page = markup::parse_commit_page(&body);
        if page.commits.len() < limit && !page.end_of_history {
            return Err(BackendError::Markup {
                endpoint: endpoint.path(),
                recovered: page.commits.len(),
            });
        }
        Ok(page.commits)
    }

    /// Full commit record including its file list.
    pub fn commit(&self, hash: &str) -> Result<Commit, BackendError> {
        self.get_json(Endpoint::api(["commit", hash]))
    }

    pub fn diff(&self, scope: &ScopeId, path: &str) -> Result<FileDiff, BackendError> {
        self.get_json(
            Endpoint::api(["diff"])
                .param("hash", scope.fetch_key())
                .param("file", path),
        )
    }

    pub fn uncommitted(&self) -> Result<Vec<FileChange>, BackendError> {
        self.get_json(Endpoint::api(["uncommitted"]))
    }

    pub fn branches(&self) -> Result<Vec<Branch>, BackendError> {
        self.get_json(Endpoint::api(["branches"]))
    }

    pub fn tags(&self) -> Result<Vec<Tag>, BackendError> {
        self.get_json(Endpoint::api(["tags"]))
    }

    pub fn stashes(&self) -> Result<Vec<Stash>, BackendError> {
        self.get_json(Endpoint::api(["stashes"]))
    }

    pub fn dashboard(&self) -> Result<DashboardSnapshot, BackendError> {
        self.get_json(Endpoint::api(["ades", "dashboard"]))
    }

    pub fn patterns(&self) -> Result<Value, BackendError> {
        self.get_json(Endpoint::api(["ades", "patterns"]))
    }

    /// Runs a mutation. The response body is not interpreted beyond success.
    pub fn mutate(&self, mutation: &Mutation) -> Result<(), BackendError> {
        let (method, endpoint, body) = mutation.request();
        self.transport.send(method, &endpoint, &body)?;
        Ok(())
    }
}

fn commits_endpoint(tag: Option<&str>, markup: bool, limit: usize, offset: usize) -> Endpoint {
    let mut segments = vec!["commits".to_owned()];
    if let Some(tag) = tag {
        segments.push("tag".to_owned());
        segments.push(tag.to_owned());
    }
    if markup {
        segments.push("html".to_owned());
    }
    Endpoint::api(segments).param("limit", limit).param("offset", offset)
}
