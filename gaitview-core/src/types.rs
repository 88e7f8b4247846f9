//! Owned data types shared by every engine component.
//!
//! Everything here is produced by the backend (commits, diffs, refs) or by the
//! engine itself (scopes, expansion keys, cursors). All types are fully owned
//! and `Send` so they can cross from the backend worker thread to the UI loop.
//!
//! JSON field names follow the backend's camelCase wire format; aliases cover
//! the older field names some endpoints still emit.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Wire token the backend uses for working-tree changes in place of a hash.
pub const UNCOMMITTED_TOKEN: &str = "uncommitted";

/// Author (or committer) identity attached to a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// A commit as delivered by the backend. Identity is the full hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub hash: String,
    #[serde(default)]
    pub short_hash: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author: Author,
    /// Author date. Absent for commits recovered from pre-rendered markup.
    #[serde(default)]
    pub date: Option<DateTime<FixedOffset>>,
    #[serde(default, alias = "parents")]
    pub parent_hashes: Vec<String>,
    #[serde(default, alias = "fileChanges")]
    pub files: Vec<FileChange>,
}

impl Commit {
    /// Abbreviated hash for display: the backend's short hash, or the first
    /// seven characters of the full hash.
    pub fn short(&self) -> &str {
        if !self.short_hash.is_empty() {
            return &self.short_hash;
        }
        self.hash.get(..7).unwrap_or(&self.hash)
    }

    /// First line of the commit message.
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

/// Change status of a file within a commit or the working tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Untracked,
    Staged,
    Unstaged,
}

impl FileStatus {
    /// Parses either the word form (`"added"`) or git's letter form (`"A"`).
    /// Unknown values degrade to `Modified`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "a" | "added" => Self::Added,
            "d" | "deleted" => Self::Deleted,
            "r" | "renamed" => Self::Renamed,
            "c" | "copied" => Self::Copied,
            "?" | "??" | "untracked" => Self::Untracked,
            "staged" => Self::Staged,
            "unstaged" => Self::Unstaged,
            _ => Self::Modified,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
            Self::Copied => "copied",
            Self::Untracked => "untracked",
            Self::Staged => "staged",
            Self::Unstaged => "unstaged",
        }
    }

    /// Single-character badge used by the file list.
    pub fn badge(self) -> char {
        match self {
            Self::Added => 'A',
            Self::Modified => 'M',
            Self::Deleted => 'D',
            Self::Renamed => 'R',
            Self::Copied => 'C',
            Self::Untracked => '?',
            Self::Staged => 'S',
            Self::Unstaged => 'U',
        }
    }
}

impl From<String> for FileStatus {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<FileStatus> for String {
    fn from(status: FileStatus) -> Self {
        status.as_str().to_owned()
    }
}

/// One changed file with its line-count deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    #[serde(alias = "name")]
    pub path: String,
    pub status: FileStatus,
    #[serde(default)]
    pub additions: u32,
    #[serde(default)]
    pub deletions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
}

/// Kind of a single diff line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffLineKind {
    Context,
    Addition,
    Deletion,
}

impl DiffLineKind {
    /// The unified-diff marker character for this kind.
    pub fn marker(self) -> char {
        match self {
            Self::Context => ' ',
            Self::Addition => '+',
            Self::Deletion => '-',
        }
    }
}

/// A single line inside a hunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    #[serde(rename = "type")]
    pub kind: DiffLineKind,
    #[serde(default)]
    pub content: String,
}

impl DiffLine {
    pub fn new(kind: DiffLineKind, content: impl Into<String>) -> Self {
        Self { kind, content: content.into() }
    }

    /// Line text without the leading diff marker (if the backend sent one)
    /// and without a trailing newline.
    pub fn text(&self) -> &str {
        let content = self.content.trim_end_matches(['\n', '\r']);
        content.strip_prefix(self.kind.marker()).unwrap_or(content)
    }
}

/// One `@@` block of a file diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffHunk {
    #[serde(default)]
    pub header: String,
    pub old_start: u32,
    #[serde(default)]
    pub old_lines: u32,
    pub new_start: u32,
    #[serde(default)]
    pub new_lines: u32,
    #[serde(default)]
    pub lines: Vec<DiffLine>,
}

/// The diff of one file. A diff with no hunks renders as "No changes".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    pub path: String,
    #[serde(default)]
    pub hunks: Vec<DiffHunk>,
}

/// Identifies the owner of a set of file panels.
///
/// A commit viewed from tag mode gets its own scope so expansions opened while
/// browsing a tag do not leak into the normal history view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeId {
    Uncommitted,
    Commit(String),
    Tagged { tag: String, hash: String },
}

impl ScopeId {
    /// The commit hash backing this scope, `None` for working-tree changes.
    pub fn commit_hash(&self) -> Option<&str> {
        match self {
            Self::Uncommitted => None,
            Self::Commit(hash) | Self::Tagged { hash, .. } => Some(hash),
        }
    }

    /// Value passed as `hash=` when fetching a diff for this scope.
    pub fn fetch_key(&self) -> &str {
        self.commit_hash().unwrap_or(UNCOMMITTED_TOKEN)
    }

    /// Parses the string form produced by `Display`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw == UNCOMMITTED_TOKEN {
            return Some(Self::Uncommitted);
        }
        if let Some(rest) = raw.strip_prefix("tag:") {
            // Ref names never contain ':', hashes never do either.
            let (tag, hash) = rest.rsplit_once(':')?;
            if tag.is_empty() || hash.is_empty() {
                return None;
            }
            return Some(Self::Tagged { tag: tag.to_owned(), hash: hash.to_owned() });
        }
        if raw.is_empty() || raw.contains(':') {
            return None;
        }
        Some(Self::Commit(raw.to_owned()))
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uncommitted => f.write_str(UNCOMMITTED_TOKEN),
            Self::Commit(hash) => f.write_str(hash),
            Self::Tagged { tag, hash } => write!(f, "tag:{tag}:{hash}"),
        }
    }
}

impl Serialize for ScopeId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ScopeId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid scope id {raw:?}")))
    }
}

/// Identity of one file panel: which scope, which file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExpansionKey {
    pub scope: ScopeId,
    pub path: String,
}

impl ExpansionKey {
    pub fn new(scope: ScopeId, path: impl Into<String>) -> Self {
        Self { scope, path: path.into() }
    }
}

/// Browse mode of the commit feed. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FeedMode {
    #[default]
    Normal,
    Tag(String),
    Search(String),
}

impl FeedMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Normal => "history",
            Self::Tag(_) => "tag",
            Self::Search(_) => "search",
        }
    }
}

/// Pagination position of the commit feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedCursor {
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
    pub mode: FeedMode,
}

impl FeedCursor {
    pub fn new(limit: usize, mode: FeedMode) -> Self {
        Self { offset: 0, limit, has_more: true, mode }
    }
}

/// What the details panel is currently showing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Uncommitted,
    Commit(String),
}

impl Selection {
    pub fn hash(&self) -> Option<&str> {
        match self {
            Self::Commit(hash) => Some(hash),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub is_remote: bool,
    #[serde(default)]
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stash {
    pub index: u32,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub branch: String,
}

/// Branches, tags and stashes shown in the sidebar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefLists {
    pub branches: Vec<Branch>,
    pub tags: Vec<Tag>,
    pub stashes: Vec<Stash>,
}

impl RefLists {
    pub fn current_branch(&self) -> Option<&Branch> {
        self.branches.iter().find(|b| b.is_current)
    }
}

/// Payload of the batched `/api/all` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySnapshot {
    #[serde(default)]
    pub commits: Vec<Commit>,
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub stashes: Vec<Stash>,
    #[serde(default)]
    pub uncommitted_changes: Vec<FileChange>,
    #[serde(default)]
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_id_string_form_round_trips() {
        for scope in [
            ScopeId::Uncommitted,
            ScopeId::Commit("abc123".into()),
            ScopeId::Tagged { tag: "v1.0".into(), hash: "abc123".into() },
        ] {
            assert_eq!(ScopeId::parse(&scope.to_string()), Some(scope));
        }
        assert_eq!(ScopeId::parse(""), None);
        assert_eq!(ScopeId::parse("tag:missing-hash"), None);
    }

    #[test]
    fn uncommitted_scope_fetches_with_token() {
        assert_eq!(ScopeId::Uncommitted.fetch_key(), UNCOMMITTED_TOKEN);
        assert_eq!(ScopeId::Commit("deadbeef".into()).fetch_key(), "deadbeef");
    }

    #[test]
    fn file_status_accepts_letters_and_words() {
        assert_eq!(FileStatus::parse("A"), FileStatus::Added);
        assert_eq!(FileStatus::parse("deleted"), FileStatus::Deleted);
        assert_eq!(FileStatus::parse("??"), FileStatus::Untracked);
        assert_eq!(FileStatus::parse("weird"), FileStatus::Modified);
    }

    #[test]
    fn commit_decodes_backend_json() {
        let raw = r#"{
            "hash": "0123456789abcdef",
            "message": "Fix parser\n\nlong body",
            "author": {"name": "Dana", "email": "dana@example.com"},
            "date": "2024-03-01T10:20:30Z",
            "parents": ["aaa"],
            "fileChanges": [{"path": "src/lib.rs", "status": "M", "additions": 3, "deletions": 1}]
        }"#;
        let commit: Commit = serde_json::from_str(raw).unwrap();
        assert_eq!(commit.short(), "0123456");
        assert_eq!(commit.subject(), "Fix parser");
        assert_eq!(commit.parent_hashes, vec!["aaa".to_string()]);
        assert_eq!(commit.files[0].status, FileStatus::Modified);
        assert!(commit.date.is_some());
    }

    #[test]
    fn diff_line_text_strips_matching_marker_only() {
        assert_eq!(DiffLine::new(DiffLineKind::Addition, "+let x = 1;\n").text(), "let x = 1;");
        assert_eq!(DiffLine::new(DiffLineKind::Context, " a").text(), "a");
        assert_eq!(DiffLine::new(DiffLineKind::Deletion, "b").text(), "b");
    }
}
