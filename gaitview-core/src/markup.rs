//! Recovery of commit records from the backend's server-rendered commit pages.
//!
//! The `/html` variants of the commit listings return `<li class="commit-item">`
//! fragments instead of JSON. They are cheaper for the server to produce for
//! deep pages, so the feed prefers them for `load_more` and falls back to JSON.
//! Only the fields the markup carries survive: hash, message subject, author
//! name and a minute-resolution date.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::types::{Author, Commit, UNCOMMITTED_TOKEN};

static ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<li class="commit-item"[^>]*?data-hash="([^"]+)"[^>]*>(.*?)</li>"#)
        .expect("commit item pattern is valid")
});
static MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="commit-message">(.*?)</div>"#).expect("message pattern is valid")
});
static AUTHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="commit-author">(.*?)</span>"#).expect("author pattern is valid")
});
static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"class="commit-date">([^<]*)</span>"#).expect("date pattern is valid")
});

/// Commits recovered from one rendered page.
#[derive(Debug, Default)]
pub struct MarkupPage {
    pub commits: Vec<Commit>,
    /// The page ended with the "all commits loaded" marker.
    pub end_of_history: bool,
}

/// Parses a rendered commit page. Entries without a hash, and the pinned
/// working-tree entry, are skipped.
pub fn parse_commit_page(html: &str) -> MarkupPage {
    let commits = ITEM
        .captures_iter(html)
        .map(|caps| {
            let hash = caps[1].trim().to_owned();
            let body = &caps[2];
            let message = capture(&MESSAGE, body).map(unescape).unwrap_or_default();
            let name = capture(&AUTHOR, body).map(unescape).unwrap_or_default();
            let date = capture(&DATE, body).and_then(parse_date);
            Commit {
                hash,
                short_hash: String::new(),
                message,
                author: Author { name, email: String::new() },
                date,
                parent_hashes: Vec::new(),
                files: Vec::new(),
            }
        })
        .filter(|c| !c.hash.is_empty() && c.hash != UNCOMMITTED_TOKEN)
        .collect();

    MarkupPage { commits, end_of_history: html.contains("class=\"end-indicator\"") }
}

fn capture<'a>(re: &Regex, body: &'a str) -> Option<&'a str> {
    re.captures(body).and_then(|c| c.get(1)).map(|m| m.as_str().trim())
}

fn parse_date(raw: &str) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Reverses HTML entity escaping. The backend escapes text twice (once in the
/// template helper, once by the template engine), so up to two levels are undone.
fn unescape(raw: &str) -> String {
    let mut current = raw.to_owned();
    for _ in 0..2 {
        if !current.contains('&') {
            break;
        }
        current = current
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#34;", "\"")
            .replace("&#39;", "'")
            .replace("&#x27;", "'")
            .replace("&amp;", "&");
    }
    current
}
