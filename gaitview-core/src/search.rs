//! Client-side filtering of the loaded commit window.
//!
//! Search never hits the backend: it only sees commits that have already been
//! paged in. Text filters are OR'd together; the date range, when enabled, is
//! AND'd on top.

use chrono::{NaiveDate, NaiveTime};

use crate::error::DateRangeError;
use crate::types::Commit;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive calendar-date bounds. `to` covers the whole of its day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Reads `from..to`, where either bound may be left out. A single date
    /// is a one-day range. Empty input means no date filter.
    pub fn parse(input: &str) -> Result<Option<Self>, DateRangeError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }
        let bound = |text: &str| -> Result<Option<NaiveDate>, DateRangeError> {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map(Some)
                .map_err(|_| DateRangeError::BadDate(text.to_owned()))
        };
        let range = match input.split_once("..") {
            Some((from, to)) => Self { from: bound(from)?, to: bound(to)? },
            None => {
                let day = bound(input)?;
                Self { from: day, to: day }
            }
        };
        if let (Some(from), Some(to)) = (range.from, range.to) {
            if to < from {
                return Err(DateRangeError::Reversed);
            }
        }
        Ok(Some(range))
    }

    fn contains(&self, commit: &Commit) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        let Some(date) = commit.date else {
            return false;
        };
        let naive = date.naive_local();
        if let Some(from) = self.from {
            if naive < from.and_time(NaiveTime::MIN) {
                return false;
            }
        }
        if let Some(to) = self.to {
            // Anything before the start of the following day is in range.
            if let Some(next) = to.succ_opt() {
                if naive >= next.and_time(NaiveTime::MIN) {
                    return false;
                }
            }
        }
        true
    }
}

/// Which commit fields the query is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchFilters {
    pub message: bool,
    pub author: bool,
    pub hash: bool,
    pub files: bool,
    /// `Some` enables the date filter.
    pub date: Option<DateRange>,
}

impl Default for SearchFilters {
    fn default() -> Self {
        Self { message: true, author: true, hash: true, files: false, date: None }
    }
}

impl SearchFilters {
    /// True when `commit` matches the already-lowercased `needle`.
    pub fn matches(&self, commit: &Commit, needle: &str) -> bool {
        let text_match = (self.message && commit.message.to_lowercase().contains(needle))
            || (self.author
                && (commit.author.name.to_lowercase().contains(needle)
                    || commit.author.email.to_lowercase().contains(needle)))
            || (self.hash && commit.hash.to_lowercase().contains(needle))
            || (self.files
                && commit.files.iter().any(|f| f.path.to_lowercase().contains(needle)));

        text_match && self.date.is_none_or(|range| range.contains(commit))
    }
}

/// Indices into `commits` of every match for `query`, in list order.
pub fn filter_window(commits: &[Commit], query: &str, filters: &SearchFilters) -> Vec<usize> {
    let needle = query.trim().to_lowercase();
    commits
        .iter()
        .enumerate()
        .filter(|(_, c)| filters.matches(c, &needle))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Author, FileChange, FileStatus};
    use chrono::DateTime;

    fn commit(hash: &str, message: &str, author: &str, date: &str) -> Commit {
        Commit {
            hash: hash.into(),
            short_hash: String::new(),
            message: message.into(),
            author: Author { name: author.into(), email: format!("{author}@example.com") },
            date: DateTime::parse_from_rfc3339(date).ok(),
            parent_hashes: Vec::new(),
            files: vec![FileChange {
                path: format!("src/{hash}.rs"),
                status: FileStatus::Modified,
                additions: 1,
                deletions: 0,
                old_path: None,
            }],
        }
    }

    #[test]
    fn date_range_parses_open_and_closed_bounds() {
        let day = |s: &str| NaiveDate::parse_from_str(s, DATE_FORMAT).ok();
        assert_eq!(DateRange::parse("  "), Ok(None));
        assert_eq!(
            DateRange::parse("2024-01-10..2024-01-11"),
            Ok(Some(DateRange { from: day("2024-01-10"), to: day("2024-01-11") }))
        );
        assert_eq!(
            DateRange::parse("2024-01-10.."),
            Ok(Some(DateRange { from: day("2024-01-10"), to: None }))
        );
        assert_eq!(
            DateRange::parse("2024-01-12"),
            Ok(Some(DateRange { from: day("2024-01-12"), to: day("2024-01-12") }))
        );
        assert_eq!(
            DateRange::parse("2024-13-01.."),
            Err(DateRangeError::BadDate("2024-13-01".into()))
        );
        assert_eq!(DateRange::parse("2024-02-01..2024-01-01"), Err(DateRangeError::Reversed));
    }

    #[test]
    fn matches_are_case_insensitive_and_or_across_fields() {
        let commits = vec![
            commit("aa11", "Fix Parser", "dana", "2024-01-10T12:00:00Z"),
            commit("bb22", "Docs", "fixer", "2024-01-11T12:00:00Z"),
            commit("cc33", "Refactor", "sam", "2024-01-12T12:00:00Z"),
        ];
        let hits = filter_window(&commits, "FIX", &SearchFilters::default());
        assert_eq!(hits, [0, 1]);
    }

    #[test]
    fn file_filter_is_opt_in() {
        let commits = vec![commit("aa11", "x", "dana", "2024-01-10T12:00:00Z")];
        assert!(filter_window(&commits, "src/aa11", &SearchFilters::default()).is_empty());
        let filters = SearchFilters { files: true, ..SearchFilters::default() };
        assert_eq!(filter_window(&commits, "src/aa11", &filters), [0]);
    }

    #[test]
    fn date_range_is_inclusive_through_end_of_day() {
        let commits = vec![
            commit("a", "fix", "x", "2024-01-09T23:59:00Z"),
            commit("b", "fix", "x", "2024-01-10T00:00:00Z"),
            commit("c", "fix", "x", "2024-01-11T23:59:59Z"),
            commit("d", "fix", "x", "2024-01-12T00:00:00Z"),
        ];
        let filters = SearchFilters {
            date: Some(DateRange {
                from: NaiveDate::from_ymd_opt(2024, 1, 10),
                to: NaiveDate::from_ymd_opt(2024, 1, 11),
            }),
            ..SearchFilters::default()
        };
        assert_eq!(filter_window(&commits, "fix", &filters), [1, 2]);
    }

    #[test]
    fn no_enabled_text_filter_matches_nothing() {
        let commits = vec![commit("a", "fix", "x", "2024-01-09T12:00:00Z")];
        let filters =
            SearchFilters { message: false, author: false, hash: false, files: false, date: None };
        assert!(filter_window(&commits, "fix", &filters).is_empty());
    }
}
