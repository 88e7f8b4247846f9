//! Pure conversion of a [`FileDiff`] into renderable rows.
//!
//! Two layouts are supported:
//!
//! - **Split**: old file on the left, new file on the right. Deletions leave a
//!   filler row on the right, additions leave one on the left, so both columns
//!   always have the same length and rows line up horizontally.
//! - **Unified**: one column, a header row per hunk followed by one row per
//!   line carrying the old and/or new line number.
//!
//! Line counters are seeded from each hunk's `old_start` / `new_start` and only
//! advance on rows that show a real line; filler rows never consume a number.
//! A diff without hunks renders as a single "No changes" row.

use crate::types::{DiffLineKind, FileDiff};

/// Text shown when a diff has no hunks.
pub const NO_CHANGES: &str = "No changes";

/// Which layout a diff panel renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffLayout {
    #[default]
    Split,
    Unified,
}

impl DiffLayout {
    pub fn toggled(self) -> Self {
        match self {
            Self::Split => Self::Unified,
            Self::Unified => Self::Split,
        }
    }
}

/// Visual role of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Context,
    Addition,
    Deletion,
    /// Blank placeholder keeping split columns aligned.
    Filler,
    HunkHeader,
    /// The "No changes" placeholder.
    Empty,
}

impl From<DiffLineKind> for RowKind {
    fn from(kind: DiffLineKind) -> Self {
        match kind {
            DiffLineKind::Context => Self::Context,
            DiffLineKind::Addition => Self::Addition,
            DiffLineKind::Deletion => Self::Deletion,
        }
    }
}

/// One row of one split-view column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitRow {
    pub kind: RowKind,
    pub line_no: Option<u32>,
    pub text: String,
}

impl SplitRow {
    fn filler() -> Self {
        Self { kind: RowKind::Filler, line_no: None, text: String::new() }
    }

    fn empty() -> Self {
        Self { kind: RowKind::Empty, line_no: None, text: NO_CHANGES.to_owned() }
    }
}

/// Both columns of a split view. `left.len() == right.len()` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SplitView {
    pub left: Vec<SplitRow>,
    pub right: Vec<SplitRow>,
}

impl SplitView {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// One row of the unified view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnifiedRow {
    pub kind: RowKind,
    pub old_no: Option<u32>,
    pub new_no: Option<u32>,
    pub text: String,
}

/// Either layout, as produced for a diff panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedDiff {
    Split(SplitView),
    Unified(Vec<UnifiedRow>),
}

impl RenderedDiff {
    pub fn row_count(&self) -> usize {
        match self {
            Self::Split(view) => view.len(),
            Self::Unified(rows) => rows.len(),
        }
    }
}

/// Renders `diff` in the requested layout.
pub fn render(diff: &FileDiff, layout: DiffLayout) -> RenderedDiff {
    match layout {
        DiffLayout::Split => RenderedDiff::Split(to_split_view(diff)),
        DiffLayout::Unified => RenderedDiff::Unified(to_unified_view(diff)),
    }
}

/// Builds the side-by-side layout.
pub fn to_split_view(diff: &FileDiff) -> SplitView {
    if diff.hunks.is_empty() {
        return SplitView { left: vec![SplitRow::empty()], right: vec![SplitRow::empty()] };
    }

    let mut view = SplitView::default();
    for hunk in &diff.hunks {
        let mut old_no = hunk.old_start.max(1);
        let mut new_no = hunk.new_start.max(1);
        for line in &hunk.lines {
            let text = line.text().to_owned();
            match line.kind {
                DiffLineKind::Context => {
                    view.left.push(SplitRow {
                        kind: RowKind::Context,
                        line_no: Some(old_no),
                        text: text.clone(),
                    });
                    view.right.push(SplitRow {
                        kind: RowKind::Context,
                        line_no: Some(new_no),
                        text,
                    });
                    old_no = old_no.saturating_add(1);
                    new_no = new_no.saturating_add(1);
                }
                DiffLineKind::Deletion => {
                    view.left.push(SplitRow {
                        kind: RowKind::Deletion,
                        line_no: Some(old_no),
                        text,
                    });
                    view.right.push(SplitRow::filler());
                    old_no = old_no.saturating_add(1);
                }
                DiffLineKind::Addition => {
                    view.left.push(SplitRow::filler());
                    view.right.push(SplitRow {
                        kind: RowKind::Addition,
                        line_no: Some(new_no),
                        text,
                    });
                    new_no = new_no.saturating_add(1);
                }
            }
        }
    }
    view
}

/// Builds the single-column layout.
pub fn to_unified_view(diff: &FileDiff) -> Vec<UnifiedRow> {
    if diff.hunks.is_empty() {
        return vec![UnifiedRow {
            kind: RowKind::Empty,
            old_no: None,
            new_no: None,
            text: NO_CHANGES.to_owned(),
        }];
    }

    let mut rows = Vec::new();
    for hunk in &diff.hunks {
        rows.push(UnifiedRow {
            kind: RowKind::HunkHeader,
            old_no: None,
            new_no: None,
            text: hunk.header.clone(),
        });
        let mut old_no = hunk.old_start.max(1);
        let mut new_no = hunk.new_start.max(1);
        for line in &hunk.lines {
            let (old, new) = match line.kind {
                DiffLineKind::Context => {
                    let numbers = (Some(old_no), Some(new_no));
                    old_no = old_no.saturating_add(1);
                    new_no = new_no.saturating_add(1);
                    numbers
                }
                DiffLineKind::Deletion => {
                    let numbers = (Some(old_no), None);
                    old_no = old_no.saturating_add(1);
                    numbers
                }
                DiffLineKind::Addition => {
                    let numbers = (None, Some(new_no));
                    new_no = new_no.saturating_add(1);
                    numbers
                }
            };
            rows.push(UnifiedRow {
                kind: line.kind.into(),
                old_no: old,
                new_no: new,
                text: line.text().to_owned(),
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiffHunk, DiffLine};

    fn sample() -> FileDiff {
        FileDiff {
            path: "src/lib.rs".into(),
            hunks: vec![DiffHunk {
                header: "@@ -1,3 +1,4 @@".into(),
                old_start: 1,
                old_lines: 3,
                new_start: 1,
                new_lines: 4,
                lines: vec![
                    DiffLine::new(DiffLineKind::Context, "a"),
                    DiffLine::new(DiffLineKind::Deletion, "b"),
                    DiffLine::new(DiffLineKind::Addition, "c"),
                    DiffLine::new(DiffLineKind::Addition, "d"),
                    DiffLine::new(DiffLineKind::Context, "e"),
                ],
            }],
        }
    }

    fn numbers(rows: &[SplitRow]) -> Vec<Option<u32>> {
        rows.iter().map(|r| r.line_no).collect()
    }

    #[test]
    fn split_view_pads_with_fillers() {
        let view = to_split_view(&sample());
        assert_eq!(view.left.len(), 5);
        assert_eq!(view.right.len(), 5);

        let left: Vec<_> = view.left.iter().map(|r| r.text.as_str()).collect();
        let right: Vec<_> = view.right.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(left, ["a", "b", "", "", "e"]);
        assert_eq!(right, ["a", "", "c", "d", "e"]);

        assert_eq!(numbers(&view.left), [Some(1), Some(2), None, None, Some(3)]);
        assert_eq!(numbers(&view.right), [Some(1), None, Some(2), Some(3), Some(4)]);
        assert_eq!(view.left[2].kind, RowKind::Filler);
        assert_eq!(view.right[1].kind, RowKind::Filler);
    }

    #[test]
    fn unified_view_has_header_then_numbered_lines() {
        let rows = to_unified_view(&sample());
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].kind, RowKind::HunkHeader);
        assert_eq!(rows[0].text, "@@ -1,3 +1,4 @@");

        let nums: Vec<_> = rows[1..].iter().map(|r| (r.old_no, r.new_no)).collect();
        assert_eq!(
            nums,
            [
                (Some(1), Some(1)),
                (Some(2), None),
                (None, Some(2)),
                (None, Some(3)),
                (Some(3), Some(4)),
            ]
        );
    }

    #[test]
    fn empty_diff_renders_no_changes() {
        let diff = FileDiff { path: "x".into(), hunks: Vec::new() };
        let split = to_split_view(&diff);
        assert_eq!(split.len(), 1);
        assert_eq!(split.left[0].text, NO_CHANGES);
        assert_eq!(split.right[0].text, NO_CHANGES);

        let unified = to_unified_view(&diff);
        assert_eq!(unified.len(), 1);
        assert_eq!(unified[0].kind, RowKind::Empty);
    }

    #[test]
    fn counters_restart_at_each_hunk_start() {
        let mut diff = sample();
        diff.hunks.push(DiffHunk {
            header: "@@ -40,2 +41,2 @@".into(),
            old_start: 40,
            old_lines: 2,
            new_start: 41,
            new_lines: 2,
            lines: vec![
                DiffLine::new(DiffLineKind::Deletion, "-x"),
                DiffLine::new(DiffLineKind::Addition, "+y"),
            ],
        });
        let view = to_split_view(&diff);
        assert_eq!(view.left.len(), view.right.len());
        assert_eq!(view.left[5].line_no, Some(40));
        assert_eq!(view.left[5].text, "x");
        assert_eq!(view.right[6].line_no, Some(41));

        let unified = to_unified_view(&diff);
        let headers = unified.iter().filter(|r| r.kind == RowKind::HunkHeader).count();
        assert_eq!(headers, 2, "one header row per hunk");
    }

    #[test]
    fn hunk_header_is_kept_verbatim() {
        let mut diff = sample();
        diff.hunks[0].header = "@@ -1,3 +1,4 @@ fn main() {  ".into();
        let unified = to_unified_view(&diff);
        assert_eq!(unified[0].kind, RowKind::HunkHeader);
        assert_eq!(unified[0].text, "@@ -1,3 +1,4 @@ fn main() {  ");
    }

    #[test]
    fn counters_saturate_at_the_top_of_the_range() {
        let mut diff = sample();
        diff.hunks[0].old_start = u32::MAX;
        diff.hunks[0].new_start = u32::MAX - 1;
        let view = to_split_view(&diff);
        assert_eq!(view.left.last().and_then(|r| r.line_no), Some(u32::MAX));
        assert_eq!(view.right.last().and_then(|r| r.line_no), Some(u32::MAX));

        let unified = to_unified_view(&diff);
        assert!(unified.iter().filter_map(|r| r.old_no).all(|n| n == u32::MAX));
    }
}
