//! Details panel: the selected commit's header followed by one collapsible
//! panel per changed file.
//!
//! Expanded panels are laid out by the core diff layout (split or unified),
//! then syntax-highlighted with syntect. In the unified layout a deletion
//! directly followed by an addition gets word-level emphasis from `similar`.
//! Highlighted bodies are cached per panel and only the visible window of
//! rows is materialized each frame.

use std::collections::HashMap;
use std::sync::LazyLock;

use gaitview_core::layout::{DiffLayout, RenderedDiff, RowKind, SplitRow, UnifiedRow};
use gaitview_core::panel::{DiffPanelController, PanelState};
use gaitview_core::types::{ExpansionKey, FileStatus, ScopeId, Selection};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
};
use similar::{ChangeTag, TextDiff};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme as SyntaxTheme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

static PS: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static TS: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const GUTTER: usize = 5;

// ---------------------------------------------------------------------------
// Body cache
// ---------------------------------------------------------------------------

struct CachedBody {
    layout: DiffLayout,
    width: u16,
    lines: Vec<Line<'static>>,
}

/// Highlighted panel bodies keyed by panel identity.
///
/// An entry is reused while the layout and width match; a fresh diff for the
/// same key must be announced with [`BodyCache::invalidate`].
#[derive(Default)]
pub struct BodyCache {
    entries: HashMap<ExpansionKey, CachedBody>,
}

impl BodyCache {
    pub fn invalidate(&mut self, key: &ExpansionKey) {
        self.entries.remove(key);
    }

    /// Drops entries that belong to any scope other than `scope`.
    pub fn retain_scope(&mut self, scope: Option<&ScopeId>) {
        self.entries.retain(|key, _| Some(&key.scope) == scope);
    }

    fn body(
        &mut self,
        panel: &DiffPanelController,
        layout: DiffLayout,
        width: u16,
        theme: &Theme,
    ) -> &[Line<'static>] {
        let fresh = matches!(
            self.entries.get(panel.key()),
            Some(cached) if cached.layout == layout && cached.width == width
        );
        if !fresh {
            let lines = build_body(panel, layout, width, theme);
            self.entries.insert(panel.key().clone(), CachedBody { layout, width, lines });
        }
        self.entries.get(panel.key()).map(|c| c.lines.as_slice()).unwrap_or(&[])
    }
}

fn build_body(
    panel: &DiffPanelController,
    layout: DiffLayout,
    width: u16,
    theme: &Theme,
) -> Vec<Line<'static>> {
    match panel.state() {
        PanelState::Collapsed => Vec::new(),
        PanelState::Loading(_) => {
            vec![Line::styled("    Loading diff...", Style::default().fg(theme.diff_gutter))]
        }
        PanelState::Failed(message) => vec![Line::styled(
            format!("    Could not load diff: {message}"),
            Style::default().fg(theme.status_error),
        )],
        PanelState::Ready(_) => {
            let ext = file_ext(&panel.file().path);
            match panel.render(layout) {
                Some(RenderedDiff::Unified(rows)) => highlight_unified(&rows, ext, theme),
                Some(RenderedDiff::Split(view)) => {
                    highlight_split(&view.left, &view.right, ext, width, theme)
                }
                None => Vec::new(),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Renders the details panel and records the row geometry in `state`.
pub fn render_details(frame: &mut Frame, area: Rect, focus: PanelFocus, state: &mut AppState, theme: &Theme) {
    let is_focused = focus == PanelFocus::Details;
    let layout = state.engine.panels.layout();
    let layout_label = match layout {
        DiffLayout::Split => "split",
        DiffLayout::Unified => "unified",
    };
    let file_count = state.engine.panels.panels().len();
    let title = if file_count > 0 {
        format!("Details · {file_count} files · {layout_label}")
    } else {
        "Details".to_owned()
    };
    frame.render_widget(panel_block(&title, is_focused, theme), area);
    let inner = inner_rect(area);

    let header = header_lines(state, theme);
    let header_height = (header.len() as u16 + 1).min(inner.height);
    let [header_area, body_area] = inner.layout(&Layout::vertical([
        Constraint::Length(header_height),
        Constraint::Fill(1),
    ]));
    frame.render_widget(Paragraph::new(header), header_area);
    state.details_viewport_height = body_area.height;

    // Scope changes leave old bodies behind.
    state.body_cache.retain_scope(state.engine.panels.scope());

    let viewport = body_area.height as usize;
    let start = state.details_scroll;
    let end = start + viewport;
    let mut offsets = Vec::with_capacity(file_count);
    let mut visible: Vec<ListItem> = Vec::with_capacity(viewport);
    let mut row = 0usize;

    let AppState { engine, body_cache, file_cursor, .. } = state;
    for (index, panel) in engine.panels.panels().iter().enumerate() {
        offsets.push(row);
        if (start..end).contains(&row) {
            let selected = index == *file_cursor;
            visible.push(ListItem::new(file_header_line(panel, selected, is_focused, theme)));
        }
        row += 1;
        let body = body_cache.body(panel, layout, body_area.width, theme);
        for line in body {
            if (start..end).contains(&row) {
                visible.push(ListItem::new(line.clone()));
            }
            row += 1;
        }
    }

    state.file_row_offsets = offsets;
    state.details_row_count = row;
    if state.details_scroll >= row && row > 0 {
        state.details_scroll = row - 1;
    }

    if file_count == 0 {
        return;
    }
    frame.render_widget(List::new(visible), body_area);
}

fn header_lines(state: &AppState, theme: &Theme) -> Vec<Line<'static>> {
    let engine = &state.engine;
    let dim = Style::default().fg(theme.diff_gutter);
    match engine.feed.selection() {
        Selection::None => vec![Line::styled("Select a commit with Enter.", dim)],
        Selection::Uncommitted => {
            let count = engine.feed.uncommitted().len();
            vec![
                Line::styled(
                    "Uncommitted changes",
                    Style::default().fg(theme.file_modified).add_modifier(Modifier::BOLD),
                ),
                Line::styled(format!("{count} files · s stage · u unstage · c commit"), dim),
            ]
        }
        Selection::Commit(hash) => {
            if let Some(error) = &engine.details.error {
                return vec![Line::styled(
                    format!("Could not load {hash}: {error}"),
                    Style::default().fg(theme.status_error),
                )];
            }
            let Some(commit) = &engine.details.commit else {
                return vec![Line::styled(format!("Loading {hash}..."), dim)];
            };
            let mut lines = vec![Line::from(vec![
                Span::styled("commit ", dim),
                Span::styled(commit.hash.clone(), Style::default().fg(theme.commit_hash)),
            ])];
            let mut author = vec![Span::styled(
                commit.author.name.clone(),
                Style::default().fg(theme.commit_author),
            )];
            if !commit.author.email.is_empty() {
                author.push(Span::styled(format!(" <{}>", commit.author.email), dim));
            }
            if let Some(date) = commit.date {
                author.push(Span::styled(format!("  {}", date.format("%Y-%m-%d %H:%M %:z")), dim));
            }
            lines.push(Line::from(author));
            lines.push(Line::styled(
                commit.subject().to_owned(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
            if commit.parent_hashes.len() > 1 {
                let parents: Vec<&str> =
                    commit.parent_hashes.iter().map(|p| p.get(..7).unwrap_or(p)).collect();
                lines.push(Line::styled(format!("merge of {}", parents.join(" ")), dim));
            }
            lines
        }
    }
}

fn status_color(status: FileStatus, theme: &Theme) -> Color {
    match status {
        FileStatus::Added | FileStatus::Untracked => theme.file_added,
        FileStatus::Deleted => theme.file_removed,
        FileStatus::Renamed | FileStatus::Copied => theme.file_renamed,
        _ => theme.file_modified,
    }
}

fn file_header_line(
    panel: &DiffPanelController,
    selected: bool,
    focused: bool,
    theme: &Theme,
) -> Line<'static> {
    let file = panel.file();
    let marker = if panel.is_expanded() { "▾ " } else { "▸ " };
    let mut spans = vec![
        Span::raw(marker),
        Span::styled(format!("[{}] ", file.status.badge()), Style::default().fg(status_color(file.status, theme))),
        Span::styled(file.path.clone(), Style::default().add_modifier(Modifier::BOLD)),
    ];
    if let Some(old) = &file.old_path {
        spans.push(Span::styled(format!(" (from {old})"), Style::default().fg(theme.diff_gutter)));
    }
    spans.push(Span::styled(format!("  +{}", file.additions), Style::default().fg(theme.diff_added)));
    spans.push(Span::styled(format!(" -{}", file.deletions), Style::default().fg(theme.diff_removed)));
    let line = Line::from(spans);
    if selected {
        let bg = if focused { theme.highlight_bg } else { theme.background };
        line.style(Style::default().bg(bg))
    } else {
        line
    }
}

// ---------------------------------------------------------------------------
// Highlighting
// ---------------------------------------------------------------------------

/// Converts a syntect (Style, &str) pair to an owned ratatui Span.
fn syntect_to_span(style: syntect::highlighting::Style, content: &str) -> Span<'static> {
    use syntect::highlighting::Color as SC;
    let to_color = |c: SC| -> Option<Color> {
        if c.a > 0 { Some(Color::Rgb(c.r, c.g, c.b)) } else { None }
    };
    let mut ratatui_style = Style::default();
    if let Some(fg) = to_color(style.foreground) {
        ratatui_style = ratatui_style.fg(fg);
    }
    if style.font_style.contains(syntect::highlighting::FontStyle::BOLD) {
        ratatui_style = ratatui_style.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(syntect::highlighting::FontStyle::ITALIC) {
        ratatui_style = ratatui_style.add_modifier(Modifier::ITALIC);
    }
    Span::styled(content.to_owned(), ratatui_style)
}

/// Highlights one line of code; a plain span when syntect gives up.
fn build_syntect_spans(code: &str, h: &mut HighlightLines, ps: &SyntaxSet) -> Vec<Span<'static>> {
    let ranges = h.highlight_line(code, ps).unwrap_or_default();
    let spans: Vec<Span<'static>> =
        ranges.into_iter().map(|(style, text)| syntect_to_span(style, text)).collect();
    if spans.is_empty() {
        vec![Span::raw(code.to_owned())]
    } else {
        spans
    }
}

/// Word-level spans for a removed/added pair. Changed words are bold.
fn word_diff_spans(
    old_line: &str,
    new_line: &str,
    theme: &Theme,
) -> (Vec<Span<'static>>, Vec<Span<'static>>) {
    let diff = TextDiff::from_words(old_line, new_line);
    let mut old_spans: Vec<Span<'static>> = Vec::new();
    let mut new_spans: Vec<Span<'static>> = Vec::new();

    for op in diff.ops() {
        for change in diff.iter_inline_changes(op) {
            for (emphasized, value) in change.iter_strings_lossy() {
                let text = value.into_owned();
                let base = match change.tag() {
                    ChangeTag::Delete => Style::default().fg(theme.diff_removed),
                    ChangeTag::Insert => Style::default().fg(theme.diff_added),
                    ChangeTag::Equal => Style::default().fg(theme.diff_context),
                };
                let style = if emphasized { base.add_modifier(Modifier::BOLD) } else { base };
                match change.tag() {
                    ChangeTag::Delete => old_spans.push(Span::styled(text, style)),
                    ChangeTag::Insert => new_spans.push(Span::styled(text, style)),
                    ChangeTag::Equal => {
                        old_spans.push(Span::styled(text.clone(), style));
                        new_spans.push(Span::styled(text, style));
                    }
                }
            }
        }
    }
    (old_spans, new_spans)
}

fn syntax_for(ext: &str) -> (&'static SyntaxReference, Option<&'static SyntaxTheme>) {
    let theme = TS.themes.get("base16-ocean.dark").or_else(|| TS.themes.values().next());
    let syntax = PS.find_syntax_by_extension(ext).unwrap_or_else(|| PS.find_syntax_plain_text());
    (syntax, theme)
}

fn line_no(n: Option<u32>) -> String {
    match n {
        Some(n) => format!("{n:>4} "),
        None => " ".repeat(GUTTER),
    }
}

fn marker_span(kind: RowKind, theme: &Theme) -> Span<'static> {
    match kind {
        RowKind::Addition => Span::styled("+ ", Style::default().fg(theme.diff_added)),
        RowKind::Deletion => Span::styled("- ", Style::default().fg(theme.diff_removed)),
        _ => Span::styled("  ", Style::default().fg(theme.diff_gutter)),
    }
}

/// One line per unified row.
fn highlight_unified(rows: &[UnifiedRow], ext: &str, theme: &Theme) -> Vec<Line<'static>> {
    let (syntax, syntax_theme) = syntax_for(ext);
    let gutter_style = Style::default().fg(theme.diff_gutter);
    let mut out: Vec<Line<'static>> = Vec::with_capacity(rows.len());
    let mut h = syntax_theme.map(|t| HighlightLines::new(syntax, t));
    let mut pending_removed: Option<(&UnifiedRow, Vec<Span<'static>>)> = None;

    let gutter = |row: &UnifiedRow| {
        Span::styled(format!("{}{}", line_no(row.old_no), line_no(row.new_no)), gutter_style)
    };

    for row in rows {
        match row.kind {
            RowKind::HunkHeader => {
                if let Some((_, spans)) = pending_removed.take() {
                    out.push(Line::from(spans));
                }
                // Fresh highlighter per hunk.
                h = syntax_theme.map(|t| HighlightLines::new(syntax, t));
                out.push(Line::styled(row.text.clone(), Style::default().fg(theme.diff_hunk_header)));
                continue;
            }
            RowKind::Empty | RowKind::Filler => {
                out.push(Line::styled(format!("    {}", row.text), gutter_style));
                continue;
            }
            _ => {}
        }

        let base_spans = match h.as_mut() {
            Some(h) => build_syntect_spans(&row.text, h, &PS),
            None => vec![Span::styled(row.text.clone(), Style::default().fg(kind_color(row.kind, theme)))],
        };

        match row.kind {
            RowKind::Deletion => {
                if let Some((_, spans)) = pending_removed.take() {
                    out.push(Line::from(spans));
                }
                let mut s = vec![gutter(row), marker_span(row.kind, theme)];
                s.extend(base_spans);
                pending_removed = Some((row, s));
            }
            RowKind::Addition => {
                if let Some((old_row, _)) = pending_removed.take() {
                    let (old_words, new_words) = word_diff_spans(&old_row.text, &row.text, theme);
                    let mut old_s = vec![gutter(old_row), marker_span(RowKind::Deletion, theme)];
                    old_s.extend(old_words);
                    out.push(Line::from(old_s));
                    let mut new_s = vec![gutter(row), marker_span(row.kind, theme)];
                    new_s.extend(new_words);
                    out.push(Line::from(new_s));
                } else {
                    let mut s = vec![gutter(row), marker_span(row.kind, theme)];
                    s.extend(base_spans);
                    out.push(Line::from(s));
                }
            }
            _ => {
                if let Some((_, spans)) = pending_removed.take() {
                    out.push(Line::from(spans));
                }
                let mut s = vec![gutter(row), marker_span(row.kind, theme)];
                s.extend(base_spans);
                out.push(Line::from(s));
            }
        }
    }
    if let Some((_, spans)) = pending_removed.take() {
        out.push(Line::from(spans));
    }
    out
}

fn kind_color(kind: RowKind, theme: &Theme) -> Color {
    match kind {
        RowKind::Addition => theme.diff_added,
        RowKind::Deletion => theme.diff_removed,
        RowKind::HunkHeader => theme.diff_hunk_header,
        RowKind::Filler | RowKind::Empty => theme.diff_gutter,
        RowKind::Context => theme.diff_context,
    }
}

/// One line per split row pair: old column, a divider, new column.
fn highlight_split(
    left: &[SplitRow],
    right: &[SplitRow],
    ext: &str,
    width: u16,
    theme: &Theme,
) -> Vec<Line<'static>> {
    let (syntax, syntax_theme) = syntax_for(ext);
    let mut h_old = syntax_theme.map(|t| HighlightLines::new(syntax, t));
    let mut h_new = syntax_theme.map(|t| HighlightLines::new(syntax, t));
    let column = (width as usize).saturating_sub(1) / 2;
    let divider = Span::styled("│", Style::default().fg(theme.border_inactive));

    left.iter()
        .zip(right)
        .map(|(l, r)| {
            let mut spans = split_cell(l, h_old.as_mut(), column, theme);
            spans.push(divider.clone());
            spans.extend(split_cell(r, h_new.as_mut(), column, theme));
            Line::from(spans)
        })
        .collect()
}

fn split_cell(
    row: &SplitRow,
    h: Option<&mut HighlightLines>,
    width: usize,
    theme: &Theme,
) -> Vec<Span<'static>> {
    let gutter_style = Style::default().fg(theme.diff_gutter);
    let mut spans = vec![Span::styled(line_no(row.line_no), gutter_style)];
    match row.kind {
        RowKind::Filler => {}
        RowKind::Empty | RowKind::HunkHeader => spans.push(Span::styled(row.text.clone(), gutter_style)),
        kind => {
            spans.push(marker_span(kind, theme));
            match h {
                Some(h) => spans.extend(build_syntect_spans(&row.text, h, &PS)),
                None => spans.push(Span::styled(row.text.clone(), Style::default().fg(kind_color(kind, theme)))),
            }
        }
    }
    fit_spans(spans, width)
}

/// Truncates or pads `spans` to exactly `width` characters.
fn fit_spans(spans: Vec<Span<'static>>, width: usize) -> Vec<Span<'static>> {
    let mut out = Vec::with_capacity(spans.len() + 1);
    let mut used = 0usize;
    for span in spans {
        if used >= width {
            break;
        }
        let len = span.content.chars().count();
        if used + len <= width {
            used += len;
            out.push(span);
        } else {
            let kept: String = span.content.chars().take(width - used).collect();
            used = width;
            out.push(Span::styled(kept, span.style));
        }
    }
    if used < width {
        out.push(Span::raw(" ".repeat(width - used)));
    }
    out
}

/// Extension used to pick a syntax; the whole name when there is no dot.
fn file_ext(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or("txt")
}
