//! Commit list panel.
//!
//! Shows the pinned working-tree entry (Normal mode only) followed by the
//! visible commits: short hash, subject, author and relative date. The title
//! carries the browse mode, the window size and the count of commits pushed
//! since the last reload.

use gaitview_core::types::{Commit, FeedMode};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
};

use crate::app::{AppState, CommitRow, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

/// Subjects longer than this are cut with an ellipsis.
const MAX_SUBJECT: usize = 72;

pub fn render_commit_list(
    frame: &mut Frame,
    area: Rect,
    focus: PanelFocus,
    state: &mut AppState,
    theme: &Theme,
) {
    let is_focused = focus == PanelFocus::Commits;
    let title = list_title(state);
    let block = panel_block(&title, is_focused, theme);
    state.commits_viewport_height = inner_rect(area).height;

    let rows = state.commit_rows();
    let feed = &state.engine.feed;
    let items: Vec<ListItem> = if rows.is_empty() {
        let msg = if feed.is_loading() { "Loading..." } else { "No commits" };
        vec![ListItem::new(Line::raw(msg))]
    } else {
        rows.iter()
            .map(|row| match row {
                CommitRow::Uncommitted => uncommitted_item(feed.uncommitted().len(), theme),
                CommitRow::Commit(hash) => match feed.find(hash) {
                    Some(commit) => commit_item(commit, feed.selection().hash() == Some(hash), theme),
                    None => ListItem::new(Line::raw(hash.clone())),
                },
            })
            .collect()
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(theme.highlight_bg).fg(theme.border_active));

    frame.render_stateful_widget(list, area, &mut state.commit_list_state);
}

fn list_title(state: &AppState) -> String {
    let feed = &state.engine.feed;
    let mut title = match feed.mode() {
        FeedMode::Normal => format!("Commits ({})", feed.commits().len()),
        FeedMode::Tag(tag) => format!("Commits @ {tag} ({})", feed.commits().len()),
        FeedMode::Search(query) => {
            format!("Search \"{query}\" ({}/{})", feed.visible().len(), feed.commits().len())
        }
    };
    if feed.cursor().has_more && !matches!(feed.mode(), FeedMode::Search(_)) {
        title.push('+');
    }
    if feed.incoming() > 0 {
        title.push_str(&format!(" · {} new, r to reload", feed.incoming()));
    }
    if feed.is_loading() {
        title.push_str(" · loading");
    }
    title
}

fn uncommitted_item(files: usize, theme: &Theme) -> ListItem<'static> {
    ListItem::new(Line::from(vec![
        Span::styled("●       ", Style::default().fg(theme.file_modified)),
        Span::styled(
            format!("Uncommitted changes ({files})"),
            Style::default().fg(theme.file_modified).add_modifier(Modifier::ITALIC),
        ),
    ]))
}

fn commit_item(commit: &Commit, selected: bool, theme: &Theme) -> ListItem<'static> {
    let subject = commit.subject();
    let subject = if subject.chars().count() > MAX_SUBJECT {
        let cut: String = subject.chars().take(MAX_SUBJECT - 1).collect();
        format!("{cut}…")
    } else {
        subject.to_owned()
    };
    let subject_style = if selected {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let mut spans = vec![
        Span::styled(format!("{:<8}", commit.short()), Style::default().fg(theme.commit_hash)),
        Span::styled(subject, subject_style),
    ];
    if !commit.author.name.is_empty() {
        spans.push(Span::styled(
            format!("  {}", commit.author.name),
            Style::default().fg(theme.commit_author),
        ));
    }
    if let Some(date) = commit.date {
        spans.push(Span::styled(
            format!("  {}", date.format("%Y-%m-%d")),
            Style::default().fg(theme.diff_gutter),
        ));
    }
    ListItem::new(Line::from(spans))
}
