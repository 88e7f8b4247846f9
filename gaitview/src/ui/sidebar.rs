//! Sidebar: branches, tags and stashes in collapsible sections.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
};

use crate::app::{AppState, PanelFocus, SidebarRow, SidebarSection};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

pub fn render_sidebar(
    frame: &mut Frame,
    area: Rect,
    focus: PanelFocus,
    state: &mut AppState,
    theme: &Theme,
) {
    let is_focused = focus == PanelFocus::Sidebar;
    let refs = state.engine.feed.refs();
    let title = match refs.current_branch() {
        Some(branch) => format!("Refs · {}", branch.name),
        None => "Refs".to_owned(),
    };
    let block = panel_block(&title, is_focused, theme);
    state.sidebar_viewport_height = inner_rect(area).height;

    let items: Vec<ListItem> = state
        .sidebar_rows()
        .into_iter()
        .map(|row| {
            let refs = state.engine.feed.refs();
            let line = match row {
                SidebarRow::Header(section) => {
                    let count = match section {
                        SidebarSection::Branches => refs.branches.len(),
                        SidebarSection::Tags => refs.tags.len(),
                        SidebarSection::Stashes => refs.stashes.len(),
                    };
                    let arrow = if state.prefs.is_collapsed(section.key()) { "▸" } else { "▾" };
                    Line::styled(
                        format!("{arrow} {} ({count})", section.title()),
                        Style::default().add_modifier(Modifier::BOLD),
                    )
                }
                SidebarRow::Branch(i) => match refs.branches.get(i) {
                    Some(b) if b.is_current => Line::from(vec![
                        Span::styled("  * ", Style::default().fg(theme.ref_current)),
                        Span::styled(b.name.clone(), Style::default().fg(theme.ref_current)),
                    ]),
                    Some(b) if b.is_remote => {
                        Line::styled(format!("    {}", b.name), Style::default().fg(theme.ref_remote))
                    }
                    Some(b) => Line::raw(format!("    {}", b.name)),
                    None => Line::default(),
                },
                SidebarRow::Tag(i) => match refs.tags.get(i) {
                    Some(t) => Line::styled(format!("    {}", t.name), Style::default().fg(theme.ref_tag)),
                    None => Line::default(),
                },
                SidebarRow::Stash(i) => match refs.stashes.get(i) {
                    Some(s) => Line::from(vec![
                        Span::styled(format!("    stash@{{{}}} ", s.index), Style::default().fg(theme.ref_stash)),
                        Span::raw(s.message.clone()),
                    ]),
                    None => Line::default(),
                },
            };
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(theme.highlight_bg));

    frame.render_stateful_widget(list, area, &mut state.sidebar_state);
}
