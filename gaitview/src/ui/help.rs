//! Help overlay.
//!
//! Drawn last inside the same `terminal.draw()` closure as the panels;
//! `Clear` erases the area underneath first so the modal covers them.

use ratatui::{
    Frame,
    layout::Constraint,
    style::{Modifier, Style},
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::theme::Theme;

/// Keys per section, in display order.
const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Navigation",
        &[
            ("j / k", "Move down / up"),
            ("g / G", "Jump to top / bottom"),
            ("Ctrl-d / u", "Half page down / up"),
            ("Ctrl-f / b", "Full page down / up"),
            ("H / L, Tab", "Move panel focus"),
            ("Enter", "Open branch, tag, commit or file"),
            ("J / K", "Next / previous file in details"),
        ],
    ),
    (
        "Commit feed",
        &[
            ("n", "Load more commits"),
            ("r", "Reload (picks up pushed commits)"),
            ("/", "Search loaded commits"),
            ("F", "Toggle searching file paths"),
            ("R", "Limit search to a date range"),
            ("t", "Browse the selected tag"),
            ("N", "Back to the full history"),
        ],
    ),
    (
        "Diffs",
        &[
            ("Space / o", "Expand or collapse file"),
            ("C", "Collapse every file"),
            ("v", "Toggle split / unified"),
        ],
    ),
    (
        "Repository",
        &[
            ("c", "Commit staged changes"),
            ("s / u", "Stage / unstage file"),
            ("b", "Branch from selected commit"),
            ("T", "Tag selected commit"),
            ("x", "Checkout branch"),
            ("m", "Merge branch into current"),
            ("S", "Stash changes"),
            ("a / p / d", "Apply / pop / drop stash"),
            ("D", "Delete branch or tag"),
        ],
    ),
    (
        "Layout",
        &[
            ("i", "Toggle insights view"),
            ("< / >", "Narrow / widen commit list"),
            ("[ / ]", "Narrow / widen sidebar"),
            ("z", "Fold sidebar section"),
        ],
    ),
    (
        "General",
        &[("?", "Open / close this help"), ("q / Esc", "Quit")],
    ),
];

/// Renders the help modal, scrolled by `help_scroll` rows. Skipped below 60
/// columns where the centred area would be degenerate.
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < 60 {
        return;
    }

    let overlay_area = frame
        .area()
        .centered(Constraint::Percentage(80), Constraint::Percentage(80));
    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Help · j/k scroll, ? or Esc to close ")
        .border_style(Style::default().fg(theme.border_active));

    frame.render_widget(
        Paragraph::new(build_help_text())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((help_scroll, 0)),
        overlay_area,
    );
}

fn build_help_text() -> Text<'static> {
    let mut lines = Vec::new();
    for (i, (title, keys)) in SECTIONS.iter().enumerate() {
        if i > 0 {
            lines.push(Line::default());
        }
        lines.push(Line::styled(*title, Style::default().add_modifier(Modifier::BOLD)));
        lines.extend(keys.iter().map(|(key, what)| Line::raw(format!("  {key:<13} {what}"))));
    }
    Text::from(lines)
}
