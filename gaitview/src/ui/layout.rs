//! Panel geometry and the status bar.
//!
//! Pure layout arithmetic, recomputed inside every `terminal.draw()` so the
//! panels follow the live terminal size.
//!
//! At `>= 120` columns the sidebar, commit list and details panel are all
//! visible, with widths taken from [`LayoutPrefs`](gaitview_core::prefs::LayoutPrefs).
//! Narrower terminals drop the sidebar. `Spacing::Overlap(1)` with
//! `MergeStrategy::Fuzzy` lets neighbouring borders share one column.

use gaitview_core::feed::StatusLevel;
use gaitview_core::layout::DiffLayout;
use gaitview_core::reconcile::LinkState;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
};

use crate::app::{AppState, Mode};
use crate::theme::Theme;

/// Below this width the sidebar is hidden.
pub const SIDEBAR_MIN_WIDTH: u16 = 120;

/// Returns `[sidebar, list, details, status_bar]` for the current frame.
///
/// In the insights view the caller draws the insights panel over the union
/// of `list` and `details`.
pub fn compute_layout(frame: &Frame, state: &AppState) -> [Rect; 4] {
    let [main_area, status_bar] =
        frame.area().layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]));

    let sidebar = if frame.area().width >= SIDEBAR_MIN_WIDTH {
        Constraint::Percentage(state.prefs.sidebar_pct)
    } else {
        Constraint::Length(0)
    };
    let horizontal = Layout::horizontal([
        sidebar,
        Constraint::Percentage(state.prefs.list_pct),
        Constraint::Fill(1),
    ])
    .spacing(Spacing::Overlap(1));

    let [sidebar, list, details] = main_area.layout(&horizontal);
    [sidebar, list, details, status_bar]
}

/// The panel area minus its 1-cell border.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin { vertical: 1, horizontal: 1 })
}

/// Bordered panel block: thick border when focused, plain otherwise.
///
/// `Fuzzy` merging is required because `Exact` draws wrong junctions where
/// thick and plain borders meet.
pub fn panel_block<'a>(title: &'a str, is_focused: bool, theme: &'a Theme) -> Block<'a> {
    let border_style = if is_focused {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.border_inactive)
    };
    let border_type = if is_focused { BorderType::Thick } else { BorderType::Plain };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(border_style)
        .merge_borders(MergeStrategy::Fuzzy)
}

/// One-row status bar: mode, prompt or confirmation, feed status, live link
/// and the current diff layout.
pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let (mode_text, mode_fg) = match state.mode {
        Mode::Normal => (" NORMAL ", theme.status_mode_normal),
        Mode::Insert => (" INSERT ", theme.status_mode_insert),
        Mode::HelpOverlay => (" HELP ", theme.status_mode_normal),
        Mode::Confirm => (" CONFIRM ", theme.status_error),
    };
    let mut spans = vec![Span::styled(
        mode_text,
        Style::default().fg(mode_fg).add_modifier(Modifier::BOLD),
    )];

    match (&state.mode, &state.prompt, &state.pending_confirm) {
        (Mode::Insert, Some(prompt), _) => {
            spans.push(Span::raw(format!(" {}: {}", prompt.kind.title(), prompt.input)));
            spans.push(Span::styled("▏", Style::default().fg(theme.status_mode_insert)));
        }
        (Mode::Confirm, _, Some(mutation)) => {
            spans.push(Span::styled(
                format!(" {}? y/n", mutation.label()),
                Style::default().fg(theme.status_error),
            ));
        }
        _ => {
            if let Some(status) = state.engine.feed.status() {
                let color = match status.level {
                    StatusLevel::Info => theme.status_info,
                    StatusLevel::Success => theme.status_success,
                    StatusLevel::Error => theme.status_error,
                };
                spans.push(Span::styled(format!(" {}", status.text), Style::default().fg(color)));
            }
        }
    }

    let (link_text, link_fg) = match state.engine.reconciler.state() {
        LinkState::Connected => ("● live", theme.link_up),
        LinkState::Connecting => ("◌ connecting", theme.status_info),
        LinkState::Disconnected => ("○ offline", theme.link_down),
    };
    let layout_text = match state.engine.panels.layout() {
        DiffLayout::Split => "split",
        DiffLayout::Unified => "unified",
    };
    let right = Line::from(vec![
        Span::styled(link_text, Style::default().fg(link_fg)),
        Span::raw(format!("  {layout_text}  ? help ")),
    ]);
    let right_width = right.width() as u16;

    let bar_style = Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg);
    let [left_area, right_area] =
        area.layout(&Layout::horizontal([Constraint::Fill(1), Constraint::Length(right_width)]));
    frame.render_widget(Paragraph::new(Line::from(spans)).style(bar_style), left_area);
    frame.render_widget(Paragraph::new(right).style(bar_style), right_area);
}
