//! Terminal rendering.
//!
//! [`render`] is the only entry point and is called once per
//! `AppEvent::Render` from inside `terminal.draw()`.

pub mod commit_list;
pub mod diff_view;
pub mod help;
pub mod insights;
pub mod keybindings;
pub mod layout;
pub mod sidebar;

use ratatui::Frame;

use crate::app::{AppState, Mode, View};
use crate::theme::Theme;
use layout::{compute_layout, render_status_bar};

/// Renders one frame.
///
/// Panel rects are stored back into `state` for mouse hit-testing; each panel
/// caches its own viewport height so the next keypress can size page scrolls.
pub fn render(frame: &mut Frame, state: &mut AppState, theme: &Theme) {
    let [sidebar, list, details, status_bar] = compute_layout(frame, state);
    state.panel_rects = [sidebar, list, details];
    let focus = state.focus;

    if sidebar.width > 0 {
        sidebar::render_sidebar(frame, sidebar, focus, state, theme);
    }

    match state.view {
        View::Commits => {
            commit_list::render_commit_list(frame, list, focus, state, theme);
            diff_view::render_details(frame, details, focus, state, theme);
        }
        View::Insights => {
            insights::render_insights(frame, list.union(details), focus, state, theme);
        }
    }

    render_status_bar(frame, status_bar, state, theme);

    if state.mode == Mode::HelpOverlay {
        help::render_help_overlay(frame, theme, state.help_scroll);
    }
}
