//! Keybinding dispatcher.
//!
//! Translates crossterm key and mouse events into `AppState` calls and tells
//! the event loop whether to keep going. Dispatch branches on `state.mode`
//! first so each mode has its own handler.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use gaitview_core::api::Mutation;
use ratatui::layout::Position;

use crate::app::{AppState, Mode, PanelFocus, PromptKind};

/// What the event loop should do after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Quit,
}

pub fn handle_key(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match state.mode {
        Mode::HelpOverlay => handle_help(key, state),
        Mode::Confirm => handle_confirm(key, state),
        Mode::Normal => handle_normal(key, state),
        Mode::Insert => handle_insert(key, state),
    }
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

fn handle_normal(key: KeyEvent, state: &mut AppState) -> KeyAction {
    if let Some(action) = handle_scroll_key(key, state) {
        return action;
    }

    match key.code {
        // Focus
        KeyCode::Char('H') | KeyCode::BackTab => state.focus = state.focus.prev(),
        KeyCode::Char('L') | KeyCode::Tab => state.focus = state.focus.next(),
        KeyCode::Enter => match state.focus {
            PanelFocus::Sidebar => state.activate_sidebar_row(),
            PanelFocus::Commits => {
                state.activate_commit_row();
                state.focus = PanelFocus::Details;
            }
            PanelFocus::Details => state.toggle_file(),
        },

        // Feed
        KeyCode::Char('n') => state.load_more(),
        KeyCode::Char('r') => state.refresh(),
        KeyCode::Char('/') => state.open_prompt(PromptKind::Search),
        KeyCode::Char('F') => state.toggle_file_search(),
        KeyCode::Char('R') => state.open_prompt(PromptKind::DateRange),
        KeyCode::Char('t') => state.enter_selected_tag(),
        KeyCode::Char('N') => state.exit_to_normal_mode(),

        // Diff panels
        KeyCode::Char('J') => state.next_file(),
        KeyCode::Char('K') => state.prev_file(),
        KeyCode::Char(' ') | KeyCode::Char('o') => state.toggle_file(),
        KeyCode::Char('C') => state.collapse_all(),
        KeyCode::Char('v') => state.toggle_layout(),

        // Repository operations
        KeyCode::Char('c') => state.open_prompt(PromptKind::CommitMessage),
        KeyCode::Char('b') => state.open_prompt(PromptKind::BranchName),
        KeyCode::Char('T') => state.open_prompt(PromptKind::TagName),
        KeyCode::Char('S') => state.open_prompt(PromptKind::StashMessage),
        KeyCode::Char('s') => state.stage_selected_file(true),
        KeyCode::Char('u') => state.stage_selected_file(false),
        KeyCode::Char('x') => state.checkout_selected_branch(),
        KeyCode::Char('m') => state.merge_selected_branch(),
        KeyCode::Char('a') => state.stash_action(|index| Mutation::ApplyStash { index }),
        KeyCode::Char('p') => state.stash_action(|index| Mutation::PopStash { index }),
        KeyCode::Char('d') => state.stash_action(|index| Mutation::DropStash { index }),
        KeyCode::Char('D') => state.delete_selected_ref(),

        // Layout
        KeyCode::Char('i') => state.toggle_insights(),
        KeyCode::Char('<') => state.shrink_list(),
        KeyCode::Char('>') => state.grow_list(),
        KeyCode::Char('[') => state.shrink_sidebar(),
        KeyCode::Char(']') => state.grow_sidebar(),
        KeyCode::Char('z') => state.toggle_sidebar_section(),

        KeyCode::Char('?') => {
            state.help_scroll = 0;
            state.mode = Mode::HelpOverlay;
        }
        KeyCode::Char('q') | KeyCode::Esc => return KeyAction::Quit,
        _ => {}
    }
    KeyAction::Continue
}

/// j/k/g/G and the Ctrl page keys. `None` when the key is not a scroll key.
fn handle_scroll_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => state.scroll_up(1),
        KeyCode::Char('g') | KeyCode::Home => state.scroll_top(),
        KeyCode::Char('G') | KeyCode::End => state.scroll_bottom(),
        KeyCode::Char('d') if ctrl => state.half_page_down(),
        KeyCode::Char('u') if ctrl => state.half_page_up(),
        KeyCode::Char('f') if ctrl => state.full_page_down(),
        KeyCode::Char('b') if ctrl => state.full_page_up(),
        KeyCode::PageDown => state.full_page_down(),
        KeyCode::PageUp => state.full_page_up(),
        _ => return None,
    }
    Some(KeyAction::Continue)
}

// ---------------------------------------------------------------------------
// Help overlay
// ---------------------------------------------------------------------------

fn handle_help(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.help_scroll = state.help_scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => state.help_scroll = state.help_scroll.saturating_sub(1),
        KeyCode::Char('g') => state.help_scroll = 0,
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => state.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Confirmation
// ---------------------------------------------------------------------------

/// `y` runs the pending operation; `n` or Esc drops it.
fn handle_confirm(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => state.resolve_confirm(true),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => state.resolve_confirm(false),
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Insert mode (prompt line)
// ---------------------------------------------------------------------------

fn handle_insert(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Esc => state.cancel_prompt(),
        KeyCode::Enter => state.submit_prompt(),
        KeyCode::Backspace => {
            if let Some(prompt) = state.prompt.as_mut() {
                prompt.input.pop();
            }
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            if let Some(prompt) = state.prompt.as_mut() {
                prompt.input.push(c);
            }
        }
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// Mouse
// ---------------------------------------------------------------------------

/// Left click focuses the panel under the pointer; the wheel scrolls by 3.
pub fn handle_mouse(mouse: MouseEvent, state: &mut AppState) -> KeyAction {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => focus_at(mouse.column, mouse.row, state),
        MouseEventKind::ScrollUp if state.mode == Mode::HelpOverlay => {
            state.help_scroll = state.help_scroll.saturating_sub(3)
        }
        MouseEventKind::ScrollDown if state.mode == Mode::HelpOverlay => {
            state.help_scroll = state.help_scroll.saturating_add(3)
        }
        MouseEventKind::ScrollUp => state.scroll_up(3),
        MouseEventKind::ScrollDown => state.scroll_down(3),
        _ => {}
    }
    KeyAction::Continue
}

/// Collapsed panels have zero width and never take focus.
fn focus_at(col: u16, row: u16, state: &mut AppState) {
    let pos = Position { x: col, y: row };
    let [sidebar, list, details] = state.panel_rects;

    if sidebar.width > 0 && sidebar.contains(pos) {
        state.focus = PanelFocus::Sidebar;
    } else if list.contains(pos) {
        state.focus = PanelFocus::Commits;
    } else if details.contains(pos) {
        state.focus = PanelFocus::Details;
    }
}
