//! Color themes for gaitview.
//!
//! - `dark` sticks to the ANSI 16 colors and works on any terminal.
//! - `catppuccin_mocha` uses the Catppuccin Mocha palette and needs truecolor.

use ratatui::style::Color;

/// Every color gaitview draws with.
#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    pub border_active: Color,
    pub border_inactive: Color,

    // Diff bodies
    pub diff_added: Color,
    pub diff_removed: Color,
    pub diff_context: Color,
    pub diff_hunk_header: Color,
    /// Line-number gutter and split-view filler rows.
    pub diff_gutter: Color,

    // File status badges
    pub file_added: Color,
    pub file_removed: Color,
    pub file_modified: Color,
    pub file_renamed: Color,

    // Commit list and sidebar
    pub commit_hash: Color,
    pub commit_author: Color,
    pub ref_current: Color,
    pub ref_remote: Color,
    pub ref_tag: Color,
    pub ref_stash: Color,
    pub highlight_bg: Color,

    // Insights
    pub chart: Color,
    pub priority_high: Color,
    pub priority_medium: Color,
    pub priority_low: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    pub status_mode_normal: Color,
    pub status_mode_insert: Color,
    pub status_info: Color,
    pub status_success: Color,
    pub status_error: Color,
    pub link_up: Color,
    pub link_down: Color,

    pub background: Color,
}

impl Theme {
    /// ANSI 16-color theme; the safe choice over SSH.
    pub fn dark() -> Self {
        Self {
            border_active: Color::Cyan,
            border_inactive: Color::DarkGray,

            diff_added: Color::Green,
            diff_removed: Color::Red,
            diff_context: Color::Reset,
            diff_hunk_header: Color::Cyan,
            diff_gutter: Color::DarkGray,

            file_added: Color::Green,
            file_removed: Color::Red,
            file_modified: Color::Yellow,
            file_renamed: Color::Cyan,

            commit_hash: Color::Yellow,
            commit_author: Color::Blue,
            ref_current: Color::Green,
            ref_remote: Color::DarkGray,
            ref_tag: Color::Magenta,
            ref_stash: Color::Blue,
            highlight_bg: Color::DarkGray,

            chart: Color::Cyan,
            priority_high: Color::Red,
            priority_medium: Color::Yellow,
            priority_low: Color::Blue,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_mode_normal: Color::Cyan,
            status_mode_insert: Color::Green,
            status_info: Color::White,
            status_success: Color::Green,
            status_error: Color::Red,
            link_up: Color::Green,
            link_down: Color::Red,

            background: Color::Reset,
        }
    }

    /// Catppuccin Mocha in RGB. Palette: <https://github.com/catppuccin/catppuccin>.
    pub fn catppuccin_mocha() -> Self {
        let green = Color::Rgb(166, 227, 161); // #a6e3a1
        let red = Color::Rgb(243, 139, 168); // #f38ba8
        let yellow = Color::Rgb(249, 226, 175); // #f9e2af
        let blue = Color::Rgb(137, 180, 250); // #89b4fa
        let teal = Color::Rgb(148, 226, 213); // #94e2d5
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let mauve = Color::Rgb(203, 166, 247); // #cba6f7
        let sapphire = Color::Rgb(116, 199, 236); // #74c7ec
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let surface0 = Color::Rgb(49, 50, 68); // #313244
        let surface1 = Color::Rgb(69, 71, 90); // #45475a
        let base = Color::Rgb(30, 30, 46); // #1e1e2e
        let text = Color::Rgb(205, 214, 244); // #cdd6f4
        let peach = Color::Rgb(250, 179, 135); // #fab387

        Self {
            border_active: lavender,
            border_inactive: overlay1,

            diff_added: green,
            diff_removed: red,
            diff_context: text,
            diff_hunk_header: teal,
            diff_gutter: overlay1,

            file_added: green,
            file_removed: red,
            file_modified: yellow,
            file_renamed: sapphire,

            commit_hash: peach,
            commit_author: blue,
            ref_current: green,
            ref_remote: overlay1,
            ref_tag: mauve,
            ref_stash: sapphire,
            highlight_bg: surface0,

            chart: teal,
            priority_high: red,
            priority_medium: peach,
            priority_low: blue,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_mode_normal: lavender,
            status_mode_insert: green,
            status_info: text,
            status_success: green,
            status_error: red,
            link_up: green,
            link_down: red,

            background: base,
        }
    }

    /// Resolves a configured theme name. Unknown names fall back to `dark`.
    ///
    /// # Arguments
    ///
    /// * `name`: theme name from config, e.g. `"dark"` or `"catppuccin-mocha"`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "catppuccin-mocha" | "catppuccin_mocha" => Self::catppuccin_mocha(),
            "dark" => Self::dark(),
            other => {
                tracing::warn!(theme = other, "unknown theme, falling back to 'dark'");
                Self::dark()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_theme_falls_back_to_dark() {
        assert_eq!(Theme::from_name("neon").border_active, Theme::dark().border_active);
        assert_eq!(
            Theme::from_name("catppuccin-mocha").background,
            Theme::catppuccin_mocha().background
        );
    }
}
