//! Persisted layout preferences: panel widths and collapsed sidebar sections.

use std::collections::BTreeSet;

/// Bounds for the commit-list width, in percent of the terminal.
pub const LIST_PCT_RANGE: (u16, u16) = (20, 70);
/// Bounds for the sidebar width, in percent of the terminal.
pub const SIDEBAR_PCT_RANGE: (u16, u16) = (10, 40);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPrefs {
    pub list_pct: u16,
    pub sidebar_pct: u16,
    /// Sidebar sections the user folded away (`branches`, `tags`, ...).
    pub collapsed: BTreeSet<String>,
}

impl Default for LayoutPrefs {
    fn default() -> Self {
        Self { list_pct: 35, sidebar_pct: 20, collapsed: BTreeSet::new() }
    }
}

impl LayoutPrefs {
    pub fn set_list_pct(&mut self, pct: u16) {
        self.list_pct = pct.clamp(LIST_PCT_RANGE.0, LIST_PCT_RANGE.1);
    }

    pub fn set_sidebar_pct(&mut self, pct: u16) {
        self.sidebar_pct = pct.clamp(SIDEBAR_PCT_RANGE.0, SIDEBAR_PCT_RANGE.1);
    }

    pub fn is_collapsed(&self, section: &str) -> bool {
        self.collapsed.contains(section)
    }

    /// Flips a sidebar section. Returns `true` if it is now collapsed.
    pub fn toggle_section(&mut self, section: &str) -> bool {
        if self.collapsed.remove(section) {
            false
        } else {
            self.collapsed.insert(section.to_owned());
            true
        }
    }

    /// Parses a stored width, keeping `fallback` when the value is unusable.
    pub fn parse_pct(raw: &str, fallback: u16) -> u16 {
        match raw.trim().trim_end_matches('%').parse::<u16>() {
            Ok(pct) => pct,
            Err(err) => {
                tracing::warn!(raw, %err, "ignoring unreadable stored width");
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_are_clamped() {
        let mut prefs = LayoutPrefs::default();
        prefs.set_list_pct(95);
        assert_eq!(prefs.list_pct, 70);
        prefs.set_sidebar_pct(2);
        assert_eq!(prefs.sidebar_pct, 10);
    }

    #[test]
    fn parse_pct_is_lenient() {
        assert_eq!(LayoutPrefs::parse_pct("42", 35), 42);
        assert_eq!(LayoutPrefs::parse_pct(" 30% ", 35), 30);
        assert_eq!(LayoutPrefs::parse_pct("wide", 35), 35);
    }

    #[test]
    fn sections_toggle() {
        let mut prefs = LayoutPrefs::default();
        assert!(prefs.toggle_section("tags"));
        assert!(prefs.is_collapsed("tags"));
        assert!(!prefs.toggle_section("tags"));
    }
}
