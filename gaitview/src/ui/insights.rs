//! Insights view: repository analytics, pushed insights and notices.
//!
//! Replaces the commit list and details panels while active (`i`). Charts
//! are limited to a sparkline and text bars.

use gaitview_core::events::{Analytics, Insight, KnowledgeGraph};
use gaitview_core::reconcile::{InsightsBoard, LinkState};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Sparkline, Wrap},
};
use serde_json::Value;

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

const BAR_WIDTH: usize = 20;
const MAX_LINKS: usize = 8;

pub fn render_insights(frame: &mut Frame, area: Rect, focus: PanelFocus, state: &AppState, theme: &Theme) {
    let is_focused = focus != PanelFocus::Sidebar;
    let link = state.engine.reconciler.state();
    let title = format!("Insights · live {}", link_label(link));
    frame.render_widget(panel_block(&title, is_focused, theme), area);
    let inner = inner_rect(area);
    let board = &state.engine.reconciler.board;

    let [stats_area, trend_area, body_area] = inner.layout(&Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(5),
        Constraint::Fill(1),
    ]));

    frame.render_widget(Paragraph::new(stats_lines(board.analytics.as_ref(), theme)), stats_area);

    let trend: Vec<u64> = board
        .analytics
        .as_ref()
        .map(|a| a.commit_trends.values.clone())
        .unwrap_or_default();
    frame.render_widget(
        Sparkline::default()
            .block(Block::bordered().title("Commit trend").border_style(Style::default().fg(theme.border_inactive)))
            .data(&trend)
            .style(Style::default().fg(theme.chart)),
        trend_area,
    );

    let [left, right] =
        body_area.layout(&Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]));
    frame.render_widget(
        Paragraph::new(left_column(board, theme))
            .wrap(Wrap { trim: false })
            .scroll((state.insights_scroll, 0)),
        left,
    );
    frame.render_widget(
        Paragraph::new(right_column(board, theme))
            .wrap(Wrap { trim: false })
            .scroll((state.insights_scroll, 0)),
        right,
    );
}

pub fn link_label(link: LinkState) -> &'static str {
    match link {
        LinkState::Connected => "connected",
        LinkState::Connecting => "connecting",
        LinkState::Disconnected => "offline",
    }
}

fn heading(text: &str) -> Line<'static> {
    Line::styled(text.to_owned(), Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED))
}

fn stats_lines(analytics: Option<&Analytics>, theme: &Theme) -> Vec<Line<'static>> {
    let Some(a) = analytics else {
        return vec![Line::styled("No analytics yet.", Style::default().fg(theme.diff_gutter))];
    };
    let value = |v: String| Span::styled(v, Style::default().fg(theme.chart).add_modifier(Modifier::BOLD));
    vec![Line::from(vec![
        Span::raw("Commits "),
        value(a.total_commits.to_string()),
        Span::raw("   Developers "),
        value(a.active_developers.to_string()),
        Span::raw("   Quality "),
        value(format!("{:.1}", a.code_quality_score)),
        Span::raw("   Tech debt "),
        value(a.technical_debt_label()),
    ])]
}

/// A text bar `fraction` of [`BAR_WIDTH`] long.
pub fn bar(fraction: f64) -> String {
    let filled = (fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn left_column(board: &InsightsBoard, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let chart = Style::default().fg(theme.chart);

    if let Some(a) = &board.analytics {
        let langs = &a.language_distribution;
        if !langs.languages.is_empty() {
            lines.push(heading("Languages"));
            for (name, pct) in langs.languages.iter().zip(&langs.percentages) {
                lines.push(Line::from(vec![
                    Span::raw(format!("{name:<12} ")),
                    Span::styled(bar(pct / 100.0), chart),
                    Span::raw(format!(" {pct:.0}%")),
                ]));
            }
            lines.push(Line::default());
        }

        let devs = &a.developer_activity;
        let top = devs.commits.iter().copied().max().unwrap_or(0).max(1);
        if !devs.developers.is_empty() {
            lines.push(heading("Developers"));
            for (name, commits) in devs.developers.iter().zip(&devs.commits) {
                lines.push(Line::from(vec![
                    Span::raw(format!("{name:<12} ")),
                    Span::styled(bar(*commits as f64 / top as f64), chart),
                    Span::raw(format!(" {commits}")),
                ]));
            }
            lines.push(Line::default());
        }
    }

    if let Some(semantics) = &board.semantics {
        lines.push(heading("Semantic trends"));
        for (topic, weight) in semantics {
            lines.push(Line::from(vec![
                Span::raw(format!("{topic:<12} ")),
                Span::styled(bar(*weight), chart),
                Span::raw(format!(" {weight:.2}")),
            ]));
        }
        lines.push(Line::default());
    }

    if let Some(patterns) = &board.patterns {
        lines.push(heading("Patterns"));
        lines.extend(pattern_lines(patterns));
    }

    if lines.is_empty() {
        lines.push(Line::styled("Waiting for dashboard data...", Style::default().fg(theme.diff_gutter)));
    }
    lines
}

/// One line per top-level pattern entry: arrays and objects show their size.
pub fn pattern_lines(patterns: &Value) -> Vec<Line<'static>> {
    let describe = |v: &Value| match v {
        Value::Array(items) => format!("{} items", items.len()),
        Value::Object(map) => format!("{} entries", map.len()),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    match patterns {
        Value::Object(map) => map.iter().map(|(k, v)| Line::raw(format!("{k}: {}", describe(v)))).collect(),
        Value::Null => Vec::new(),
        other => vec![Line::raw(describe(other))],
    }
}

fn insight_lines(insight: &Insight, theme: &Theme) -> Vec<Line<'static>> {
    let color = match insight.priority.to_ascii_lowercase().as_str() {
        "high" | "critical" => theme.priority_high,
        "medium" => theme.priority_medium,
        _ => theme.priority_low,
    };
    let mut title = vec![Span::styled(
        format!("[{}] ", if insight.priority.is_empty() { "info" } else { &insight.priority }),
        Style::default().fg(color),
    )];
    title.push(Span::styled(insight.title.clone(), Style::default().add_modifier(Modifier::BOLD)));
    if !insight.category.is_empty() {
        title.push(Span::styled(format!("  {}", insight.category), Style::default().fg(theme.diff_gutter)));
    }
    let mut lines = vec![Line::from(title)];
    if !insight.description.is_empty() {
        lines.push(Line::raw(format!("  {}", insight.description)));
    }
    lines
}

fn graph_lines(graph: &KnowledgeGraph, theme: &Theme) -> Vec<Line<'static>> {
    let mut links: Vec<_> = graph.links.iter().collect();
    links.sort_by(|a, b| b.value.total_cmp(&a.value));
    links
        .into_iter()
        .take(MAX_LINKS)
        .map(|link| {
            Line::from(vec![
                Span::raw(graph.label_of(&link.source).to_owned()),
                Span::styled(" ── ", Style::default().fg(theme.diff_gutter)),
                Span::raw(graph.label_of(&link.target).to_owned()),
                Span::styled(format!("  {:.2}", link.value), Style::default().fg(theme.diff_gutter)),
            ])
        })
        .collect()
}

fn right_column(board: &InsightsBoard, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if let Some(spotlight) = &board.spotlight {
        lines.push(heading("Latest insight"));
        lines.extend(insight_lines(spotlight, theme));
        lines.push(Line::default());
    }

    if !board.insights.is_empty() {
        lines.push(heading("Insights"));
        for insight in &board.insights {
            lines.extend(insight_lines(insight, theme));
        }
        lines.push(Line::default());
    }

    if !board.notices.is_empty() {
        lines.push(heading("Notifications"));
        for notice in &board.notices {
            let color = match notice.kind.as_str() {
                "error" => theme.status_error,
                "success" => theme.status_success,
                _ => theme.status_info,
            };
            lines.push(Line::from(vec![
                Span::styled(notice.title.clone(), Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(format!("  {}", notice.message)),
            ]));
        }
        lines.push(Line::default());
    }

    if let Some(graph) = &board.knowledge_graph {
        if !graph.links.is_empty() {
            lines.push(heading("Knowledge graph"));
            lines.extend(graph_lines(graph, theme));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_is_clamped_and_fixed_width() {
        assert_eq!(bar(0.0).chars().filter(|&c| c == '█').count(), 0);
        assert_eq!(bar(0.5).chars().filter(|&c| c == '█').count(), 10);
        assert_eq!(bar(3.0).chars().filter(|&c| c == '█').count(), BAR_WIDTH);
        assert_eq!(bar(-1.0).chars().count(), BAR_WIDTH);
    }

    #[test]
    fn patterns_summarize_top_level_entries() {
        let patterns = serde_json::json!({
            "hotspots": [1, 2, 3],
            "owners": {"a": 1},
            "summary": "stable",
        });
        let lines: Vec<String> = pattern_lines(&patterns)
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert!(lines.contains(&"hotspots: 3 items".to_owned()));
        assert!(lines.contains(&"owners: 1 entries".to_owned()));
        assert!(lines.contains(&"summary: stable".to_owned()));
        assert!(pattern_lines(&Value::Null).is_empty());
    }
}
