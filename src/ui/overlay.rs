//! Centered popup overlays: help, config tables, profile listings.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::commands::HELP_ENTRIES;

/// An informational popup shown over the chat until dismissed.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    /// Command reference.
    Help,
    /// Key/value table with a title (config, profile listings).
    Table {
        title: String,
        rows: Vec<(String, String)>,
    },
    /// Free-form text with a title (system message display).
    Text { title: String, body: String },
}

impl Overlay {
    fn title(&self) -> &str {
        match self {
            Overlay::Help => "Help",
            Overlay::Table { title, .. } => title,
            Overlay::Text { title, .. } => title,
        }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        match self {
            Overlay::Help => {
                let mut lines = vec![Line::from("")];
                for (usage, description) in HELP_ENTRIES {
                    lines.push(Line::from(vec![
                        Span::styled(
                            format!("  {:<24}", usage),
                            Style::default()
                                .fg(Color::Cyan)
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::raw(description.to_string()),
                    ]));
                }
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "  Anything else is sent to the assistant.",
                    Style::default().fg(Color::DarkGray),
                )));
                lines
            }
            Overlay::Table { rows, .. } => {
                let key_width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
                let mut lines = vec![Line::from("")];
                for (key, value) in rows {
                    lines.push(Line::from(vec![
                        Span::styled(
                            format!("  {:<width$}  ", key, width = key_width),
                            Style::default()
                                .fg(Color::Cyan)
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(value.clone(), Style::default().fg(Color::Green)),
                    ]));
                }
                lines
            }
            Overlay::Text { body, .. } => {
                let mut lines = vec![Line::from("")];
                for line in body.lines() {
                    lines.push(Line::from(format!("  {}", line)));
                }
                lines
            }
        }
    }
}

/// Render the overlay as a centered popup with a drop shadow.
pub fn render_overlay(f: &mut Frame, overlay: &Overlay) {
    let area = f.size();
    let lines = overlay.lines();

    let content_width = lines
        .iter()
        .map(|l| l.spans.iter().map(|s| s.content.chars().count()).sum())
        .max()
        .unwrap_or(0usize);
    let width = ((content_width as u16) + 4)
        .max(30)
        .min(area.width.saturating_sub(4));
    let height = (lines.len() as u16 + 3).min(area.height.saturating_sub(2));

    let x = (area.width.saturating_sub(width)) / 2;
    let y = (area.height.saturating_sub(height)) / 2;

    let shadow = Rect {
        x: (x + 2).min(area.width.saturating_sub(1)),
        y: (y + 1).min(area.height.saturating_sub(1)),
        width: width.min(area.width.saturating_sub(x + 2)),
        height: height.min(area.height.saturating_sub(y + 1)),
    };
    f.render_widget(
        Block::default().style(Style::default().bg(Color::Rgb(10, 10, 15))),
        shadow,
    );

    let popup = Rect {
        x,
        y,
        width,
        height,
    };
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Rgb(80, 80, 100)))
        .title(Span::styled(
            format!(" {} ", overlay.title()),
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .style(Style::default().bg(Color::Rgb(25, 25, 35)));

    let body = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(body, popup);
}
