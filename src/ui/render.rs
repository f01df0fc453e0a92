use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Margin},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        block::Title, Block, Borders, List, ListItem, Paragraph, Scrollbar,
        ScrollbarOrientation, Wrap,
    },
    Frame,
};

use crate::app::{App, Status};
use crate::message::{Message, Role};

use super::markdown::markdown_lines;
use super::overlay::render_overlay;
use super::text::wrap_text;
use super::toast::render_toasts;

const BG_PRIMARY: Color = Color::Rgb(20, 20, 25);
const BG_INPUT: Color = Color::Rgb(30, 30, 35);

const SPINNER_FRAMES: [&str; 8] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧"];

/// Main UI rendering function.
pub fn ui(f: &mut Frame, app: &mut App) {
    // Thick border effect: dark frame around the content area.
    let background = Block::default().style(Style::default().bg(Color::Black));
    f.render_widget(background, f.size());

    let inner_area = f.size().inner(&Margin {
        horizontal: 2,
        vertical: 1,
    });
    let inner_bg = Block::default().style(Style::default().bg(BG_PRIMARY));
    f.render_widget(inner_bg, inner_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Chat messages
            Constraint::Length(3), // Input box
        ])
        .split(inner_area);

    render_messages(f, app, chunks[0]);
    render_input(f, app, chunks[1]);

    if let Some(overlay) = &app.overlay {
        render_overlay(f, overlay);
    }
    if !app.toasts.is_empty() {
        render_toasts(f, &app.toasts, inner_area);
    }
}

fn status_cell(app: &App) -> (String, Color) {
    match &app.status {
        Status::Ready => ("● Ready".to_string(), Color::Rgb(100, 255, 100)),
        Status::Waiting => {
            let frame = SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()];
            (format!("{} Thinking", frame), Color::Rgb(100, 200, 255))
        }
        Status::Streaming => ("● Streaming...".to_string(), Color::Rgb(100, 200, 255)),
        Status::Error(_) => ("● Error".to_string(), Color::Rgb(255, 100, 100)),
    }
}

fn render_messages(f: &mut Frame, app: &mut App, area: ratatui::layout::Rect) {
    let total_visible = app.conversation.visible_len();
    app.scroll.update(total_visible);

    let wrap_width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = app
        .conversation
        .visible()
        .skip(app.scroll.offset)
        .flat_map(|msg| message_items(msg, wrap_width))
        .collect();

    let (status_text, status_color) = status_cell(app);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Rgb(80, 80, 100)))
        .title(Span::styled(
            format!(" parley ─ {} ", app.active_profile),
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .title(
            Title::from(Span::styled(
                format!(" {} ", status_text),
                Style::default().fg(status_color),
            ))
            .alignment(Alignment::Right),
        );

    f.render_widget(List::new(items).block(block), area);

    let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(Some("▲"))
        .end_symbol(Some("▼"))
        .track_symbol(Some("░"))
        .thumb_symbol("█")
        .style(Style::default().fg(Color::Rgb(80, 80, 100)));

    f.render_stateful_widget(
        scrollbar,
        area.inner(&Margin {
            vertical: 1,
            horizontal: 0,
        }),
        &mut app.scroll.scrollbar,
    );
}

/// Render one message as a header line followed by its wrapped content.
/// Assistant content goes through the markdown renderer; user content is
/// plain wrapped text.
fn message_items(msg: &Message, width: usize) -> Vec<ListItem<'static>> {
    let style = match msg.role {
        Role::User => Style::default().fg(Color::Cyan),
        Role::Assistant => Style::default().fg(Color::Green),
        Role::System => Style::default().fg(Color::DarkGray),
    };

    let mut items = vec![ListItem::new(Line::from(vec![
        Span::styled(
            msg.role.prefix().trim_end().to_string(),
            style.add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  {}", msg.timestamp.format("%H:%M")),
            Style::default().fg(Color::DarkGray),
        ),
    ]))];

    let lines = if msg.role == Role::Assistant {
        markdown_lines(&msg.content, width, style)
    } else {
        wrap_text(&msg.content, width)
            .into_iter()
            .map(|line| Line::from(Span::styled(line, style)))
            .collect()
    };
    items.extend(lines.into_iter().map(ListItem::new));

    items.push(ListItem::new(Line::from("")));
    items
}

fn render_input(f: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    let cursor_char = if app.cursor_visible { "▎" } else { " " };
    let byte_cursor = app
        .input
        .char_indices()
        .nth(app.cursor_position)
        .map(|(i, _)| i)
        .unwrap_or(app.input.len());

    let cursor_span = Span::styled(
        cursor_char,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::SLOW_BLINK),
    );
    let input_text = Line::from(vec![
        Span::raw(app.input[..byte_cursor].to_string()),
        cursor_span,
        Span::raw(app.input[byte_cursor..].to_string()),
    ]);

    let input_block = Block::default()
        .borders(Borders::LEFT)
        .border_style(Style::default().fg(Color::Cyan))
        .style(Style::default().bg(BG_INPUT));

    let input = Paragraph::new(input_text)
        .style(Style::default().fg(Color::White))
        .block(input_block)
        .wrap(Wrap { trim: false });

    f.render_widget(input, area);
}
