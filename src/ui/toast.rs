//! Transient corner notifications for command outcomes and errors.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Severity of a notification, determining color and lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

impl ToastLevel {
    pub fn color(&self) -> Color {
        match self {
            ToastLevel::Info => Color::Cyan,
            ToastLevel::Success => Color::Green,
            ToastLevel::Error => Color::Red,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            ToastLevel::Info => "[i]",
            ToastLevel::Success => "[+]",
            ToastLevel::Error => "[x]",
        }
    }

    /// Errors stay on screen longer.
    fn lifetime(&self) -> Duration {
        match self {
            ToastLevel::Info | ToastLevel::Success => Duration::from_secs(3),
            ToastLevel::Error => Duration::from_secs(8),
        }
    }
}

#[derive(Debug, Clone)]
struct Toast {
    message: String,
    level: ToastLevel,
    created_at: Instant,
}

impl Toast {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.level.lifetime()
    }
}

/// Queue of active notifications. At most a handful are shown at once;
/// older ones are dropped first.
#[derive(Debug, Default)]
pub struct ToastState {
    toasts: VecDeque<Toast>,
}

const MAX_VISIBLE: usize = 3;

impl ToastState {
    /// Add a notification.
    pub fn push(&mut self, message: impl Into<String>, level: ToastLevel) {
        self.toasts.push_back(Toast {
            message: message.into(),
            level,
            created_at: Instant::now(),
        });
        while self.toasts.len() > MAX_VISIBLE {
            self.toasts.pop_front();
        }
    }

    /// Drop expired notifications. Called once per loop tick.
    pub fn tick(&mut self) {
        self.toasts.retain(|t| !t.is_expired());
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    /// Most recent messages, for tests and rendering.
    pub fn messages(&self) -> impl Iterator<Item = (&str, ToastLevel)> {
        self.toasts.iter().map(|t| (t.message.as_str(), t.level))
    }
}

/// Render active toasts stacked in the top-right corner.
pub fn render_toasts(f: &mut Frame, toasts: &ToastState, area: Rect) {
    let mut y = area.y + 1;
    for toast in toasts.toasts.iter() {
        let text = format!(" {} {} ", toast.level.prefix(), toast.message);
        let width = (text.chars().count() as u16 + 2).min(area.width.saturating_sub(4));
        if width < 6 || y + 3 > area.y + area.height {
            break;
        }
        let rect = Rect {
            x: area.x + area.width - width - 2,
            y,
            width,
            height: 3,
        };
        f.render_widget(Clear, rect);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(toast.level.color()));
        let body = Paragraph::new(Line::from(Span::styled(
            text,
            Style::default().fg(toast.level.color()),
        )))
        .block(block);
        f.render_widget(body, rect);
        y += 3;
    }
}
