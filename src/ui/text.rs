use ratatui::style::Style;
use ratatui::text::{Line, Span};

/// Wrap plain text to fit within a given width.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_width = 0usize;

    for word in text.split_whitespace() {
        // Budget in chars, not bytes, so multibyte text wraps at the same
        // column as ASCII.
        let word_width = word.chars().count();
        if current_width + word_width + 1 > width && current_width > 0 {
            lines.push(std::mem::take(&mut current_line));
            current_width = 0;
        }

        if current_width > 0 {
            current_line.push(' ');
            current_width += 1;
        }
        current_line.push_str(word);
        current_width += word_width;
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Wrap a sequence of styled text runs into lines of at most `width`
/// columns, preserving each word's style. Word boundaries only; a word
/// never splits across a style run.
pub fn wrap_spans(runs: &[(String, Style)], width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0usize;

    for (text, style) in runs {
        for word in text.split_whitespace() {
            let word_len = word.chars().count();
            let needed = if current_width == 0 {
                word_len
            } else {
                word_len + 1
            };
            if current_width + needed > width && current_width > 0 {
                lines.push(Line::from(std::mem::take(&mut current)));
                current_width = 0;
            }
            if current_width > 0 {
                current.push(Span::styled(" ".to_string(), *style));
                current_width += 1;
            }
            current.push(Span::styled(word.to_string(), *style));
            current_width += word_len;
        }
    }

    if !current.is_empty() {
        lines.push(Line::from(current));
    }
    if lines.is_empty() {
        lines.push(Line::from(""));
    }
    lines
}
