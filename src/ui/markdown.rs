//! Markdown rendering for assistant messages.
//!
//! Converts markdown source to styled, width-wrapped ratatui lines.
//! Coverage is intentionally small: paragraphs, headings, emphasis,
//! inline code, fenced code blocks, lists and rules.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use super::text::wrap_spans;

/// Render markdown `content` into lines no wider than `width`, using
/// `base` as the default text style.
pub fn markdown_lines(content: &str, width: usize, base: Style) -> Vec<Line<'static>> {
    let mut renderer = Renderer::new(width, base);
    for event in Parser::new_ext(content, Options::empty()) {
        renderer.event(event);
    }
    renderer.finish()
}

struct Renderer {
    width: usize,
    base: Style,
    out: Vec<Line<'static>>,
    /// Styled runs of the block line currently being assembled.
    runs: Vec<(String, Style)>,
    bold: u8,
    italic: u8,
    heading: bool,
    in_code_block: bool,
    /// Item counters of nested lists; `None` for bullet lists.
    lists: Vec<Option<u64>>,
}

impl Renderer {
    fn new(width: usize, base: Style) -> Self {
        Self {
            width: width.max(1),
            base,
            out: Vec::new(),
            runs: Vec::new(),
            bold: 0,
            italic: 0,
            heading: false,
            in_code_block: false,
            lists: Vec::new(),
        }
    }

    fn style(&self) -> Style {
        let mut style = self.base;
        if self.bold > 0 || self.heading {
            style = style.add_modifier(Modifier::BOLD);
        }
        if self.italic > 0 {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if self.heading {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        style
    }

    fn code_style(&self) -> Style {
        self.base.fg(Color::Yellow)
    }

    fn push_run(&mut self, text: &str, style: Style) {
        self.runs.push((text.to_string(), style));
    }

    /// Emit the pending runs as wrapped lines.
    fn flush(&mut self) {
        if self.runs.is_empty() {
            return;
        }
        let runs = std::mem::take(&mut self.runs);
        self.out.extend(wrap_spans(&runs, self.width));
    }

    fn blank_separator(&mut self) {
        if !self.out.is_empty() {
            self.out.push(Line::from(""));
        }
    }

    fn event(&mut self, event: Event) {
        match event {
            Event::Start(Tag::Paragraph) => {
                if self.lists.is_empty() {
                    self.blank_separator();
                }
            }
            Event::End(TagEnd::Paragraph) => self.flush(),
            Event::Start(Tag::Heading { .. }) => {
                self.blank_separator();
                self.heading = true;
            }
            Event::End(TagEnd::Heading(_)) => {
                self.flush();
                self.heading = false;
            }
            Event::Start(Tag::List(start)) => {
                if self.lists.is_empty() {
                    self.blank_separator();
                }
                self.lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.lists.pop();
            }
            Event::Start(Tag::Item) => {
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(counter)) => {
                        let marker = format!("{}{}.", indent, counter);
                        *counter += 1;
                        marker
                    }
                    _ => format!("{}•", indent),
                };
                self.push_run(&marker, self.base);
            }
            Event::End(TagEnd::Item) => self.flush(),
            Event::Start(Tag::CodeBlock(_)) => {
                self.flush();
                self.blank_separator();
                self.in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                self.in_code_block = false;
            }
            Event::Start(Tag::Emphasis) => self.italic += 1,
            Event::End(TagEnd::Emphasis) => self.italic = self.italic.saturating_sub(1),
            Event::Start(Tag::Strong) => self.bold += 1,
            Event::End(TagEnd::Strong) => self.bold = self.bold.saturating_sub(1),
            Event::Code(text) => {
                let style = self.code_style();
                self.push_run(&text, style);
            }
            Event::Text(text) => {
                if self.in_code_block {
                    // Code is shown verbatim, one source line per line.
                    let style = self.code_style();
                    for line in text.lines() {
                        self.out
                            .push(Line::from(Span::styled(format!("  {}", line), style)));
                    }
                } else {
                    let style = self.style();
                    self.push_run(&text, style);
                }
            }
            Event::SoftBreak => {
                let style = self.style();
                self.push_run(" ", style);
            }
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.out.push(Line::from(Span::styled(
                    "─".repeat(self.width.min(40)),
                    self.base,
                )));
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        if self.out.is_empty() {
            self.out.push(Line::from(""));
        }
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn paragraph_text_survives() {
        let lines = markdown_lines("hello world", 80, Style::default());
        assert_eq!(plain(&lines), vec!["hello world"]);
    }

    #[test]
    fn long_paragraph_wraps() {
        let lines = markdown_lines("one two three four", 9, Style::default());
        let rendered = plain(&lines);
        assert!(rendered.len() > 1);
        assert!(rendered.iter().all(|l| l.chars().count() <= 9));
    }

    #[test]
    fn bullet_list_gets_markers() {
        let lines = markdown_lines("- first\n- second", 80, Style::default());
        let rendered = plain(&lines);
        assert!(rendered.contains(&"• first".to_string()));
        assert!(rendered.contains(&"• second".to_string()));
    }

    #[test]
    fn ordered_list_counts() {
        let lines = markdown_lines("1. one\n2. two", 80, Style::default());
        let rendered = plain(&lines);
        assert!(rendered.contains(&"1. one".to_string()));
        assert!(rendered.contains(&"2. two".to_string()));
    }

    #[test]
    fn code_block_is_verbatim() {
        let lines = markdown_lines("```\nlet x = 1;\n```", 80, Style::default());
        let rendered = plain(&lines);
        assert!(rendered.contains(&"  let x = 1;".to_string()));
    }

    #[test]
    fn strong_text_is_bold() {
        let lines = markdown_lines("**loud**", 80, Style::default());
        let span = &lines[0].spans[0];
        assert!(span.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn empty_input_yields_one_blank_line() {
        let lines = markdown_lines("", 80, Style::default());
        assert_eq!(plain(&lines), vec![""]);
    }
}
