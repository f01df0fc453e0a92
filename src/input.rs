//! The interactive event loop: draw, poll, dispatch.

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{backend::Backend, Terminal};

use crate::app::{App, AppFlow};
use crate::ui;

/// Result of handling a key event.
pub enum HandleResult {
    /// Continue running the app
    Continue,
    /// Exit the app
    Exit,
}

/// Cursor blink interval in milliseconds.
const CURSOR_BLINK_MS: u64 = 530;

/// UI tick interval (spinner, toast expiry) in milliseconds.
const TICK_MS: u64 = 80;

/// Messages scrolled by Page Up/Down.
const SCROLL_PAGE_SIZE: usize = 10;

/// Run the main application loop.
pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let mut last_cursor_toggle = Instant::now();
    let mut last_tick = Instant::now();

    loop {
        // Consume streamed fragments before drawing so the in-progress
        // message grows without waiting for a keypress.
        app.process_stream();

        if last_tick.elapsed() >= Duration::from_millis(TICK_MS) {
            app.tick();
            last_tick = Instant::now();
        }

        terminal.draw(|f| ui::ui(f, app))?;

        if last_cursor_toggle.elapsed() >= Duration::from_millis(CURSOR_BLINK_MS) {
            app.toggle_cursor();
            last_cursor_toggle = Instant::now();
        }

        // Poll fast while a response is in flight so fragments render as
        // they arrive; otherwise just often enough for the cursor blink.
        let timeout = if app.is_streaming() {
            Duration::from_millis(16)
        } else {
            Duration::from_millis(50)
        };

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.cursor_visible = true;
                    last_cursor_toggle = Instant::now();

                    match handle_key_event(app, key.code, key.modifiers) {
                        HandleResult::Exit => return Ok(()),
                        HandleResult::Continue => {}
                    }
                }
            }
        }
    }
}

/// Handle a key event and return whether to continue or exit.
fn handle_key_event(app: &mut App, code: KeyCode, modifiers: KeyModifiers) -> HandleResult {
    // Global shortcuts
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            // Interrupt a pending response; exit when idle.
            if app.is_streaming() {
                app.cancel_stream();
                return HandleResult::Continue;
            }
            return HandleResult::Exit;
        }
        KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
            return HandleResult::Exit;
        }
        _ => {}
    }

    if app.overlay.is_some() {
        return handle_overlay_keys(app, code);
    }

    handle_chat_keys(app, code)
}

/// Keys while a popup overlay is open: dismiss it, ignore the rest.
fn handle_overlay_keys(app: &mut App, code: KeyCode) -> HandleResult {
    if matches!(code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
        app.overlay = None;
    }
    HandleResult::Continue
}

/// Keys in the normal chat view.
fn handle_chat_keys(app: &mut App, code: KeyCode) -> HandleResult {
    match code {
        KeyCode::Esc => {
            if app.is_streaming() {
                app.cancel_stream();
            }
        }
        KeyCode::Enter => {
            if let AppFlow::Exit = app.submit_input() {
                return HandleResult::Exit;
            }
        }
        KeyCode::Char(c) => app.handle_char(c),
        KeyCode::Backspace => app.handle_backspace(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Home => app.move_cursor_home(),
        KeyCode::End => app.move_cursor_end(),
        KeyCode::Up => app.scroll.scroll_up(),
        KeyCode::Down => {
            let max = app.max_scroll();
            app.scroll.scroll_down(max);
        }
        KeyCode::PageUp => app.scroll.scroll_page_up(SCROLL_PAGE_SIZE),
        KeyCode::PageDown => {
            let max = app.max_scroll();
            app.scroll.scroll_page_down(max, SCROLL_PAGE_SIZE);
        }
        _ => {}
    }
    HandleResult::Continue
}
