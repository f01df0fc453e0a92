//! parley - a minimal terminal chat client.
//!
//! Renders a conversation in a full-screen terminal UI, forwards user
//! messages to an OpenAI-compatible text-generation API, streams the
//! response back and persists named configuration profiles.

pub mod api;
pub mod app;
pub mod commands;
pub mod config;
pub mod input;
pub mod message;
pub mod ui;

use std::io;

use anyhow::{bail, Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use app::App;
use config::ProfileStore;

/// Launch the interactive chat loop. Both binaries call this.
pub fn run() -> Result<()> {
    // Resolve configuration before touching the terminal so startup
    // failures print a plain diagnostic.
    let store = ProfileStore::default_location()?;
    let mut app = App::new(store).context("failed to load configuration")?;
    let effective = app.effective()?;
    if effective.api_key.is_none() {
        bail!(
            "No API key found in environment variables.\n\
             Set your key with: export OPENAI_API_KEY=your_api_key_here\n\
             Or alternatively:  export API_KEY=your_api_key_here"
        );
    }

    // The event loop is synchronous; the runtime guard lets the API client
    // spawn its request tasks from it.
    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = input::run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}
