//! Application state and the turn-level state machine.
//!
//! One user turn at a time: idle, dispatching a command or a message, or
//! awaiting a response. Streamed fragments are drained cooperatively by
//! the event loop via `process_stream`.

use ratatui::widgets::ScrollbarState;
use tokio::sync::mpsc;

use crate::api::{ApiError, ChatClient, StreamEvent, WireMessage};
use crate::commands::{self, Command, CommandError};
use crate::config::{
    ConfigError, EffectiveConfig, Profile, ProfileSettings, ProfileStore, DEFAULT_PROFILE,
};
use crate::message::{Conversation, Message, Role};
use crate::ui::{Overlay, ToastLevel, ToastState};

/// Longest value shown in the config table before truncation.
const MAX_DISPLAY_VALUE: usize = 50;

/// Where the session currently is in its turn cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Awaiting user input.
    Ready,
    /// Request sent, nothing received yet (loading indicator shown).
    Waiting,
    /// Response fragments are arriving.
    Streaming,
    /// The last turn failed; cleared by the next action.
    Error(String),
}

/// Whether the loop keeps running after handling input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppFlow {
    Continue,
    Exit,
}

/// Scroll position over the visible message list.
#[derive(Debug, Default)]
pub struct ScrollState {
    /// Index of the first visible message.
    pub offset: usize,
    /// Scrollbar state for ratatui.
    pub scrollbar: ScrollbarState,
}

impl ScrollState {
    pub fn scroll_up(&mut self) {
        self.offset = self.offset.saturating_sub(1);
    }

    pub fn scroll_down(&mut self, max_scroll: usize) {
        if self.offset < max_scroll {
            self.offset += 1;
        }
    }

    pub fn scroll_page_up(&mut self, page_size: usize) {
        self.offset = self.offset.saturating_sub(page_size);
    }

    pub fn scroll_page_down(&mut self, max_scroll: usize, page_size: usize) {
        self.offset = (self.offset + page_size).min(max_scroll);
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_to_bottom(&mut self, max_scroll: usize) {
        self.offset = max_scroll;
    }

    /// Update the scrollbar from the current list size.
    pub fn update(&mut self, total_items: usize) {
        self.scrollbar = self.scrollbar.content_length(total_items);
        self.scrollbar = self.scrollbar.position(self.offset);
    }
}

/// Application state for the chat client.
pub struct App {
    /// Profile storage
    pub store: ProfileStore,
    /// Name of the active profile
    pub active_profile: String,
    /// Settings of the active profile
    pub settings: ProfileSettings,
    /// Session message history
    pub conversation: Conversation,
    /// Current input text
    pub input: String,
    /// Cursor position in input
    pub cursor_position: usize,
    /// Scroll state for the message list
    pub scroll: ScrollState,
    /// Turn state
    pub status: Status,
    /// Receiver for the in-flight response, if any
    pub stream_rx: Option<mpsc::Receiver<StreamEvent>>,
    /// Informational popup, if open
    pub overlay: Option<Overlay>,
    /// Transient notifications
    pub toasts: ToastState,
    /// Cursor blink visibility
    pub cursor_visible: bool,
    /// Loading spinner frame
    pub spinner_frame: usize,
}

impl App {
    /// Create the app from a profile store: read the active marker, load
    /// the profile and seed the conversation with the system prompt.
    pub fn new(store: ProfileStore) -> Result<Self, ConfigError> {
        let active_profile = store.active()?;
        let profile = store.load(&active_profile)?;
        let effective = EffectiveConfig::from_env(&profile.settings)?;

        Ok(Self {
            store,
            active_profile,
            settings: profile.settings,
            conversation: Conversation::with_system(&effective.system_prompt),
            input: String::new(),
            cursor_position: 0,
            scroll: ScrollState::default(),
            status: Status::Ready,
            stream_rx: None,
            overlay: None,
            toasts: ToastState::default(),
            cursor_visible: true,
            spinner_frame: 0,
        })
    }

    /// Compute the effective configuration for the next request.
    pub fn effective(&self) -> Result<EffectiveConfig, ConfigError> {
        EffectiveConfig::from_env(&self.settings)
    }

    // --- input editing -----------------------------------------------------

    pub fn handle_char(&mut self, c: char) {
        self.input.insert(self.byte_cursor(), c);
        self.cursor_position += 1;
    }

    pub fn handle_backspace(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            let at = self.byte_cursor();
            self.input.remove(at);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor_position < self.input.chars().count() {
            self.cursor_position += 1;
        }
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor_position = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor_position = self.input.chars().count();
    }

    fn byte_cursor(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor_position)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_position = 0;
    }

    /// Highest valid scroll offset for the visible message list.
    pub fn max_scroll(&self) -> usize {
        self.conversation.visible_len().saturating_sub(1)
    }

    // --- turn dispatch -----------------------------------------------------

    /// Submit the current input line: command or chat message.
    ///
    /// One turn at a time: while a response is in flight the submission is
    /// refused (and the input kept), so a second request can never strand
    /// the pending assistant message.
    pub fn submit_input(&mut self) -> AppFlow {
        if self.is_streaming() {
            self.toasts.push(
                "A response is still arriving (Esc cancels it)",
                ToastLevel::Info,
            );
            return AppFlow::Continue;
        }
        let line = self.input.trim().to_string();
        if line.is_empty() {
            return AppFlow::Continue;
        }
        self.clear_input();
        if let Status::Error(_) = self.status {
            self.status = Status::Ready;
        }

        if commands::is_command(&line) {
            match commands::parse(&line) {
                Ok(command) => self.apply_command(command),
                Err(err) => {
                    self.report_command_error(&err);
                    AppFlow::Continue
                }
            }
        } else {
            self.send_message(line);
            AppFlow::Continue
        }
    }

    fn report_command_error(&mut self, err: &CommandError) {
        self.toasts.push(err.to_string(), ToastLevel::Error);
    }

    // --- message flow ------------------------------------------------------

    /// Append the user message and start the request.
    pub fn send_message(&mut self, text: String) {
        let config = match self.effective() {
            Ok(config) => config,
            Err(err) => {
                self.toasts.push(err.to_string(), ToastLevel::Error);
                return;
            }
        };

        self.conversation.append(Message::user(text));
        let transcript: Vec<WireMessage> =
            self.conversation.transcript().map(WireMessage::from).collect();

        let client = ChatClient::new(config);
        self.stream_rx = Some(client.send(transcript));
        self.status = Status::Waiting;

        // Placeholder the stream fills in; excluded from transcripts until
        // the response completes.
        self.conversation.append(Message::pending_assistant());
        self.scroll
            .scroll_to_bottom(self.max_scroll().saturating_sub(1));
    }

    /// Drain pending stream events. Called once per loop tick.
    pub fn process_stream(&mut self) {
        let Some(mut rx) = self.stream_rx.take() else {
            return;
        };

        loop {
            match rx.try_recv() {
                Ok(StreamEvent::Token(token)) => {
                    self.status = Status::Streaming;
                    if let Some(last) = self.pending_assistant_mut() {
                        last.content.push_str(&token);
                    }
                }
                Ok(StreamEvent::Done) => {
                    if let Some(last) = self.pending_assistant_mut() {
                        last.complete = true;
                    }
                    self.status = Status::Ready;
                    return;
                }
                Ok(StreamEvent::Failed(err)) => {
                    self.fail_stream(err);
                    return;
                }
                Err(mpsc::error::TryRecvError::Empty) => {
                    self.stream_rx = Some(rx);
                    return;
                }
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if matches!(self.status, Status::Waiting | Status::Streaming) {
                        self.status = Status::Ready;
                    }
                    return;
                }
            }
        }
    }

    /// A failed request: already-rendered fragments stay visible but the
    /// message remains incomplete and never enters the transcript.
    fn fail_stream(&mut self, err: ApiError) {
        let empty_pending = self
            .pending_assistant_mut()
            .map(|m| m.content.is_empty())
            .unwrap_or(false);
        if empty_pending {
            self.conversation.messages.pop();
        }
        self.status = Status::Error(err.to_string());
        self.toasts.push(err.to_string(), ToastLevel::Error);
    }

    /// User interrupt: drop the receiver (aborting the producer at the next
    /// fragment boundary) and discard the partial message entirely.
    pub fn cancel_stream(&mut self) {
        if self.stream_rx.take().is_none() {
            return;
        }
        if self.pending_assistant_mut().is_some() {
            self.conversation.messages.pop();
        }
        self.status = Status::Ready;
        self.toasts.push("Response cancelled", ToastLevel::Info);
    }

    fn pending_assistant_mut(&mut self) -> Option<&mut Message> {
        self.conversation
            .messages
            .last_mut()
            .filter(|m| m.role == Role::Assistant && !m.complete)
    }

    pub fn is_streaming(&self) -> bool {
        self.stream_rx.is_some()
    }

    /// Advance time-based UI state. Called on a fixed loop interval.
    pub fn tick(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
        self.toasts.tick();
    }

    pub fn toggle_cursor(&mut self) {
        self.cursor_visible = !self.cursor_visible;
    }

    // --- command handling --------------------------------------------------

    /// Apply a parsed command to the app state.
    pub fn apply_command(&mut self, command: Command) -> AppFlow {
        match command {
            Command::Exit => return AppFlow::Exit,
            Command::Help => self.overlay = Some(Overlay::Help),
            Command::Clear => self.clear_conversation(),
            Command::System(None) => self.show_system(),
            Command::System(Some(text)) => self.set_system(text),
            Command::ConfigShow => self.show_config(),
            Command::ConfigSet { key, value } => self.set_config(&key, &value),
            Command::ConfigReset => self.reset_config(),
            Command::ProfileOverview | Command::ProfileList => self.show_profiles(),
            Command::ProfileUse(name) => self.use_profile(&name),
            Command::ProfileCreate { name, from_current } => {
                self.create_profile(&name, from_current)
            }
            Command::ProfileClone { src, dest } => self.clone_profile(&src, &dest),
            Command::ProfileDelete(name) => self.delete_profile(&name),
            Command::ProfileShow(name) => self.show_profile(name.as_deref()),
        }
        AppFlow::Continue
    }

    fn clear_conversation(&mut self) {
        self.conversation.clear();
        let prompt = self
            .effective()
            .map(|c| c.system_prompt)
            .unwrap_or_else(|_| self.settings.system_prompt.clone());
        if !prompt.is_empty() {
            self.conversation.set_system(prompt);
        }
        self.scroll.scroll_to_top();
        self.toasts.push("Conversation cleared", ToastLevel::Info);
    }

    fn show_system(&mut self) {
        match self.conversation.system() {
            Some(text) => {
                self.overlay = Some(Overlay::Text {
                    title: "System message".to_string(),
                    body: text.to_string(),
                });
            }
            None => self.toasts.push("No system message set", ToastLevel::Info),
        }
    }

    fn set_system(&mut self, text: String) {
        self.conversation.set_system(text.clone());
        match self
            .store
            .update(&self.active_profile, "system_prompt", &text)
        {
            Ok(profile) => {
                self.settings = profile.settings;
                self.toasts
                    .push("System message updated and saved", ToastLevel::Success);
            }
            Err(err) => self.toasts.push(err.to_string(), ToastLevel::Error),
        }
    }

    fn show_config(&mut self) {
        let config = match self.effective() {
            Ok(config) => config,
            Err(err) => {
                self.toasts.push(err.to_string(), ToastLevel::Error);
                return;
            }
        };
        let mut rows = vec![
            ("api_base_url".to_string(), config.api_base_url.clone()),
            ("model".to_string(), config.model.clone()),
            ("max_tokens".to_string(), config.max_tokens.to_string()),
            ("temperature".to_string(), config.temperature.to_string()),
            ("stream".to_string(), config.stream.to_string()),
            ("system_prompt".to_string(), config.system_prompt.clone()),
        ];
        for (_, value) in rows.iter_mut() {
            if value.chars().count() > MAX_DISPLAY_VALUE {
                let truncated: String = value.chars().take(MAX_DISPLAY_VALUE - 3).collect();
                *value = format!("{}...", truncated);
            }
        }
        // Presence only; the key itself is never displayed or stored.
        rows.push((
            "api_key".to_string(),
            if config.api_key.is_some() {
                "set (from environment)".to_string()
            } else {
                "not set".to_string()
            },
        ));
        self.overlay = Some(Overlay::Table {
            title: format!("Configuration: {} profile", self.active_profile),
            rows,
        });
    }

    fn set_config(&mut self, key: &str, value: &str) {
        match self.store.update(&self.active_profile, key, value) {
            Ok(profile) => {
                self.settings = profile.settings;
                if key == "system_prompt" {
                    self.conversation.set_system(value.to_string());
                }
                self.toasts
                    .push(format!("Updated {} to {}", key, value), ToastLevel::Success);
            }
            Err(err) => self.toasts.push(err.to_string(), ToastLevel::Error),
        }
    }

    fn reset_config(&mut self) {
        let profile = Profile {
            name: self.active_profile.clone(),
            settings: ProfileSettings::default(),
        };
        match self.store.save(&profile) {
            Ok(()) => {
                self.settings = profile.settings;
                let prompt = self
                    .effective()
                    .map(|c| c.system_prompt)
                    .unwrap_or_else(|_| self.settings.system_prompt.clone());
                self.conversation.set_system(prompt);
                self.toasts.push(
                    format!("Profile '{}' reset to defaults", self.active_profile),
                    ToastLevel::Success,
                );
            }
            Err(err) => self.toasts.push(err.to_string(), ToastLevel::Error),
        }
    }

    fn show_profiles(&mut self) {
        match self.store.list() {
            Ok(names) => {
                let rows = names
                    .into_iter()
                    .map(|name| {
                        let marker = if name == self.active_profile {
                            "ACTIVE".to_string()
                        } else {
                            String::new()
                        };
                        (name, marker)
                    })
                    .collect();
                self.overlay = Some(Overlay::Table {
                    title: format!("Profiles (active: {})", self.active_profile),
                    rows,
                });
            }
            Err(err) => self.toasts.push(err.to_string(), ToastLevel::Error),
        }
    }

    fn use_profile(&mut self, name: &str) {
        if let Err(err) = self.store.set_active(name) {
            self.toasts.push(err.to_string(), ToastLevel::Error);
            return;
        }
        match self.store.load(name) {
            Ok(profile) => {
                self.active_profile = profile.name;
                self.settings = profile.settings;
                let prompt = self
                    .effective()
                    .map(|c| c.system_prompt)
                    .unwrap_or_else(|_| self.settings.system_prompt.clone());
                self.conversation.set_system(prompt);
                self.toasts.push(
                    format!("Switched to profile: {}", self.active_profile),
                    ToastLevel::Success,
                );
            }
            Err(err) => self.toasts.push(err.to_string(), ToastLevel::Error),
        }
    }

    fn create_profile(&mut self, name: &str, from_current: bool) {
        let seed = from_current.then(|| self.settings.clone());
        match self.store.create(name, seed.as_ref()) {
            Ok(Profile { name, .. }) => self
                .toasts
                .push(format!("Created profile: {}", name), ToastLevel::Success),
            Err(err) => self.toasts.push(err.to_string(), ToastLevel::Error),
        }
    }

    fn clone_profile(&mut self, src: &str, dest: &str) {
        match self.store.clone_profile(src, dest) {
            Ok(_) => self.toasts.push(
                format!("Cloned '{}' to '{}'", src, dest),
                ToastLevel::Success,
            ),
            Err(err) => self.toasts.push(err.to_string(), ToastLevel::Error),
        }
    }

    fn delete_profile(&mut self, name: &str) {
        match self.store.delete(name) {
            Ok(()) => {
                if name == self.active_profile {
                    // The store already reset the marker; follow it.
                    self.active_profile = DEFAULT_PROFILE.to_string();
                    match self.store.load(DEFAULT_PROFILE) {
                        Ok(profile) => self.settings = profile.settings,
                        Err(err) => self.toasts.push(err.to_string(), ToastLevel::Error),
                    }
                }
                self.toasts
                    .push(format!("Deleted profile: {}", name), ToastLevel::Success);
            }
            Err(err) => self.toasts.push(err.to_string(), ToastLevel::Error),
        }
    }

    fn show_profile(&mut self, name: Option<&str>) {
        let name = name.unwrap_or(&self.active_profile).to_string();
        match self.store.load(&name) {
            Ok(profile) => {
                let rows = ProfileSettings::KEYS
                    .iter()
                    .filter_map(|key| {
                        profile
                            .settings
                            .get(key)
                            .map(|value| (key.to_string(), value))
                    })
                    .collect();
                self.overlay = Some(Overlay::Table {
                    title: format!("Profile: {}", name),
                    rows,
                });
            }
            Err(err) => self.toasts.push(err.to_string(), ToastLevel::Error),
        }
    }
}
