use chrono::{DateTime, Local};

/// Represents who authored a message in the conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Returns the display prefix for this role.
    pub fn prefix(&self) -> &'static str {
        match self {
            Role::System => "System: ",
            Role::User => "You: ",
            Role::Assistant => "Assistant: ",
        }
    }

    /// Returns the role name used on the wire.
    pub fn api_name(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single message in the conversation.
#[derive(Clone, Debug)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Local>,
    /// False while a streamed response is still arriving (or was cut short
    /// by an error). Incomplete messages are never part of the transcript.
    pub complete: bool,
}

impl Message {
    /// Create a new, complete message with the given role and content.
    pub fn new(role: Role, content: String) -> Self {
        Self {
            role,
            content,
            timestamp: Local::now(),
            complete: true,
        }
    }

    /// Create a new user message.
    pub fn user(content: String) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: String) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system message.
    pub fn system(content: String) -> Self {
        Self::new(Role::System, content)
    }

    /// Create an empty assistant message to be filled by a stream.
    pub fn pending_assistant() -> Self {
        Self {
            complete: false,
            ..Self::assistant(String::new())
        }
    }
}

/// Ordered message history for one session. Insertion order is display
/// order is send order, except that the system message is pinned first.
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    pub messages: Vec<Message>,
}

impl Conversation {
    /// Create a conversation seeded with a system message.
    pub fn with_system(prompt: &str) -> Self {
        let mut conversation = Self::default();
        if !prompt.is_empty() {
            conversation.set_system(prompt.to_string());
        }
        conversation
    }

    /// Append a message at the end.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Remove all messages.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Insert or replace the system message. At most one system message
    /// exists; a new one replaces the old in place, otherwise it goes first.
    pub fn set_system(&mut self, content: String) {
        if let Some(existing) = self.messages.iter_mut().find(|m| m.role == Role::System) {
            existing.content = content;
        } else {
            self.messages.insert(0, Message::system(content));
        }
    }

    /// The current system message text, if one is set.
    pub fn system(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    /// The ordered transcript sent to the API: complete messages only.
    pub fn transcript(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.complete)
    }

    /// Messages shown in the chat area (system messages are hidden).
    pub fn visible(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role != Role::System)
    }

    /// Number of messages shown in the chat area.
    pub fn visible_len(&self) -> usize {
        self.visible().count()
    }
}
