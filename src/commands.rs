//! Parsing of leading-slash commands.
//!
//! Commands are parsed into a `Command` value here and applied to the
//! application state in `app.rs`. Anything that doesn't start with the
//! slash prefix is a chat message, not a command.

use std::fmt;

/// The command prefix.
pub const PREFIX: char = '/';

/// One-line usage summaries, shown by `/help` and on unknown commands.
pub const HELP_ENTRIES: [(&str, &str); 7] = [
    ("/help", "Show this help"),
    ("/clear", "Clear the conversation"),
    ("/exit", "Exit the chat"),
    ("/system [text]", "Show or replace the system message"),
    ("/config [key=value]", "Show effective config or update a setting"),
    ("/reset config", "Reset the active profile to defaults"),
    (
        "/profile [use|list|create|clone|delete|show] ...",
        "Manage configuration profiles",
    ),
];

/// A parsed in-session command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Clear,
    Exit,
    /// Show the system message (`None`) or replace it.
    System(Option<String>),
    /// Show the effective configuration.
    ConfigShow,
    /// Update one setting of the active profile.
    ConfigSet { key: String, value: String },
    /// Reset the active profile to built-in defaults.
    ConfigReset,
    /// Show the active profile and the list of profiles.
    ProfileOverview,
    ProfileList,
    ProfileUse(String),
    ProfileCreate { name: String, from_current: bool },
    ProfileClone { src: String, dest: String },
    ProfileDelete(String),
    /// Show a profile's stored settings (active profile when `None`).
    ProfileShow(Option<String>),
}

/// Errors from command parsing: unknown verbs and malformed arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandError {
    Unknown(String),
    Usage(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(verb) => {
                write!(f, "Unknown command '{}'. Type /help for commands", verb)
            }
            Self::Usage(usage) => write!(f, "Usage: {}", usage),
        }
    }
}

impl std::error::Error for CommandError {}

/// Whether a line of input should be parsed as a command.
pub fn is_command(line: &str) -> bool {
    line.trim_start().starts_with(PREFIX)
}

/// Parse a command line. The caller guarantees `is_command(line)`.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let line = line.trim();
    let (verb, args) = match line.split_once(' ') {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb {
        "/help" => Ok(Command::Help),
        "/clear" => Ok(Command::Clear),
        "/exit" => Ok(Command::Exit),
        "/system" => Ok(Command::System(if args.is_empty() {
            None
        } else {
            Some(args.to_string())
        })),
        "/config" => parse_config(args),
        "/reset" => {
            if args == "config" {
                Ok(Command::ConfigReset)
            } else {
                Err(CommandError::Usage("/reset config".to_string()))
            }
        }
        "/profile" => parse_profile(args),
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn parse_config(args: &str) -> Result<Command, CommandError> {
    if args.is_empty() {
        return Ok(Command::ConfigShow);
    }
    // The value may itself contain '='; split on the first one only.
    let Some((key, value)) = args.split_once('=') else {
        return Err(CommandError::Usage("/config key=value".to_string()));
    };
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() {
        return Err(CommandError::Usage("/config key=value".to_string()));
    }
    Ok(Command::ConfigSet {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_profile(args: &str) -> Result<Command, CommandError> {
    let mut words = args.split_whitespace();
    let Some(subcmd) = words.next() else {
        return Ok(Command::ProfileOverview);
    };
    let rest: Vec<&str> = words.collect();

    match (subcmd, rest.as_slice()) {
        ("list", []) => Ok(Command::ProfileList),
        ("use", [name]) => Ok(Command::ProfileUse(name.to_string())),
        ("use", _) => Err(CommandError::Usage("/profile use <name>".to_string())),
        ("create", [name]) => Ok(Command::ProfileCreate {
            name: name.to_string(),
            from_current: false,
        }),
        ("create", [name, "--from-current"]) => Ok(Command::ProfileCreate {
            name: name.to_string(),
            from_current: true,
        }),
        ("create", _) => Err(CommandError::Usage(
            "/profile create <name> [--from-current]".to_string(),
        )),
        ("clone", [src, dest]) => Ok(Command::ProfileClone {
            src: src.to_string(),
            dest: dest.to_string(),
        }),
        ("clone", _) => Err(CommandError::Usage(
            "/profile clone <source> <target>".to_string(),
        )),
        ("delete", [name]) => Ok(Command::ProfileDelete(name.to_string())),
        ("delete", _) => Err(CommandError::Usage("/profile delete <name>".to_string())),
        ("show", []) => Ok(Command::ProfileShow(None)),
        ("show", [name]) => Ok(Command::ProfileShow(Some(name.to_string()))),
        ("show", _) => Err(CommandError::Usage("/profile show [name]".to_string())),
        _ => Err(CommandError::Usage(
            "/profile [use|list|create|clone|delete|show] ...".to_string(),
        )),
    }
}
