//! Profile storage and configuration resolution.
//!
//! Settings live in named profiles, one TOML file per profile under the
//! per-user config directory. A small marker file records which profile is
//! active. The effective configuration for a request is computed from the
//! active profile with environment-variable overrides applied key by key.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the profile that always exists and cannot be deleted.
pub const DEFAULT_PROFILE: &str = "default";

/// Environment variable names recognized as overrides.
pub const ENV_BASE_URL: &str = "API_BASE_URL";
pub const ENV_MODEL: &str = "API_MODEL";
pub const ENV_MAX_TOKENS: &str = "API_MAX_TOKENS";
pub const ENV_TEMPERATURE: &str = "API_TEMPERATURE";
pub const ENV_SYSTEM_PROMPT: &str = "SYSTEM_PROMPT";
/// Credential variables, checked in order. Keys come only from the
/// environment and are never written to profile files.
pub const ENV_API_KEYS: [&str; 2] = ["OPENAI_API_KEY", "API_KEY"];

/// Errors from profile storage and config resolution.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// No profile with the given name exists.
    NotFound(String),
    /// A profile with the given name already exists.
    AlreadyExists(String),
    /// Profile name contains characters that don't map to a file name.
    InvalidName(String),
    /// The profile exists but may not be removed.
    Protected(String),
    /// Unrecognized setting key.
    UnknownKey(String),
    /// A stored profile or an override value could not be parsed.
    Parse(String),
    /// Filesystem failure.
    Io(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "Profile '{}' does not exist", name),
            Self::AlreadyExists(name) => write!(f, "Profile '{}' already exists", name),
            Self::InvalidName(name) => write!(
                f,
                "Invalid profile name '{}' (use letters, digits, '-' and '_')",
                name
            ),
            Self::Protected(name) => write!(f, "Profile '{}' cannot be deleted", name),
            Self::UnknownKey(key) => write!(f, "Unknown setting '{}'", key),
            Self::Parse(msg) => write!(f, "Parse error: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Settings persisted in a profile file. The API key is deliberately not
/// part of this struct so it can never end up on disk.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProfileSettings {
    /// Base URL of the OpenAI-compatible API
    pub api_base_url: String,
    /// Model identifier
    pub model: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Whether responses are streamed incrementally
    pub stream: bool,
    /// System prompt seeded into new conversations
    pub system_prompt: String,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 1000,
            temperature: 0.7,
            stream: true,
            system_prompt: "You are a helpful assistant.".to_string(),
        }
    }
}

impl ProfileSettings {
    /// Setting keys accepted by `/config key=value`, in display order.
    pub const KEYS: [&'static str; 6] = [
        "api_base_url",
        "model",
        "max_tokens",
        "temperature",
        "stream",
        "system_prompt",
    ];

    /// Set a setting by key, parsing the value to the key's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "api_base_url" => self.api_base_url = value.to_string(),
            "model" => self.model = value.to_string(),
            "max_tokens" => {
                self.max_tokens = value
                    .parse()
                    .map_err(|_| ConfigError::Parse(format!("max_tokens: '{}'", value)))?;
            }
            "temperature" => {
                self.temperature = value
                    .parse()
                    .map_err(|_| ConfigError::Parse(format!("temperature: '{}'", value)))?;
            }
            "stream" => self.stream = parse_bool(value),
            "system_prompt" => self.system_prompt = value.to_string(),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// Get a setting's display value by key.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "api_base_url" => Some(self.api_base_url.clone()),
            "model" => Some(self.model.clone()),
            "max_tokens" => Some(self.max_tokens.to_string()),
            "temperature" => Some(self.temperature.to_string()),
            "stream" => Some(self.stream.to_string()),
            "system_prompt" => Some(self.system_prompt.clone()),
            _ => None,
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "yes" | "1" | "y" | "on"
    )
}

/// A named bundle of persisted settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    pub settings: ProfileSettings,
}

/// Read-only configuration for a single request: the active profile's
/// settings merged with environment overrides, plus the credential.
/// Never persisted.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub api_base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stream: bool,
    pub system_prompt: String,
    pub api_key: Option<String>,
}

impl EffectiveConfig {
    /// Resolve with the process environment.
    pub fn from_env(settings: &ProfileSettings) -> Result<Self, ConfigError> {
        Self::resolve(settings, |name| std::env::var(name).ok())
    }

    /// Resolve with an arbitrary variable lookup. Precedence per key:
    /// override value > profile value (> built-in default, already folded
    /// into the profile settings).
    pub fn resolve(
        settings: &ProfileSettings,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self {
            api_base_url: settings.api_base_url.clone(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            stream: settings.stream,
            system_prompt: settings.system_prompt.clone(),
            api_key: None,
        };

        if let Some(url) = lookup(ENV_BASE_URL) {
            config.api_base_url = url;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            config.model = model;
        }
        if let Some(raw) = lookup(ENV_MAX_TOKENS) {
            config.max_tokens = raw
                .parse()
                .map_err(|_| ConfigError::Parse(format!("{}: '{}'", ENV_MAX_TOKENS, raw)))?;
        }
        if let Some(raw) = lookup(ENV_TEMPERATURE) {
            config.temperature = raw
                .parse()
                .map_err(|_| ConfigError::Parse(format!("{}: '{}'", ENV_TEMPERATURE, raw)))?;
        }
        if let Some(prompt) = lookup(ENV_SYSTEM_PROMPT) {
            config.system_prompt = prompt;
        }
        config.api_key = ENV_API_KEYS.iter().copied().find_map(|name| lookup(name));

        Ok(config)
    }
}

/// Directory-backed profile storage.
///
/// Layout under the root:
/// - `profiles/<name>.toml` - one file per profile
/// - `active_profile` - plain-text name of the active profile
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    /// Create a store rooted at an explicit directory (used by tests).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The per-user store: `<config dir>/parley`.
    pub fn default_location() -> Result<Self, ConfigError> {
        let base = dirs::config_dir()
            .ok_or_else(|| ConfigError::Io("could not determine config directory".to_string()))?;
        Ok(Self::new(base.join("parley")))
    }

    fn profiles_dir(&self) -> PathBuf {
        self.root.join("profiles")
    }

    fn profile_path(&self, name: &str) -> PathBuf {
        self.profiles_dir().join(format!("{}.toml", name))
    }

    fn active_marker_path(&self) -> PathBuf {
        self.root.join("active_profile")
    }

    fn ensure_dirs(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(self.profiles_dir())?;
        Ok(())
    }

    fn check_name(name: &str) -> Result<(), ConfigError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(())
        } else {
            Err(ConfigError::InvalidName(name.to_string()))
        }
    }

    /// Whether a profile exists. The default profile always does.
    pub fn exists(&self, name: &str) -> bool {
        name == DEFAULT_PROFILE || self.profile_path(name).exists()
    }

    /// List profile names, sorted, always including the default.
    pub fn list(&self) -> Result<Vec<String>, ConfigError> {
        let mut names = vec![DEFAULT_PROFILE.to_string()];
        let dir = self.profiles_dir();
        if dir.exists() {
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        if stem != DEFAULT_PROFILE {
                            names.push(stem.to_string());
                        }
                    }
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// The active profile name. Creates the marker pointing at the default
    /// profile on first use.
    pub fn active(&self) -> Result<String, ConfigError> {
        let marker = self.active_marker_path();
        if !marker.exists() {
            self.write_active(DEFAULT_PROFILE)?;
            return Ok(DEFAULT_PROFILE.to_string());
        }
        let name = fs::read_to_string(marker)?.trim().to_string();
        if name.is_empty() {
            Ok(DEFAULT_PROFILE.to_string())
        } else {
            Ok(name)
        }
    }

    /// Point the active marker at an existing profile.
    pub fn set_active(&self, name: &str) -> Result<(), ConfigError> {
        Self::check_name(name)?;
        if !self.exists(name) {
            return Err(ConfigError::NotFound(name.to_string()));
        }
        self.write_active(name)
    }

    fn write_active(&self, name: &str) -> Result<(), ConfigError> {
        self.ensure_dirs()?;
        replace_file(&self.active_marker_path(), name)
    }

    /// Load a profile. The default profile is created with built-in
    /// defaults on first access; any other missing name is an error.
    pub fn load(&self, name: &str) -> Result<Profile, ConfigError> {
        Self::check_name(name)?;
        let path = self.profile_path(name);
        if !path.exists() {
            if name == DEFAULT_PROFILE {
                let profile = Profile {
                    name: name.to_string(),
                    settings: ProfileSettings::default(),
                };
                self.save(&profile)?;
                return Ok(profile);
            }
            return Err(ConfigError::NotFound(name.to_string()));
        }
        let contents = fs::read_to_string(&path)?;
        let settings: ProfileSettings = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(format!("profile '{}': {}", name, e)))?;
        Ok(Profile {
            name: name.to_string(),
            settings,
        })
    }

    /// Serialize a profile back to storage with whole-file replacement.
    pub fn save(&self, profile: &Profile) -> Result<(), ConfigError> {
        Self::check_name(&profile.name)?;
        self.ensure_dirs()?;
        let contents = toml::to_string_pretty(&profile.settings)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        replace_file(&self.profile_path(&profile.name), &contents)
    }

    /// Create a new profile, optionally seeded from the given settings
    /// instead of the built-in defaults.
    pub fn create(
        &self,
        name: &str,
        from: Option<&ProfileSettings>,
    ) -> Result<Profile, ConfigError> {
        Self::check_name(name)?;
        if self.exists(name) {
            return Err(ConfigError::AlreadyExists(name.to_string()));
        }
        let profile = Profile {
            name: name.to_string(),
            settings: from.cloned().unwrap_or_default(),
        };
        self.save(&profile)?;
        Ok(profile)
    }

    /// Copy an existing profile to a new name.
    pub fn clone_profile(&self, src: &str, dest: &str) -> Result<Profile, ConfigError> {
        if !self.exists(src) {
            return Err(ConfigError::NotFound(src.to_string()));
        }
        if self.exists(dest) {
            return Err(ConfigError::AlreadyExists(dest.to_string()));
        }
        let source = self.load(src)?;
        let profile = Profile {
            name: dest.to_string(),
            settings: source.settings,
        };
        self.save(&profile)?;
        Ok(profile)
    }

    /// Delete a profile. The default profile is protected. Deleting the
    /// active profile resets the marker to the default.
    pub fn delete(&self, name: &str) -> Result<(), ConfigError> {
        Self::check_name(name)?;
        if name == DEFAULT_PROFILE {
            return Err(ConfigError::Protected(name.to_string()));
        }
        let path = self.profile_path(name);
        if !path.exists() {
            return Err(ConfigError::NotFound(name.to_string()));
        }
        fs::remove_file(path)?;
        if self.active()? == name {
            self.write_active(DEFAULT_PROFILE)?;
        }
        Ok(())
    }

    /// Update one setting of a stored profile and save it back.
    pub fn update(&self, name: &str, key: &str, value: &str) -> Result<Profile, ConfigError> {
        let mut profile = self.load(name)?;
        profile.settings.set(key, value)?;
        self.save(&profile)?;
        Ok(profile)
    }
}

/// Write a file so that no partial content is ever visible: write to a
/// sibling temp path, then rename over the target.
fn replace_file(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
